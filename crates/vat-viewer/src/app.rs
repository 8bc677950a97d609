use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use eframe::egui;
use tracing::{debug, info};

use crate::handle::FrameReceiver;
use crate::input::CoordinateMapper;
use crate::renderer::FrameRenderer;

/// Poll interval while no frames arrive, so `keep_running` is rechecked
const IDLE_REPAINT: Duration = Duration::from_millis(100);

/// Window parameters
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Returns false once the window should close on its own
pub type KeepRunning = Arc<dyn Fn() -> bool + Send + Sync>;

pub struct ViewerApp {
    frames: FrameReceiver,
    renderer: FrameRenderer,
    mapper: Option<CoordinateMapper>,
    keep_running: KeepRunning,
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, frames: FrameReceiver, keep_running: KeepRunning) -> Self {
        *frames.repaint.lock() = Some(cc.egui_ctx.clone());
        Self {
            frames,
            renderer: FrameRenderer::new(),
            mapper: None,
            keep_running,
        }
    }

    fn handle_input(&self, ctx: &egui::Context) {
        let Some(mapper) = self.mapper else {
            return;
        };
        let events = ctx.input(|i| i.events.clone());
        for event in &events {
            if let Some(pointer_event) = mapper.translate(event) {
                self.frames.deliver(pointer_event);
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !(self.keep_running)() {
            debug!("session inactive, closing viewer");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        if let Some((frame, skipped)) = self.frames.latest() {
            if skipped > 0 {
                debug!(skipped, "repaint behind, showing newest frame");
            }
            self.renderer.update_frame(ctx, &frame);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let available_size = ui.available_size();
                let rect = self.renderer.render(ui, available_size);
                self.mapper = self
                    .renderer
                    .frame_size()
                    .map(|frame_size| CoordinateMapper::new(rect, frame_size));
            });

        self.handle_input(ctx);
        ctx.request_repaint_after(IDLE_REPAINT);
    }
}

/// Open the window and block until it closes, then run `on_exit`.
pub fn run(
    options: ViewerOptions,
    frames: FrameReceiver,
    keep_running: KeepRunning,
    on_exit: impl FnOnce(),
) -> anyhow::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(options.title.clone())
            .with_inner_size([options.width as f32, options.height as f32]),
        ..Default::default()
    };

    info!("opening viewer '{}' ({}x{})", options.title, options.width, options.height);
    let result = eframe::run_native(
        &options.title,
        native_options,
        Box::new(move |cc| Box::new(ViewerApp::new(cc, frames, keep_running))),
    );

    on_exit();
    result.map_err(|e| anyhow!("viewer failed: {}", e))
}
