//! Frame texture upload and painting

use eframe::egui::{self, Rect, Vec2};
use vat_core::{Frame, PIXEL_STRIDE};

/// Reorder shared-frame pixels into RGBA.
///
/// Producers write 32-bit little-endian ARGB words, so each pixel sits in
/// memory as B, G, R, A.
pub fn argb_to_rgba(argb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(argb.len());
    for chunk in argb.chunks_exact(PIXEL_STRIDE) {
        let b = chunk[0];
        let g = chunk[1];
        let r = chunk[2];
        let a = chunk[3];
        rgba.extend_from_slice(&[r, g, b, a]);
    }
    rgba
}

/// Size of `frame_size` scaled to fit `available` with aspect ratio kept
pub fn fit_size(frame_size: Vec2, available: Vec2) -> Vec2 {
    if frame_size.x <= 0.0 || frame_size.y <= 0.0 {
        return available;
    }
    let scale = (available.x / frame_size.x).min(available.y / frame_size.y);
    frame_size * scale
}

/// Holds the texture of the most recent frame
#[derive(Default)]
pub struct FrameRenderer {
    current_texture: Option<egui::TextureHandle>,
    frame_size: Option<Vec2>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a new frame
    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &Frame) {
        let new_size = Vec2::new(frame.width() as f32, frame.height() as f32);
        if let Some(old_size) = self.frame_size {
            if old_size != new_size {
                tracing::info!(
                    "Frame size changed: {}x{} -> {}x{}",
                    old_size.x, old_size.y, new_size.x, new_size.y
                );
            }
        }
        self.frame_size = Some(new_size);

        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width() as usize, frame.height() as usize],
            &argb_to_rgba(frame.data()),
        );

        match &mut self.current_texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.current_texture =
                    Some(ctx.load_texture("frame_texture", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    /// Paint the current frame fit to `available_size`; returns the image rect
    pub fn render(&self, ui: &mut egui::Ui, available_size: Vec2) -> Rect {
        match (&self.current_texture, self.frame_size) {
            (Some(texture), Some(frame_size)) => {
                let size = fit_size(frame_size, available_size);
                let response = ui.allocate_rect(
                    Rect::from_min_size(ui.cursor().min, size),
                    egui::Sense::click_and_drag(),
                );
                let rect = response.rect;

                ui.painter().image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
                rect
            }
            _ => {
                let response = ui.allocate_rect(
                    Rect::from_min_size(ui.cursor().min, available_size),
                    egui::Sense::hover(),
                );
                let rect = response.rect;
                ui.painter().rect_filled(rect, 0.0, egui::Color32::from_gray(20));
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Waiting for frames",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
                rect
            }
        }
    }

    pub fn frame_size(&self) -> Option<Vec2> {
        self.frame_size
    }
}
