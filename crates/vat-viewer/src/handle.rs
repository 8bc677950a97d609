//! Display collaborator handed to the pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use eframe::egui;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use vat_core::{Display, Frame, PointerEvent, PointerHandler};

/// Slot shared between the handle and the window for the pointer handler
pub(crate) type HandlerSlot = Arc<Mutex<Option<PointerHandler>>>;

/// Context of the running window, set once it exists
pub(crate) type RepaintSlot = Arc<Mutex<Option<egui::Context>>>;

/// Create a connected handle / receiver pair holding at most `queue_depth`
/// undisplayed frames.
pub fn channel(queue_depth: usize) -> (ViewerHandle, FrameReceiver) {
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let pointer: HandlerSlot = Arc::new(Mutex::new(None));
    let repaint: RepaintSlot = Arc::new(Mutex::new(None));
    let dropped = Arc::new(AtomicU64::new(0));

    let handle = ViewerHandle {
        tx,
        pointer: Arc::clone(&pointer),
        repaint: Arc::clone(&repaint),
        dropped,
    };
    let receiver = FrameReceiver { rx, pointer, repaint };
    (handle, receiver)
}

/// Sending half, implements [`Display`].
pub struct ViewerHandle {
    tx: mpsc::Sender<Frame>,
    pointer: HandlerSlot,
    repaint: RepaintSlot,
    dropped: Arc<AtomicU64>,
}

impl ViewerHandle {
    /// Frames discarded because the window fell behind
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Display for ViewerHandle {
    fn present(&self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {
                if let Some(ctx) = self.repaint.lock().as_ref() {
                    ctx.request_repaint();
                }
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(dropped, "viewer behind, frame dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("viewer closed, frame discarded");
            }
        }
    }

    fn register_pointer_handler(&self, handler: PointerHandler) {
        *self.pointer.lock() = Some(handler);
    }
}

/// Receiving half, consumed by the window
pub struct FrameReceiver {
    pub(crate) rx: mpsc::Receiver<Frame>,
    pub(crate) pointer: HandlerSlot,
    pub(crate) repaint: RepaintSlot,
}

impl FrameReceiver {
    /// Drain pending frames, keeping only the newest.
    /// Returns the frame and how many were skipped.
    pub fn latest(&mut self) -> Option<(Frame, usize)> {
        let mut latest = None;
        let mut skipped = 0;
        while let Ok(frame) = self.rx.try_recv() {
            if latest.replace(frame).is_some() {
                skipped += 1;
            }
        }
        latest.map(|frame| (frame, skipped))
    }

    /// Forward a pointer event to the registered handler, if any
    pub fn deliver(&self, event: PointerEvent) {
        let handler = self.pointer.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}
