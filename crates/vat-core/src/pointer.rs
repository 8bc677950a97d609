//! Pointer drag state machine.
//!
//! A display surface reports button and move events at UI rate; the
//! annotation loop reads one coherent sample per frame. Both sides go through
//! a single lock so a reader never sees half of an `(x, y)` update.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::platform::PointerHandler;
use crate::types::{PointerEvent, PointerEventKind, PointerSample};

/// Thread-safe "pointer currently pressed at (x, y)" state.
#[derive(Debug, Default)]
pub struct PointerState {
    inner: Mutex<PointerSample>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one pointer event.
    pub fn apply(&self, event: PointerEvent) {
        let mut sample = self.inner.lock();
        match event.kind {
            PointerEventKind::ButtonDown => {
                sample.active = true;
                sample.x = event.x;
                sample.y = event.y;
            }
            PointerEventKind::Move => {
                if sample.active {
                    sample.x = event.x;
                    sample.y = event.y;
                }
            }
            PointerEventKind::ButtonUp => {
                // x, y stay as they were; they are meaningless while idle
                sample.active = false;
            }
        }
        trace!(?event, ?sample, "pointer event applied");
    }

    pub fn button_down(&self, x: u16, y: u16) {
        self.apply(PointerEvent::button_down(x, y));
    }

    pub fn moved(&self, x: u16, y: u16) {
        self.apply(PointerEvent::moved(x, y));
    }

    pub fn button_up(&self) {
        let sample = self.read();
        self.apply(PointerEvent::button_up(sample.x, sample.y));
    }

    /// Consistent snapshot of the current sample.
    pub fn read(&self) -> PointerSample {
        *self.inner.lock()
    }

    /// Handler bound to this state, for registration with a display.
    pub fn handler(self: &Arc<Self>) -> PointerHandler {
        let state = Arc::clone(self);
        Arc::new(move |event| state.apply(event))
    }
}
