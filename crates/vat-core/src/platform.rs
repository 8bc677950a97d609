// crates/vat-core/src/platform.rs
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{BusError, FrameError};
use crate::types::{AnnotationEvent, Frame, ObservedTimestamp, PointerEvent};

/// Callback a display invokes for every pointer event.
pub type PointerHandler = Arc<dyn Fn(PointerEvent) + Send + Sync>;

/// Callback a message bus invokes with the sample time of each
/// frame-associated message.
pub type TimestampHandler = Arc<dyn Fn(ObservedTimestamp) + Send + Sync>;

/// Blocking pull of frames from a producer.
pub trait FrameSource: Send {
    /// Wait for the producer's next "frame ready" signal, at most `slice`.
    /// Returns `false` if the slice elapsed without a signal.
    fn wait_for_next_timeout(&self, slice: Duration) -> Result<bool, FrameError>;

    /// Copy the current frame out of the source.
    fn acquire(&self) -> Result<Frame, FrameError>;
}

/// Surface that renders frames and reports pointer input.
pub trait Display: Send + Sync {
    fn present(&self, frame: Frame);
    fn register_pointer_handler(&self, handler: PointerHandler);
}

/// Pub/sub session the annotations are published on.
pub trait MessageBus: Send + Sync {
    fn register_timestamp_handler(&self, handler: TimestampHandler);
    /// Publish `event`, using `event.timestamp` as its sample time.
    fn send(&self, event: &AnnotationEvent) -> Result<(), BusError>;
    fn is_session_active(&self) -> bool;
}

impl<T: FrameSource + Sync + ?Sized> FrameSource for Arc<T> {
    fn wait_for_next_timeout(&self, slice: Duration) -> Result<bool, FrameError> {
        (**self).wait_for_next_timeout(slice)
    }

    fn acquire(&self) -> Result<Frame, FrameError> {
        (**self).acquire()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn wait_for_next_timeout(&self, slice: Duration) -> Result<bool, FrameError> {
        (**self).wait_for_next_timeout(slice)
    }

    fn acquire(&self) -> Result<Frame, FrameError> {
        (**self).acquire()
    }
}
