//! The annotation loop.
//!
//! Each iteration waits for a frame, copies it out, hands it to the display,
//! samples the pointer, and publishes an annotation while a drag is active.
//! The loop ends when the message bus reports the session inactive; the
//! frame wait is sliced so that check happens between waits.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::correlator::TimestampCorrelator;
use crate::errors::PipelineError;
use crate::platform::{Display, FrameSource, MessageBus};
use crate::pointer::PointerState;
use crate::types::AnnotationEvent;

/// Called with every published annotation.
pub type EmitHook = Box<dyn Fn(&AnnotationEvent) + Send>;

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound of a single frame wait before the session flag is rechecked.
    pub wait_slice: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            wait_slice: Duration::from_millis(250),
        }
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames acquired and presented
    pub frames: u64,
    /// Annotations handed to the bus successfully
    pub annotations: u64,
    /// Active drags skipped because no sample time was observed yet
    pub suppressed: u64,
    /// Annotations the bus failed to send
    pub send_failures: u64,
}

pub struct AnnotationPipeline<F: FrameSource> {
    frames: F,
    display: Arc<dyn Display>,
    bus: Arc<dyn MessageBus>,
    pointer: Arc<PointerState>,
    correlator: Arc<TimestampCorrelator>,
    options: PipelineOptions,
    emit_hook: Option<EmitHook>,
    stats: PipelineStats,
}

impl<F: FrameSource> AnnotationPipeline<F> {
    /// Build the pipeline and register the pointer and timestamp handlers
    /// with the display and the bus.
    pub fn new(
        frames: F,
        display: Arc<dyn Display>,
        bus: Arc<dyn MessageBus>,
        options: PipelineOptions,
    ) -> Self {
        let pointer = Arc::new(PointerState::new());
        let correlator = Arc::new(TimestampCorrelator::new());

        display.register_pointer_handler(pointer.handler());
        bus.register_timestamp_handler(correlator.handler());

        Self {
            frames,
            display,
            bus,
            pointer,
            correlator,
            options,
            emit_hook: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_emit_hook(mut self, hook: EmitHook) -> Self {
        self.emit_hook = Some(hook);
        self
    }

    pub fn pointer(&self) -> &Arc<PointerState> {
        &self.pointer
    }

    pub fn correlator(&self) -> &Arc<TimestampCorrelator> {
        &self.correlator
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Run until the session goes inactive.
    pub fn run(&mut self) -> Result<PipelineStats, PipelineError> {
        info!(wait_slice = ?self.options.wait_slice, "annotation loop started");
        while self.bus.is_session_active() {
            if !self.frames.wait_for_next_timeout(self.options.wait_slice)? {
                continue;
            }
            self.step()?;
        }
        info!(
            frames = self.stats.frames,
            annotations = self.stats.annotations,
            suppressed = self.stats.suppressed,
            send_failures = self.stats.send_failures,
            "annotation loop finished"
        );
        Ok(self.stats)
    }

    /// One iteration, for a frame that is known to be ready.
    pub fn step(&mut self) -> Result<Option<AnnotationEvent>, PipelineError> {
        let frame = self.frames.acquire()?;
        self.display.present(frame);
        self.stats.frames += 1;

        let sample = self.pointer.read();
        if !sample.active {
            return Ok(None);
        }

        let Some(timestamp) = self.correlator.next_annotation_timestamp() else {
            debug!(x = sample.x, y = sample.y, "no sample time to correlate with; annotation suppressed");
            self.stats.suppressed += 1;
            return Ok(None);
        };

        let event = AnnotationEvent {
            x: sample.x,
            y: sample.y,
            timestamp,
        };

        match self.bus.send(&event) {
            Ok(()) => {
                self.stats.annotations += 1;
                info!(x = event.x, y = event.y, %timestamp, "annotation sent");
                if let Some(hook) = &self.emit_hook {
                    hook(&event);
                }
                Ok(Some(event))
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(error = %e, x = event.x, y = event.y, "failed to send annotation");
                Ok(None)
            }
        }
    }
}
