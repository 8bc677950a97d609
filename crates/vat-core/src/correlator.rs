//! Timestamp correlation between upstream frames and emitted annotations.
//!
//! The upstream listener stores the sample time of the latest frame. Every
//! annotation is stamped one microsecond before the stored reference, and the
//! reference moves down with it, so annotations emitted between two frames get
//! strictly decreasing stamps that all precede the frame they were drawn on.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::platform::TimestampHandler;
use crate::types::ObservedTimestamp;

#[derive(Debug, Default)]
struct Reference {
    current: ObservedTimestamp,
    observed: bool,
}

/// Tracks the latest upstream sample time.
#[derive(Debug, Default)]
pub struct TimestampCorrelator {
    inner: Mutex<Reference>,
}

impl TimestampCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new reference. Last write wins; monotonicity is not checked.
    pub fn observe(&self, ts: ObservedTimestamp) {
        let mut reference = self.inner.lock();
        reference.current = ts;
        reference.observed = true;
        trace!(%ts, "sample timestamp observed");
    }

    /// Timestamp for the next annotation.
    ///
    /// Returns `None` until the first [`observe`](Self::observe); there is no
    /// frame to correlate with before then. Also `None` once the reference
    /// has reached the smallest representable time, leaving it unchanged.
    pub fn next_annotation_timestamp(&self) -> Option<ObservedTimestamp> {
        let mut reference = self.inner.lock();
        if !reference.observed {
            return None;
        }
        let earlier = reference.current.one_micro_earlier()?;
        reference.current = earlier;
        Some(earlier)
    }

    /// Current reference, if any timestamp has been observed.
    pub fn reference(&self) -> Option<ObservedTimestamp> {
        let reference = self.inner.lock();
        reference.observed.then_some(reference.current)
    }

    /// Handler bound to this correlator, for registration with a message bus.
    pub fn handler(self: &Arc<Self>) -> TimestampHandler {
        let correlator = Arc::clone(self);
        Arc::new(move |ts| correlator.observe(ts))
    }
}
