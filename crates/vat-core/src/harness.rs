//! In-memory collaborators for exercising the annotation pipeline.
//!
//! These stand in for the shared-memory producer, the display surface and
//! the message session so the loop can be driven deterministically from
//! tests and local tooling.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::errors::{BusError, FrameError};
use crate::platform::{Display, FrameSource, MessageBus, PointerHandler, TimestampHandler};
use crate::types::{AnnotationEvent, Frame, ObservedTimestamp, PointerEvent};

#[derive(Debug, Default)]
struct SourceState {
    ready: u64,
    closed: bool,
    sequence: u64,
}

/// Frame source driven by explicit "frame ready" pushes.
///
/// Each acquired frame is filled with the low byte of its sequence number.
#[derive(Debug)]
pub struct MemoryFrameSource {
    width: u32,
    height: u32,
    state: Mutex<SourceState>,
    signal: Condvar,
}

impl MemoryFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            state: Mutex::new(SourceState::default()),
            signal: Condvar::new(),
        }
    }

    /// Signal `count` more frames as ready.
    pub fn push_ready(&self, count: u64) {
        self.state.lock().ready += count;
        self.signal.notify_all();
    }

    /// Make every further wait and acquire fail with [`FrameError::Closed`].
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.signal.notify_all();
    }
}

impl FrameSource for MemoryFrameSource {
    fn wait_for_next_timeout(&self, slice: Duration) -> Result<bool, FrameError> {
        let mut state = self.state.lock();
        if state.ready == 0 && !state.closed {
            let _ = self.signal.wait_for(&mut state, slice);
        }
        if state.ready > 0 {
            state.ready -= 1;
            return Ok(true);
        }
        if state.closed {
            return Err(FrameError::Closed);
        }
        Ok(false)
    }

    fn acquire(&self) -> Result<Frame, FrameError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(FrameError::Closed);
        }
        state.sequence += 1;
        let fill = (state.sequence & 0xff) as u8;
        let data = vec![fill; Frame::byte_len(self.width, self.height)];
        Frame::new(self.width, self.height, data).ok_or(FrameError::Closed)
    }
}

/// Display that records what it was given and replays pointer events.
#[derive(Default)]
pub struct MemoryDisplay {
    presented: AtomicU64,
    last: Mutex<Option<Frame>>,
    handler: Mutex<Option<PointerHandler>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last.lock().clone()
    }

    /// Deliver a pointer event to the registered handler, as a UI thread would.
    pub fn deliver_pointer(&self, event: PointerEvent) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

impl Display for MemoryDisplay {
    fn present(&self, frame: Frame) {
        self.presented.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(frame);
    }

    fn register_pointer_handler(&self, handler: PointerHandler) {
        *self.handler.lock() = Some(handler);
    }
}

/// Message bus that records sent annotations.
pub struct MemoryBus {
    handlers: Mutex<Vec<TimestampHandler>>,
    sent: Mutex<Vec<AnnotationEvent>>,
    fail_sends: AtomicBool,
    active: AtomicBool,
    /// Remaining `is_session_active` checks before deactivating; negative = unlimited
    remaining_checks: AtomicI64,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            active: AtomicBool::new(true),
            remaining_checks: AtomicI64::new(-1),
        }
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a frame-associated sample time to every registered handler.
    pub fn deliver_timestamp(&self, ts: ObservedTimestamp) {
        let handlers = self.handlers.lock().clone();
        for handler in handlers {
            handler(ts);
        }
    }

    pub fn sent(&self) -> Vec<AnnotationEvent> {
        self.sent.lock().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Report the session active for `checks` more polls, then inactive.
    pub fn deactivate_after_checks(&self, checks: i64) {
        self.remaining_checks.store(checks, Ordering::SeqCst);
    }
}

impl MessageBus for MemoryBus {
    fn register_timestamp_handler(&self, handler: TimestampHandler) {
        self.handlers.lock().push(handler);
    }

    fn send(&self, event: &AnnotationEvent) -> Result<(), BusError> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BusError::Send("injected failure".to_string()));
        }
        self.sent.lock().push(*event);
        Ok(())
    }

    fn is_session_active(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        let remaining = self.remaining_checks.load(Ordering::SeqCst);
        if remaining == 0 {
            self.active.store(false, Ordering::SeqCst);
            return false;
        }
        if remaining > 0 {
            self.remaining_checks.fetch_sub(1, Ordering::SeqCst);
        }
        true
    }
}
