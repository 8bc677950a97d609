//! Error types for VAT Core.
//!
//! Collaborator implementations map their own failures into these so the
//! pipeline can decide what is fatal (frame source) and what is logged and
//! counted (outbound send).

use thiserror::Error;

// ============================================================================
// Frame source errors
// ============================================================================

/// Failures of a frame source.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The named region does not exist or cannot be mapped
    #[error("shared region not found: {0}")]
    NotFound(String),

    /// The region is smaller than the configured frame
    #[error("shared region too small: {actual} bytes, need {required}")]
    TooSmall { required: usize, actual: usize },

    /// OS-level failure while waiting or locking
    #[error("frame source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source will produce no more frames
    #[error("frame source closed")]
    Closed,
}

// ============================================================================
// Message bus errors
// ============================================================================

/// Failures of the outbound message interface.
#[derive(Debug, Error)]
pub enum BusError {
    /// The message could not be delivered to the transport
    #[error("send failed: {0}")]
    Send(String),

    /// The event could not be represented on the wire
    #[error("encode failed: {0}")]
    Encode(String),

    /// The session is no longer active
    #[error("session closed")]
    Closed,
}

// ============================================================================
// Pipeline errors
// ============================================================================

/// Errors that stop the annotation loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame source failed: {0}")]
    Frame(#[from] FrameError),
}
