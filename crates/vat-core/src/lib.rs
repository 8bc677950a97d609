//! VAT Core - annotation logic for the Video Annotation Tool.
//!
//! This crate implements:
//! - The data model shared by every VAT crate
//! - The pointer drag state machine fed by a display surface
//! - Timestamp correlation against upstream frame sample times
//! - Collaborator traits for the frame source, display, and message bus
//! - The annotation pipeline tying them together
//! - In-memory collaborators for tests and tooling

#![forbid(unsafe_code)]

// Core state
pub mod pointer;
pub mod correlator;

// Orchestration
pub mod pipeline;

// Supporting modules
pub mod errors;
pub mod types;
pub mod harness;

// Collaborator abstraction
pub mod platform;

#[cfg(test)]
mod proptests;

pub use correlator::TimestampCorrelator;
pub use errors::{BusError, FrameError, PipelineError};
pub use pipeline::{AnnotationPipeline, EmitHook, PipelineOptions, PipelineStats};
pub use platform::{Display, FrameSource, MessageBus, PointerHandler, TimestampHandler};
pub use pointer::PointerState;
pub use types::{
    AnnotationEvent, Frame, ObservedTimestamp, PointerEvent, PointerEventKind, PointerSample,
    PIXEL_STRIDE,
};
