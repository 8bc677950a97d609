//! Frame viewer window for the Video Annotation Tool.
//!
//! `ViewerHandle` is the display collaborator the pipeline presents frames
//! to; `run` drives the window on the calling thread until it is closed.

pub mod app;
pub mod handle;
pub mod input;
pub mod renderer;

pub use app::{run, KeepRunning, ViewerApp, ViewerOptions};
pub use handle::{channel, FrameReceiver, ViewerHandle};
pub use input::CoordinateMapper;
pub use renderer::FrameRenderer;
