#![cfg(target_os = "linux")]

// Re-export the frame source trait from vat-core
pub use vat_core::platform::FrameSource;

// Shared memory region
pub mod shm;

// Frame hand-off over a shared region
pub mod frame_channel;

pub use frame_channel::{FrameChannel, FrameProducer};
pub use shm::{SharedRegion, ShmError};
