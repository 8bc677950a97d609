#![cfg(target_os = "linux")]

use std::time::Duration;

use tracing::debug;
use vat_core::{Frame, FrameError, FrameSource};

use crate::shm::{SharedRegion, ShmError};

impl From<ShmError> for FrameError {
    fn from(e: ShmError) -> Self {
        match e {
            ShmError::NotFound { name, .. } | ShmError::InvalidHeader(name) => FrameError::NotFound(name),
            ShmError::InvalidName(name) => FrameError::NotFound(name),
            ShmError::MapFailed(e) | ShmError::CreationFailed(e) => FrameError::Io(e),
            ShmError::Pthread { op, code } => FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{op} failed with error code {code}"),
            )),
        }
    }
}

/// Consumer side of a shared-memory frame hand-off.
///
/// Frames are copied out under the region lock, which is released as soon as
/// the copy is done so the producer is never held up by display or messaging.
pub struct FrameChannel {
    region: SharedRegion,
    width: u32,
    height: u32,
    frame_len: usize,
}

impl FrameChannel {
    /// Attach to the producer's region for frames of `width` x `height`.
    pub fn attach(name: &str, width: u32, height: u32) -> Result<Self, FrameError> {
        let region = SharedRegion::open(name)?;
        let frame_len = Frame::byte_len(width, height);
        if region.size() < frame_len {
            return Err(FrameError::TooSmall {
                required: frame_len,
                actual: region.size(),
            });
        }

        debug!(name = region.name(), size = region.size(), width, height, "region attached");
        Ok(Self {
            region,
            width,
            height,
            frame_len,
        })
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Size of the region's data area in bytes.
    pub fn size(&self) -> usize {
        self.region.size()
    }

    /// Block until the producer signals a new frame. No timeout.
    pub fn wait_for_next(&self) -> Result<(), FrameError> {
        Ok(self.region.wait()?)
    }

    /// Copy the current frame out of the region.
    pub fn acquire(&self) -> Result<Frame, FrameError> {
        let mut data = vec![0u8; self.frame_len];
        {
            let lock = self.region.lock()?;
            data.copy_from_slice(&lock.data()[..self.frame_len]);
        }
        debug!(bytes = self.frame_len, "frame acquired");
        Frame::new(self.width, self.height, data).ok_or(FrameError::TooSmall {
            required: self.frame_len,
            actual: self.region.size(),
        })
    }
}

impl FrameSource for FrameChannel {
    fn wait_for_next_timeout(&self, slice: Duration) -> Result<bool, FrameError> {
        Ok(self.region.wait_timeout(slice)?)
    }

    fn acquire(&self) -> Result<Frame, FrameError> {
        FrameChannel::acquire(self)
    }
}

/// Producer side: owns the region and publishes frames into it.
pub struct FrameProducer {
    region: SharedRegion,
    frame_len: usize,
}

impl FrameProducer {
    pub fn create(name: &str, width: u32, height: u32) -> Result<Self, ShmError> {
        let frame_len = Frame::byte_len(width, height);
        let region = SharedRegion::create(name, frame_len)?;
        Ok(Self { region, frame_len })
    }

    pub fn name(&self) -> &str {
        self.region.name()
    }

    /// Write `pixels` under the lock, then wake consumers.
    pub fn publish(&self, pixels: &[u8]) -> Result<(), ShmError> {
        {
            let mut lock = self.region.lock()?;
            let len = pixels.len().min(self.frame_len);
            lock.data_mut()[..len].copy_from_slice(&pixels[..len]);
        }
        self.region.notify_all()
    }
}
