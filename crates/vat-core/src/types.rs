//! Data model shared by every VAT crate.

use std::fmt;

/// Bytes per pixel in a shared frame (little-endian ARGB, B,G,R,A in memory).
pub const PIXEL_STRIDE: usize = 4;

/// Number of microseconds in one second.
pub const MICROS_PER_SECOND: i32 = 1_000_000;

/// An owned snapshot of one frame copied out of the shared region.
///
/// Frames carry no timestamp; the sample time arrives out-of-band on the
/// message bus.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer. Returns `None` if `data` is shorter than
    /// `width * height * PIXEL_STRIDE`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() < Self::byte_len(width, height) {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Required buffer size for the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * PIXEL_STRIDE
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// "Is a drag in progress, and where".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerSample {
    pub active: bool,
    pub x: u16,
    pub y: u16,
}

/// Pointer event kind reported by a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    ButtonDown,
    ButtonUp,
    Move,
}

/// Pointer event in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: u16,
    pub y: u16,
}

impl PointerEvent {
    pub fn button_down(x: u16, y: u16) -> Self {
        Self { kind: PointerEventKind::ButtonDown, x, y }
    }

    pub fn button_up(x: u16, y: u16) -> Self {
        Self { kind: PointerEventKind::ButtonUp, x, y }
    }

    pub fn moved(x: u16, y: u16) -> Self {
        Self { kind: PointerEventKind::Move, x, y }
    }
}

/// Sample timestamp as carried by the upstream stream.
///
/// Ordering is lexicographic on `(seconds, microseconds)`, which matches time
/// order as long as `microseconds` stays within `0..MICROS_PER_SECOND`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservedTimestamp {
    pub seconds: i64,
    pub microseconds: i32,
}

impl ObservedTimestamp {
    pub const ZERO: Self = Self { seconds: 0, microseconds: 0 };

    pub fn new(seconds: i64, microseconds: i32) -> Self {
        Self { seconds, microseconds }
    }

    /// One microsecond earlier, borrowing from `seconds` when needed.
    ///
    /// `None` when no earlier value is representable.
    pub fn one_micro_earlier(self) -> Option<Self> {
        if self.microseconds == 0 {
            Some(Self {
                seconds: self.seconds.checked_sub(1)?,
                microseconds: MICROS_PER_SECOND - 1,
            })
        } else {
            Some(Self {
                seconds: self.seconds,
                microseconds: self.microseconds - 1,
            })
        }
    }

    /// Total microseconds since the epoch of the stream.
    pub fn as_micros(&self) -> i128 {
        i128::from(self.seconds) * i128::from(MICROS_PER_SECOND) + i128::from(self.microseconds)
    }
}

impl fmt::Display for ObservedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.seconds, self.microseconds)
    }
}

/// One operator click, correlated to the frame it was drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationEvent {
    /// Horizontal frame coordinate (published as azimuth).
    pub x: u16,
    /// Vertical frame coordinate (published as zenith).
    pub y: u16,
    pub timestamp: ObservedTimestamp,
}
