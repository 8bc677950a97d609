//! Session wire messages.

use prost::Message;
use vat_core::{AnnotationEvent, ObservedTimestamp};

use crate::framing::{FramingError, Od4Codec};

/// Data type id of frame-associated image readings
pub const IMAGE_READING_ID: i32 = 1055;

/// Data type id of pointing directions (the annotation payload)
pub const DIRECTION_ID: i32 = 1037;

#[derive(Clone, Copy, PartialEq, Message)]
pub struct TimeStamp {
    #[prost(sint32, tag = "1")]
    pub seconds: i32,
    #[prost(sint32, tag = "2")]
    pub microseconds: i32,
}

impl From<TimeStamp> for ObservedTimestamp {
    fn from(ts: TimeStamp) -> Self {
        ObservedTimestamp::new(i64::from(ts.seconds), ts.microseconds)
    }
}

impl TryFrom<ObservedTimestamp> for TimeStamp {
    type Error = std::num::TryFromIntError;

    fn try_from(ts: ObservedTimestamp) -> Result<Self, Self::Error> {
        Ok(Self {
            seconds: i32::try_from(ts.seconds)?,
            microseconds: ts.microseconds,
        })
    }
}

/// Wrapper around every message on the session
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(sint32, tag = "1")]
    pub data_type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub serialized_data: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub sent: Option<TimeStamp>,
    #[prost(message, optional, tag = "4")]
    pub received: Option<TimeStamp>,
    #[prost(message, optional, tag = "5")]
    pub sample_time_stamp: Option<TimeStamp>,
    #[prost(uint32, tag = "6")]
    pub sender_stamp: u32,
}

impl Envelope {
    /// Sample time, falling back to the send time when unset
    pub fn sample_time(&self) -> Option<ObservedTimestamp> {
        self.sample_time_stamp
            .or(self.sent)
            .map(ObservedTimestamp::from)
    }

    /// Encode and frame for a single datagram
    pub fn to_datagram(&self, codec: &Od4Codec) -> Result<Vec<u8>, FramingError> {
        codec.encode(&self.encode_to_vec())
    }
}

/// Camera image metadata; only the enclosing envelope's timestamps matter here
#[derive(Clone, PartialEq, Message)]
pub struct ImageReading {
    #[prost(string, tag = "1")]
    pub fourcc: String,
    #[prost(uint32, tag = "2")]
    pub width: u32,
    #[prost(uint32, tag = "3")]
    pub height: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
}

/// Pointing direction; carries the annotated pixel coordinates
#[derive(Clone, Copy, PartialEq, Message)]
pub struct Direction {
    #[prost(float, tag = "1")]
    pub azimuth_angle: f32,
    #[prost(float, tag = "2")]
    pub zenith_angle: f32,
}

impl From<&AnnotationEvent> for Direction {
    fn from(event: &AnnotationEvent) -> Self {
        Self {
            azimuth_angle: event.x as f32,
            zenith_angle: event.y as f32,
        }
    }
}
