//! Datagram framing for session payloads.
//!
//! Every datagram is `0x0D 0xA4` followed by a 3-byte little-endian payload
//! length and the payload itself.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Frame magic bytes
pub const MAGIC: [u8; 2] = [0x0D, 0xA4];

/// Magic plus 3-byte length
pub const HEADER_LEN: usize = 5;

/// Largest payload a 3-byte length can describe
pub const MAX_PAYLOAD_SIZE: usize = 0x00FF_FFFF;

/// Framing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("Frame too large: {0} bytes (max: {1})")]
    TooLarge(usize, usize),

    #[error("Incomplete frame: need {0} more bytes")]
    Incomplete(usize),

    #[error("Invalid frame magic: {0:#04x} {1:#04x}")]
    BadMagic(u8, u8),
}

/// Codec for magic-prefixed, length-delimited frames
#[derive(Debug, Clone, Copy)]
pub struct Od4Codec {
    max_payload_size: usize,
}

impl Default for Od4Codec {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_SIZE)
    }
}

impl Od4Codec {
    /// Create a codec with a smaller payload limit than the wire allows
    pub fn new(max_payload_size: usize) -> Self {
        Self {
            max_payload_size: max_payload_size.min(MAX_PAYLOAD_SIZE),
        }
    }

    /// Encode `payload` with magic and length prefix
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, FramingError> {
        if payload.len() > self.max_payload_size {
            return Err(FramingError::TooLarge(payload.len(), self.max_payload_size));
        }

        let mut encoded = Vec::with_capacity(HEADER_LEN + payload.len());
        encoded.put_slice(&MAGIC);
        encoded.put_uint_le(payload.len() as u64, 3);
        encoded.extend_from_slice(payload);
        Ok(encoded)
    }

    /// Decode a single frame. Bytes past the declared length are ignored.
    pub fn decode<'a>(&self, framed: &'a [u8]) -> Result<&'a [u8], FramingError> {
        let len = self.peek_len(framed)?.ok_or(FramingError::Incomplete(
            HEADER_LEN - framed.len().min(HEADER_LEN),
        ))?;

        let body = &framed[HEADER_LEN..];
        if body.len() < len {
            return Err(FramingError::Incomplete(len - body.len()));
        }
        Ok(&body[..len])
    }

    /// Streaming decoder for concatenated frames.
    /// Returns Some(payload) when a complete frame is available, None if more data needed
    pub fn decode_stream(&self, buf: &mut BytesMut) -> Result<Option<Vec<u8>>, FramingError> {
        let Some(len) = self.peek_len(buf)? else {
            return Ok(None);
        };

        if buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(HEADER_LEN);
        Ok(Some(buf.split_to(len).to_vec()))
    }

    fn peek_len(&self, framed: &[u8]) -> Result<Option<usize>, FramingError> {
        // Reject bad magic as early as the bytes allow
        if let Some(&first) = framed.first() {
            let second = framed.get(1).copied().unwrap_or(MAGIC[1]);
            if first != MAGIC[0] || second != MAGIC[1] {
                return Err(FramingError::BadMagic(first, second));
            }
        }
        if framed.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut len_buf = &framed[2..HEADER_LEN];
        let len = len_buf.get_uint_le(3) as usize;
        if len > self.max_payload_size {
            return Err(FramingError::TooLarge(len, self.max_payload_size));
        }
        Ok(Some(len))
    }
}
