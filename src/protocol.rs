//! Wire Protocol Module
//!
//! Fixed framing shared by clients, the cache and the origin:
//!
//! ```text
//! +----------------+--------------+-----------------+-------------+
//! | request_id u32 | key_len u16  | key (key_len B) | payload ... |
//! +----------------+--------------+-----------------+-------------+
//! ```
//!
//! Integers are big-endian. Replies to clients carry the original key with a
//! single `H` or `M` appended. Payload bytes after the key are opaque padding.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 6;

/// Marker appended to a reply key for a hit.
pub const HIT_MARKER: char = 'H';

/// Marker appended to a reply key for a miss.
pub const MISS_MARKER: char = 'M';

// == Outcome ==
/// Whether a reply was served from the store or fetched from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
}

impl Outcome {
    pub fn marker(self) -> char {
        match self {
            Outcome::Hit => HIT_MARKER,
            Outcome::Miss => MISS_MARKER,
        }
    }
}

// == Frame ==
/// One request or reply: an identifier and a resource key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub request_id: u32,
    pub key: String,
}

impl Frame {
    pub fn new(request_id: u32, key: impl Into<String>) -> Self {
        Self {
            request_id,
            key: key.into(),
        }
    }

    /// Builds a client reply: the key with its outcome marker appended.
    pub fn reply(request_id: u32, key: &str, outcome: Outcome) -> Self {
        let mut marked = String::with_capacity(key.len() + 1);
        marked.push_str(key);
        marked.push(outcome.marker());
        Self::new(request_id, marked)
    }

    /// Splits a client reply key into the resource key and its outcome.
    ///
    /// Returns None if the key carries no recognised marker.
    pub fn split_reply(&self) -> Option<(&str, Outcome)> {
        let outcome = match self.key.chars().last()? {
            HIT_MARKER => Outcome::Hit,
            MISS_MARKER => Outcome::Miss,
            _ => return None,
        };
        Some((&self.key[..self.key.len() - 1], outcome))
    }

    /// Bytes occupied by header and key, where the payload starts.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.key.len()
    }

    /// Serializes the frame followed by `payload_len` zero bytes.
    pub fn encode(&self, payload_len: usize) -> Result<Bytes, FrameError> {
        let key_len = u16::try_from(self.key.len())
            .map_err(|_| FrameError::KeyTooLong(self.key.len()))?;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.key.len() + payload_len);
        buf.put_u32(self.request_id);
        buf.put_u16(key_len);
        buf.put_slice(self.key.as_bytes());
        buf.put_bytes(0, payload_len);
        Ok(buf.freeze())
    }

    /// Parses a frame from the start of `data`, ignoring trailing payload.
    pub fn decode(mut data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::Truncated(data.len()));
        }

        let request_id = data.get_u32();
        let declared = data.get_u16() as usize;
        if declared > data.remaining() {
            return Err(FrameError::LengthOverflow {
                declared,
                remaining: data.remaining(),
            });
        }

        let key = std::str::from_utf8(&data[..declared])
            .map_err(|_| FrameError::InvalidKey)?
            .to_string();

        Ok(Self { request_id, key })
    }
}
