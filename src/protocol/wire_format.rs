//! Wire format encoding and decoding.
//!
//! Implements the 8-byte frame header of the attach stream:
//! ```text
//! ┌──────────┬──────────┬─────────────────┐
//! │ Tag      │ Length   │ Payload         │
//! │ 4 bytes  │ 4 bytes  │ Length bytes    │
//! │ uint32 BE│ uint32 BE│                 │
//! └──────────┴──────────┴─────────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use crate::error::{AttachError, Result};

/// Frame header size in bytes (tag + length).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Tag for frames destined to the output sink.
pub const STDOUT_TAG: u32 = 0x0100_0000;

/// Tag for frames destined to the error sink.
pub const STDERR_TAG: u32 = 0x0200_0000;

/// Destination of a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Container standard output.
    Stdout,
    /// Container standard error.
    Stderr,
}

impl StreamType {
    /// Resolve a wire tag to a destination.
    ///
    /// Any tag other than [`STDOUT_TAG`] or [`STDERR_TAG`] is a protocol
    /// violation.
    ///
    /// # Example
    ///
    /// ```
    /// use docker_attach::protocol::{StreamType, STDERR_TAG};
    ///
    /// assert_eq!(StreamType::from_tag(STDERR_TAG).unwrap(), StreamType::Stderr);
    /// assert!(StreamType::from_tag(0x0300_0000).is_err());
    /// ```
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            STDOUT_TAG => Ok(StreamType::Stdout),
            STDERR_TAG => Ok(StreamType::Stderr),
            other => Err(AttachError::Protocol(format!(
                "unknown stream type {}",
                other >> 24
            ))),
        }
    }

    /// Wire tag for this destination.
    #[inline]
    pub fn tag(self) -> u32 {
        match self {
            StreamType::Stdout => STDOUT_TAG,
            StreamType::Stderr => STDERR_TAG,
        }
    }

    /// Short name used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            StreamType::Stdout => "stdout",
            StreamType::Stderr => "stderr",
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Destination of the payload.
    pub stream: StreamType,
    /// Payload length in bytes.
    pub length: u32,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(stream: StreamType, length: u32) -> Self {
        Self { stream, length }
    }

    /// Encode header to bytes (Big Endian).
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.stream.tag().to_be_bytes());
        buf[4..8].copy_from_slice(&self.length.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `Ok(None)` if the buffer is too short and a protocol error if
    /// the tag is not recognized.
    pub fn decode(buf: &[u8]) -> Result<Option<Self>> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let tag = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let length = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Ok(Some(Self {
            stream: StreamType::from_tag(tag)?,
            length,
        }))
    }
}
