//! Frame construction helpers.
//!
//! The client only ever reads frames; these helpers build the daemon side
//! of the stream for fake daemons and tests.
//!
//! # Example
//!
//! ```
//! use docker_attach::protocol::{build_frame, StreamType, FRAME_HEADER_SIZE};
//!
//! let bytes = build_frame(StreamType::Stdout, b"hello");
//! assert_eq!(bytes.len(), FRAME_HEADER_SIZE + 5);
//! assert_eq!(&bytes[..4], &[0x01, 0, 0, 0]);
//! ```

use super::wire_format::{FrameHeader, StreamType, FRAME_HEADER_SIZE};

/// Build a complete frame as a single byte vector.
pub fn build_frame(stream: StreamType, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader::new(stream, payload.len() as u32);
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}

/// Build a frame with an arbitrary tag, recognized or not.
pub fn build_raw_frame(tag: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}
