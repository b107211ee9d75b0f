//! Protocol module - wire format, framing, and the response header scanner.
//!
//! This module implements the byte-level pieces of the attach exchange:
//! - 8-byte frame header encoding/decoding
//! - Grow-only payload buffer for the demultiplexer
//! - `\r\n\r\n` header terminator scanner

mod frame;
mod frame_buffer;
mod header_scan;
mod wire_format;

pub use frame::{build_frame, build_raw_frame};
pub use frame_buffer::{FrameBuffer, BASE_BUF_SIZE};
pub use header_scan::{read_response_header, HeaderScanner, ResponseHeader, HEADER_TERMINATOR};
pub use wire_format::{FrameHeader, StreamType, FRAME_HEADER_SIZE, STDERR_TAG, STDOUT_TAG};
