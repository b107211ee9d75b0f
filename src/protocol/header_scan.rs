//! HTTP response header scanner.
//!
//! The attach response is a plain HTTP header followed by the raw
//! multiplexed stream on the same connection. The scanner consumes bytes
//! one at a time until it has seen `\r\n\r\n` and stops exactly there, so
//! the next read on the source starts at the first byte of the body.
//!
//! Matching is an explicit automaton over [`Progress`]. When a byte breaks
//! a partial match, the bytes matched so far are written back into the
//! captured header in their original order before the breaking byte is
//! handled. A breaking `\r` starts a new match instead of being appended,
//! which is what lets `\r\r\n\r\n` terminate correctly.
//!
//! # Example
//!
//! ```
//! use docker_attach::protocol::HeaderScanner;
//!
//! let mut scanner = HeaderScanner::new();
//! let input = b"HTTP/1.1 200 OK\r\n\r\nbody";
//! let used = input.iter().position(|&b| scanner.push(b)).unwrap() + 1;
//!
//! assert_eq!(&input[used..], b"body");
//! assert_eq!(scanner.into_header().as_bytes(), b"HTTP/1.1 200 OK\r\n\r\n");
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{AttachError, Result};

/// Header section terminator.
pub const HEADER_TERMINATOR: &[u8; 4] = b"\r\n\r\n";

/// How much of the terminator has been matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Idle,
    Cr,
    CrLf,
    CrLfCr,
    Complete,
}

impl Progress {
    /// Bytes provisionally held back while in this state.
    fn pending(self) -> &'static [u8] {
        match self {
            Progress::Idle => b"",
            Progress::Cr => b"\r",
            Progress::CrLf => b"\r\n",
            Progress::CrLfCr => b"\r\n\r",
            Progress::Complete => HEADER_TERMINATOR,
        }
    }

    fn advance(self, byte: u8) -> Option<Progress> {
        match (self, byte) {
            (Progress::Idle, b'\r') => Some(Progress::Cr),
            (Progress::Cr, b'\n') => Some(Progress::CrLf),
            (Progress::CrLf, b'\r') => Some(Progress::CrLfCr),
            (Progress::CrLfCr, b'\n') => Some(Progress::Complete),
            _ => None,
        }
    }
}

/// Incremental scanner for the end of an HTTP header section.
#[derive(Debug)]
pub struct HeaderScanner {
    header: BytesMut,
    progress: Progress,
}

impl HeaderScanner {
    /// Create a scanner with nothing matched.
    pub fn new() -> Self {
        Self {
            header: BytesMut::with_capacity(256),
            progress: Progress::Idle,
        }
    }

    /// Feed one byte. Returns `true` once the terminator is complete.
    ///
    /// Bytes pushed after completion are ignored.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.progress == Progress::Complete {
            return true;
        }

        match self.progress.advance(byte) {
            Some(Progress::Complete) => {
                self.progress = Progress::Complete;
                self.header.extend_from_slice(HEADER_TERMINATOR);
                return true;
            }
            Some(next) => self.progress = next,
            None => {
                self.header.extend_from_slice(self.progress.pending());
                if byte == b'\r' {
                    self.progress = Progress::Cr;
                } else {
                    self.header.put_u8(byte);
                    self.progress = Progress::Idle;
                }
            }
        }
        false
    }

    /// Whether the terminator has been seen.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.progress == Progress::Complete
    }

    /// Number of bytes consumed so far, including held-back CR/LF bytes.
    pub fn consumed(&self) -> usize {
        if self.is_complete() {
            self.header.len()
        } else {
            self.header.len() + self.progress.pending().len()
        }
    }

    /// Take the captured header, terminator included when complete.
    pub fn into_header(self) -> ResponseHeader {
        ResponseHeader {
            raw: self.header.freeze(),
        }
    }
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw response header captured by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    raw: Bytes,
}

impl ResponseHeader {
    /// Header bytes, terminator included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// First line of the header, without its line ending.
    pub fn status_line(&self) -> Option<&str> {
        let end = self
            .raw
            .windows(2)
            .position(|w| w == b"\r\n")
            .unwrap_or(self.raw.len());
        std::str::from_utf8(&self.raw[..end]).ok()
    }

    /// Numeric status from the status line, if it parses.
    ///
    /// Informational only; the attach exchange does not check it.
    pub fn status_code(&self) -> Option<u16> {
        self.status_line()?.split_whitespace().nth(1)?.parse().ok()
    }
}

/// Consume a response header from `reader` up to and including `\r\n\r\n`.
///
/// Bytes are taken from the reader's buffer one at a time and only the
/// bytes that belong to the header are consumed.
///
/// # Errors
///
/// - [`AttachError::IncompleteHeader`] if the source ends first.
/// - [`AttachError::Io`] for any read failure.
pub async fn read_response_header<R>(reader: &mut R) -> Result<ResponseHeader>
where
    R: AsyncBufRead + Unpin,
{
    let mut scanner = HeaderScanner::new();
    tracing::debug!("starting header consumer");

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            let received = scanner.consumed();
            let partial = scanner.into_header();
            tracing::error!(
                received,
                header = %String::from_utf8_lossy(partial.as_bytes()),
                "unexpected EOF indicates incomplete response header"
            );
            return Err(AttachError::IncompleteHeader { received });
        }

        let mut used = 0;
        let mut done = false;
        for &byte in available {
            used += 1;
            if scanner.push(byte) {
                done = true;
                break;
            }
        }
        reader.consume(used);

        if done {
            let header = scanner.into_header();
            tracing::trace!(header = %String::from_utf8_lossy(header.as_bytes()), "received header");
            return Ok(header);
        }
    }
}
