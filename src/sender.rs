//! Input senders for the container's standard input.
//!
//! An attach session with stdin enabled hands the write half of the
//! connection to an [`InputSender`] once the reader task is running. When
//! the sender returns, the session flushes and half-closes the connection
//! so the daemon sees end of input.
//!
//! - [`BytesSender`] - a fixed payload
//! - [`ReaderSender`] - everything an `AsyncRead` produces, in chunks
//! - [`NullSender`] - nothing, but stdin is still attached and closed
//!
//! # Example
//!
//! ```ignore
//! use docker_attach::sender::{BytesSender, InputSender};
//!
//! let sender: Box<dyn InputSender> = Box::new(BytesSender::new("hello"));
//! sender.send(&mut write_half).await?;
//! ```

use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Boxed future for sender results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Write sink handed to a sender.
pub type InputSink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// Default chunk size for [`ReaderSender`].
pub const DEFAULT_INPUT_CHUNK_SIZE: usize = 64 * 1024;

/// Producer of container input.
pub trait InputSender: Send + 'static {
    /// Write all input to `sink`. Consumes the sender.
    fn send<'a>(self: Box<Self>, sink: InputSink<'a>) -> BoxFuture<'a, io::Result<()>>;
}

/// Sends a fixed byte payload.
#[derive(Debug, Clone)]
pub struct BytesSender {
    bytes: Bytes,
}

impl BytesSender {
    /// Create a sender for `bytes`.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Payload length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl InputSender for BytesSender {
    fn send<'a>(self: Box<Self>, sink: InputSink<'a>) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            sink.write_all(&self.bytes).await?;
            tracing::trace!(bytes = self.bytes.len(), "sent input payload");
            Ok(())
        })
    }
}

/// Copies an `AsyncRead` to the sink until it reaches EOF.
pub struct ReaderSender<R> {
    reader: R,
    chunk_size: usize,
}

impl<R> ReaderSender<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Create a sender with [`DEFAULT_INPUT_CHUNK_SIZE`] chunks.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_INPUT_CHUNK_SIZE)
    }

    /// Create a sender with a custom chunk size (at least 1 byte).
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R> InputSender for ReaderSender<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn send<'a>(self: Box<Self>, sink: InputSink<'a>) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            let ReaderSender {
                mut reader,
                chunk_size,
            } = *self;
            let mut buf = vec![0u8; chunk_size];
            let mut total = 0usize;
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                sink.write_all(&buf[..n]).await?;
                total += n;
            }
            tracing::trace!(bytes = total, "copied input stream");
            Ok(())
        })
    }
}

/// Sends nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSender;

impl InputSender for NullSender {
    fn send<'a>(self: Box<Self>, _sink: InputSink<'a>) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}
