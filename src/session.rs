//! Attach session lifecycle.
//!
//! An attach session drives one exchange with the daemon over a connection
//! it owns exclusively:
//! 1. Send the hand-built `POST .../attach` request
//! 2. Consume the response header up to `\r\n\r\n`
//! 3. Start the reader task on the rest of the connection
//! 4. Send stdin, if any, then half-close the write side
//! 5. Wait for the reader task, then release the connection
//!
//! The read half moves into the reader task at step 3 and is never touched
//! by the caller again. The write half stays with the caller.
//!
//! # Example
//!
//! ```ignore
//! use docker_attach::{AttachBuilder, BytesSender};
//!
//! let output = AttachBuilder::new("abc123")
//!     .path_prefix("v1.3")
//!     .logs(true)
//!     .stdin(BytesSender::new("hello"))
//!     .stdout(Vec::new())
//!     .stderr(Vec::new())
//!     .start(stream)
//!     .await?
//!     .wait_for()
//!     .await?;
//! ```

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};

use crate::config::{AttachConfig, DEFAULT_API_VERSION, DEFAULT_READ_BUFFER_SIZE};
use crate::demux::{AttachOutput, StreamDemuxer};
use crate::error::{AttachError, Result};
use crate::protocol::{read_response_header, FrameBuffer, ResponseHeader, BASE_BUF_SIZE};
use crate::sender::{InputSender, ReaderSender, DEFAULT_INPUT_CHUNK_SIZE};
use crate::transport::{connect, AttachStream, Endpoint};

/// Parameters of one attach request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachRequest {
    /// Path prefix, usually the API version.
    pub path_prefix: String,
    /// Target container.
    pub container_id: String,
    /// Replay earlier output.
    pub logs: bool,
    /// Stream live output.
    pub stream: bool,
    /// Whether input will be sent.
    pub stdin: bool,
    /// Whether an output sink is attached.
    pub stdout: bool,
    /// Whether an error sink is attached.
    pub stderr: bool,
}

impl AttachRequest {
    /// Create a request with default flags (`stream` only).
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            path_prefix: DEFAULT_API_VERSION.to_string(),
            container_id: container_id.into(),
            logs: false,
            stream: true,
            stdin: false,
            stdout: false,
            stderr: false,
        }
    }

    /// Request path with query string.
    ///
    /// # Example
    ///
    /// ```
    /// use docker_attach::AttachRequest;
    ///
    /// let mut request = AttachRequest::new("abc123");
    /// request.path_prefix = "/v1.3".to_string();
    /// assert_eq!(
    ///     request.path().unwrap(),
    ///     "/v1.3/containers/abc123/attach?logs=false&stream=true&stdin=false&stdout=false&stderr=false"
    /// );
    /// ```
    pub fn path(&self) -> Result<String> {
        if self.container_id.is_empty() {
            return Err(AttachError::Config("container id must not be empty".to_string()));
        }
        if self
            .container_id
            .chars()
            .any(|c| c.is_whitespace() || c == '/' || c == '?')
        {
            return Err(AttachError::Config(format!(
                "invalid container id {:?}",
                self.container_id
            )));
        }

        Ok(format!(
            "{}containers/{}/attach?logs={}&stream={}&stdin={}&stdout={}&stderr={}",
            normalize_prefix(&self.path_prefix),
            self.container_id,
            self.logs,
            self.stream,
            self.stdin,
            self.stdout,
            self.stderr,
        ))
    }

    /// Full request as written to the wire.
    pub fn request_line(&self) -> Result<String> {
        Ok(format!("POST {} HTTP/1.1\r\n\r\n", self.path()?))
    }
}

/// Wrap `prefix` in exactly one leading and one trailing `/`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Lifecycle of an attach session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection handed over, nothing sent yet.
    Connecting,
    /// Request written and flushed.
    HeaderSent,
    /// Response header consumed.
    HeaderReceived,
    /// Reader task running.
    Demuxing,
    /// Input sent and write side half-closed.
    InputSent,
    /// Connection released.
    Closed,
}

/// Builder for an attach session.
///
/// Sinks default to `tokio::io::Sink` as a placeholder type; an absent sink
/// means that stream is not requested and its frames are discarded.
pub struct AttachBuilder<O = tokio::io::Sink, E = tokio::io::Sink> {
    request: AttachRequest,
    stdin: Option<Box<dyn InputSender>>,
    stdout: Option<O>,
    stderr: Option<E>,
    read_buffer_size: usize,
    frame_buffer_size: usize,
    input_chunk_size: usize,
}

impl AttachBuilder {
    /// Start building an attach to `container_id`.
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            request: AttachRequest::new(container_id),
            stdin: None,
            stdout: None,
            stderr: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            frame_buffer_size: BASE_BUF_SIZE,
            input_chunk_size: DEFAULT_INPUT_CHUNK_SIZE,
        }
    }
}

impl<O, E> AttachBuilder<O, E>
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    /// Apply path prefix, flags, and buffer sizes from a configuration.
    pub fn config(mut self, config: &AttachConfig) -> Self {
        self.request.path_prefix = config.api_version.clone();
        self.request.logs = config.logs;
        self.request.stream = config.stream;
        self.read_buffer_size = config.read_buffer_size.max(1);
        self.frame_buffer_size = config.frame_buffer_size;
        self.input_chunk_size = config.input_chunk_size;
        self
    }

    /// Set the path prefix (usually the API version).
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.request.path_prefix = prefix.into();
        self
    }

    /// Set the `logs` flag.
    pub fn logs(mut self, logs: bool) -> Self {
        self.request.logs = logs;
        self
    }

    /// Set the `stream` flag.
    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    /// Attach stdin and send it with `sender`.
    pub fn stdin<T: InputSender>(mut self, sender: T) -> Self {
        self.stdin = Some(Box::new(sender));
        self
    }

    /// Attach stdin and copy `reader` into it.
    pub fn stdin_reader<R>(self, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let chunk_size = self.input_chunk_size;
        self.stdin(ReaderSender::with_chunk_size(reader, chunk_size))
    }

    /// Attach stdout, writing to `sink`.
    pub fn stdout<O2>(self, sink: O2) -> AttachBuilder<O2, E> {
        AttachBuilder {
            request: self.request,
            stdin: self.stdin,
            stdout: Some(sink),
            stderr: self.stderr,
            read_buffer_size: self.read_buffer_size,
            frame_buffer_size: self.frame_buffer_size,
            input_chunk_size: self.input_chunk_size,
        }
    }

    /// Attach stderr, writing to `sink`.
    pub fn stderr<E2>(self, sink: E2) -> AttachBuilder<O, E2> {
        AttachBuilder {
            request: self.request,
            stdin: self.stdin,
            stdout: self.stdout,
            stderr: Some(sink),
            read_buffer_size: self.read_buffer_size,
            frame_buffer_size: self.frame_buffer_size,
            input_chunk_size: self.input_chunk_size,
        }
    }

    /// The request as it will be sent, with stream flags filled in.
    pub fn request(&self) -> AttachRequest {
        AttachRequest {
            stdin: self.stdin.is_some(),
            stdout: self.stdout.is_some(),
            stderr: self.stderr.is_some(),
            ..self.request.clone()
        }
    }

    /// Open a connection to `endpoint` and start the session on it.
    pub async fn connect(self, endpoint: &Endpoint) -> Result<AttachSession<AttachStream, O, E>> {
        let stream = connect(endpoint).await?;
        self.start(stream).await
    }

    /// Start the session on an already connected stream.
    ///
    /// Returns once the request is sent, the response header consumed, the
    /// reader task started, and any input sent and half-closed.
    pub async fn start<S>(self, stream: S) -> Result<AttachSession<S, O, E>>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let request_line = self.request().request_line()?;
        AttachSession::start(stream, request_line, self).await
    }

    /// Start the session and wait for it to finish.
    pub async fn run<S>(self, stream: S) -> Result<AttachOutput<O, E>>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.start(stream).await?.wait_for().await
    }
}

/// A started attach session.
///
/// Dropping a session without waiting aborts the reader task.
pub struct AttachSession<S, O, E> {
    writer: Option<WriteHalf<S>>,
    demuxer: Option<StreamDemuxer<O, E>>,
    header: ResponseHeader,
    state: SessionState,
    input_closed: bool,
}

impl<S, O, E> AttachSession<S, O, E>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(stream: S, request_line: String, builder: AttachBuilder<O, E>) -> Result<Self> {
        let AttachBuilder {
            stdin,
            stdout,
            stderr,
            read_buffer_size,
            frame_buffer_size,
            ..
        } = builder;

        let mut state = SessionState::Connecting;
        let (read_half, mut write_half) = tokio::io::split(stream);

        write_half.write_all(request_line.as_bytes()).await?;
        write_half.flush().await?;
        state = advance(state, SessionState::HeaderSent);
        tracing::trace!(request = request_line.trim_end(), "sent request header");

        let mut reader: BufReader<ReadHalf<S>> =
            BufReader::with_capacity(read_buffer_size, read_half);
        let header = read_response_header(&mut reader).await?;
        state = advance(state, SessionState::HeaderReceived);
        tracing::debug!(status = header.status_line().unwrap_or(""), "received response header");

        let demuxer = StreamDemuxer::with_buffer(
            reader,
            stdout,
            stderr,
            FrameBuffer::with_capacity(frame_buffer_size),
        );
        state = advance(state, SessionState::Demuxing);

        let mut session = Self {
            writer: Some(write_half),
            demuxer: Some(demuxer),
            header,
            state,
            input_closed: false,
        };

        if let Some(sender) = stdin {
            if let Err(e) = session.send_input(sender).await {
                if let Err(close_err) = session.close().await {
                    tracing::error!(error = %close_err, "unable to close container attach connection");
                }
                return Err(e);
            }
        }

        Ok(session)
    }

    async fn send_input(&mut self, sender: Box<dyn InputSender>) -> Result<()> {
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Err(AttachError::Config("session already closed".to_string())),
        };

        sender.send(&mut *writer).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        self.input_closed = true;
        self.state = advance(self.state, SessionState::InputSent);
        tracing::trace!("sent input and FIN");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Response header consumed in step 2.
    pub fn response_header(&self) -> &ResponseHeader {
        &self.header
    }

    /// Whether the reader task has finished.
    pub fn is_finished(&self) -> bool {
        self.demuxer.as_ref().map_or(true, |d| d.is_finished())
    }

    /// Wait for the reader task, release the connection, and return the sinks.
    ///
    /// # Errors
    ///
    /// The reader task's failure, [`AttachError::Interrupted`] if it did
    /// not run to completion, or [`AttachError::Close`] if only releasing
    /// the connection failed.
    pub async fn wait_for(self) -> Result<AttachOutput<O, E>> {
        match self.wait_for_output().await {
            (Some(output), Ok(())) => Ok(output),
            (_, Err(e)) => Err(e),
            (None, Ok(())) => Err(AttachError::Interrupted(
                "container output reader produced no result".to_string(),
            )),
        }
    }

    /// Like [`wait_for`](Self::wait_for) but returns the sinks even on
    /// failure, holding whatever complete frames arrived before it.
    ///
    /// The sinks are `None` only when the reader task was interrupted.
    pub async fn wait_for_output(mut self) -> (Option<AttachOutput<O, E>>, Result<()>) {
        let joined = match self.demuxer.take() {
            Some(demuxer) => demuxer.wait_for().await,
            None => Err(AttachError::Interrupted("session already closed".to_string())),
        };
        let (output, failure) = match joined {
            Ok(demuxed) => {
                let (output, failure) = demuxed.into_parts();
                (Some(output), failure)
            }
            Err(e) => (None, Some(e)),
        };

        let closed = self.close().await;
        let result = match (failure, closed) {
            (Some(failure), Err(close_err)) => {
                tracing::error!(error = %close_err, "unable to close container attach connection");
                Err(failure)
            }
            (Some(failure), Ok(())) => Err(failure),
            (None, closed) => closed,
        };
        (output, result)
    }

    /// Release the connection. Safe to call more than once.
    ///
    /// Aborts the reader task if it is still running and shuts down the
    /// write side if input has not already done so.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;

        if let Some(demuxer) = self.demuxer.take() {
            if !demuxer.is_finished() {
                tracing::debug!("aborting container output reader");
                demuxer.abort();
            }
        }

        let result = match self.writer.take() {
            Some(mut writer) if !self.input_closed => match writer.shutdown().await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(e) => Err(AttachError::Close(e)),
            },
            _ => Ok(()),
        };
        tracing::debug!("attach connection closed");
        result
    }
}

impl<S, O, E> Drop for AttachSession<S, O, E> {
    fn drop(&mut self) {
        if let Some(demuxer) = self.demuxer.take() {
            demuxer.abort();
        }
    }
}

fn advance(from: SessionState, to: SessionState) -> SessionState {
    tracing::trace!(?from, ?to, "attach session state");
    to
}
