//! Attach stream demultiplexer.
//!
//! The daemon interleaves container stdout and stderr on one connection as
//! a sequence of tagged frames. [`StreamDemuxer`] reads them on a dedicated
//! tokio task and copies each payload to the matching sink.
//!
//! # Architecture
//!
//! ```text
//!                         ┌─► stdout sink (tag 0x01000000)
//! read half ─► Reader Task┤
//!                         └─► stderr sink (tag 0x02000000)
//! ```
//!
//! The task owns the read half and both sinks. It hands them back, with
//! the first fatal failure if any, as the output of its `JoinHandle`, so
//! the failure can only be observed after the task has finished.
//!
//! # Example
//!
//! ```ignore
//! use docker_attach::demux::StreamDemuxer;
//!
//! let demuxer = StreamDemuxer::spawn(read_half, Some(Vec::new()), Some(Vec::new()));
//! let demuxed = demuxer.wait_for().await?;
//! let output = demuxed.into_result()?;
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::{AttachError, Result};
use crate::protocol::{FrameBuffer, StreamType};

/// Counters collected while demultiplexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Frames fully read, including discarded ones.
    pub frames: u64,
    /// Payload bytes written to the stdout sink.
    pub stdout_bytes: u64,
    /// Payload bytes written to the stderr sink.
    pub stderr_bytes: u64,
    /// Frames read whose destination sink was absent.
    pub discarded_frames: u64,
}

/// Sinks handed back once the reader task is done.
#[derive(Debug)]
pub struct AttachOutput<O, E> {
    /// Output sink, if one was supplied.
    pub stdout: Option<O>,
    /// Error sink, if one was supplied.
    pub stderr: Option<E>,
    /// What was read.
    pub stats: DemuxStats,
}

/// Terminal state of a finished reader task.
#[derive(Debug)]
pub struct Demuxed<O, E> {
    output: AttachOutput<O, E>,
    failure: Option<AttachError>,
}

impl<O, E> Demuxed<O, E> {
    /// The output sink.
    pub fn stdout(&self) -> Option<&O> {
        self.output.stdout.as_ref()
    }

    /// The error sink.
    pub fn stderr(&self) -> Option<&E> {
        self.output.stderr.as_ref()
    }

    /// Frame and byte counters.
    pub fn stats(&self) -> DemuxStats {
        self.output.stats
    }

    /// The failure that stopped the task, `None` on clean end of stream.
    pub fn failure(&self) -> Option<&AttachError> {
        self.failure.as_ref()
    }

    /// Split into sinks and the recorded failure.
    pub fn into_parts(self) -> (AttachOutput<O, E>, Option<AttachError>) {
        (self.output, self.failure)
    }

    /// Sinks on clean termination, the recorded failure otherwise.
    pub fn into_result(self) -> Result<AttachOutput<O, E>> {
        match self.failure {
            None => Ok(self.output),
            Some(err) => Err(err),
        }
    }
}

/// Handle to a running demultiplexer task.
///
/// Dropping the handle does not stop the task; use [`abort`](Self::abort).
pub struct StreamDemuxer<O, E> {
    task: JoinHandle<Demuxed<O, E>>,
}

impl<O, E> StreamDemuxer<O, E> {
    /// Whether the task has terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task at its next suspension point.
    ///
    /// A later [`wait_for`](Self::wait_for) reports [`AttachError::Interrupted`].
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl<O, E> StreamDemuxer<O, E>
where
    O: AsyncWrite + Unpin + Send + 'static,
    E: AsyncWrite + Unpin + Send + 'static,
{
    /// Start consuming `reader` on a new task. Does not block.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R, stdout: Option<O>, stderr: Option<E>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::with_buffer(reader, stdout, stderr, FrameBuffer::new())
    }

    /// Start consuming `reader` with a caller-supplied payload buffer.
    pub fn with_buffer<R>(
        reader: R,
        stdout: Option<O>,
        stderr: Option<E>,
        buffer: FrameBuffer,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let task = tokio::spawn(run_demux(reader, stdout, stderr, buffer));
        Self { task }
    }

    /// Wait until the task has terminated and take its terminal state.
    ///
    /// # Errors
    ///
    /// [`AttachError::Interrupted`] if the task was aborted or panicked.
    /// Stream failures are not errors here; they are in [`Demuxed::failure`].
    pub async fn wait_for(self) -> Result<Demuxed<O, E>> {
        tracing::debug!("waiting for demuxer to complete");
        let demuxed = self.task.await?;
        tracing::debug!(stats = ?demuxed.output.stats, "demuxer finished");
        Ok(demuxed)
    }
}

/// Reader task body. Never fails; the first failure is recorded instead.
async fn run_demux<R, O, E>(
    mut reader: R,
    mut stdout: Option<O>,
    mut stderr: Option<E>,
    mut buffer: FrameBuffer,
) -> Demuxed<O, E>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    tracing::debug!(
        stdout = stdout.is_some(),
        stderr = stderr.is_some(),
        "demuxer started"
    );
    let mut stats = DemuxStats::default();

    let failure = demux_loop(&mut reader, &mut stdout, &mut stderr, &mut buffer, &mut stats)
        .await
        .err();

    Demuxed {
        output: AttachOutput {
            stdout,
            stderr,
            stats,
        },
        failure,
    }
}

async fn demux_loop<R, O, E>(
    reader: &mut R,
    stdout: &mut Option<O>,
    stderr: &mut Option<E>,
    buffer: &mut FrameBuffer,
    stats: &mut DemuxStats,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    loop {
        let tag = match read_tag(reader).await {
            Ok(Some(tag)) => tag,
            Ok(None) => {
                tracing::trace!("stream EOF");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(error = %e, "unexpected I/O error in stream header");
                return Err(e.into());
            }
        };

        let stream = StreamType::from_tag(tag).map_err(|e| {
            tracing::error!(tag, "{}", e);
            e
        })?;

        let length = reader.read_u32().await.map_err(|e| {
            tracing::error!(error = %e, "unexpected I/O error in stream header");
            e
        })? as usize;

        reader
            .read_exact(buffer.payload_mut(length))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, length, "unexpected I/O error in frame");
                e
            })?;
        let payload = buffer.payload(length);
        tracing::trace!(stream = stream.as_str(), length, "received frame");

        stats.frames += 1;
        let delivered = match stream {
            StreamType::Stdout => write_payload(stdout.as_mut(), payload).await?,
            StreamType::Stderr => write_payload(stderr.as_mut(), payload).await?,
        };
        match (delivered, stream) {
            (false, _) => stats.discarded_frames += 1,
            (true, StreamType::Stdout) => stats.stdout_bytes += length as u64,
            (true, StreamType::Stderr) => stats.stderr_bytes += length as u64,
        }
    }
}

/// Read a 4-byte tag, distinguishing a clean EOF from a truncated tag.
async fn read_tag<R>(reader: &mut R) -> io::Result<Option<u32>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside frame tag",
            ));
        }
        filled += n;
    }
    Ok(Some(u32::from_be_bytes(buf)))
}

/// Write a payload to a sink. Returns `false` when the sink is absent.
async fn write_payload<W>(sink: Option<&mut W>, payload: &[u8]) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    match sink {
        Some(sink) => {
            sink.write_all(payload).await.map_err(|e| {
                tracing::error!(error = %e, "unable to write frame to sink");
                e
            })?;
            sink.flush().await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
