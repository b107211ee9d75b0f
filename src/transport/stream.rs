//! Daemon connection over TCP or a Unix domain socket.
//!
//! - TCP: `tcp://host:port` or bare `host:port`
//! - Unix: `unix:///path/to/docker.sock` (unix platforms only)
//!
//! # Example
//!
//! ```ignore
//! use docker_attach::transport::{connect, Endpoint};
//!
//! let endpoint = Endpoint::parse("unix:///var/run/docker.sock")?;
//! let stream = connect(&endpoint).await?;
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::error::{AttachError, Result};

/// Address of a container daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP `host:port`.
    Tcp(String),
    /// Unix domain socket path.
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse `tcp://host:port`, `unix:///path`, or `host:port`.
    pub fn parse(address: &str) -> Result<Self> {
        if let Some(path) = address.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(AttachError::Config(format!(
                    "missing socket path in endpoint {address:?}"
                )));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let host_port = address.strip_prefix("tcp://").unwrap_or(address);
        if host_port.contains("://") {
            return Err(AttachError::Config(format!(
                "unsupported endpoint scheme in {address:?}"
            )));
        }
        match host_port.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Endpoint::Tcp(host_port.to_string()))
            }
            _ => Err(AttachError::Config(format!(
                "expected host:port in endpoint {address:?}"
            ))),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Connected daemon stream.
#[derive(Debug)]
pub enum AttachStream {
    /// TCP connection.
    Tcp(TcpStream),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
}

/// Open a connection to `endpoint`.
pub async fn connect(endpoint: &Endpoint) -> Result<AttachStream> {
    tracing::debug!(%endpoint, "connecting to daemon");
    match endpoint {
        Endpoint::Tcp(addr) => {
            let stream = TcpStream::connect(addr.as_str()).await?;
            stream.set_nodelay(true)?;
            Ok(AttachStream::Tcp(stream))
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            Ok(AttachStream::Unix(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(AttachError::Config(
            "unix sockets are not supported on this platform".to_string(),
        )),
    }
}

impl AsyncRead for AttachStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AttachStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            AttachStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for AttachStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            AttachStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            AttachStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AttachStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            AttachStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    /// Shuts down the write direction only.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            AttachStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            AttachStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
