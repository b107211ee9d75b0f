//! # docker-attach
//!
//! Async client for attaching to a running container's standard streams
//! through the container daemon's `attach` endpoint.
//!
//! ## Architecture
//!
//! - **Request** (write half): hand-built `POST .../attach` line, then stdin
//!   followed by a write-side half-close
//! - **Response** (read half): HTTP header up to `\r\n\r\n`, then a stream of
//!   tagged frames demultiplexed to stdout and stderr sinks on a reader task
//!
//! ## Example
//!
//! ```ignore
//! use docker_attach::{AttachBuilder, AttachConfig, BytesSender};
//!
//! #[tokio::main]
//! async fn main() -> docker_attach::Result<()> {
//!     let config = AttachConfig::new().logs(true);
//!     let output = AttachBuilder::new("abc123")
//!         .config(&config)
//!         .stdin(BytesSender::new("hello"))
//!         .stdout(tokio::io::stdout())
//!         .stderr(tokio::io::stderr())
//!         .connect(&config.parsed_endpoint()?)
//!         .await?
//!         .wait_for()
//!         .await?;
//!
//!     println!("{} frames", output.stats.frames);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demux;
pub mod error;
pub mod protocol;
pub mod sender;
pub mod transport;

mod session;

pub use config::AttachConfig;
pub use demux::{AttachOutput, DemuxStats, StreamDemuxer};
pub use error::{AttachError, Result};
pub use sender::{BytesSender, InputSender, NullSender, ReaderSender};
pub use session::{AttachBuilder, AttachRequest, AttachSession, SessionState};
pub use transport::{AttachStream, Endpoint};
