//! Transport module - daemon connection factory.
//!
//! Provides abstraction over:
//! - TCP sockets
//! - Unix Domain Sockets (Linux/macOS)

mod stream;

pub use stream::{connect, AttachStream, Endpoint};
