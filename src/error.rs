//! Error types for docker-attach.

use thiserror::Error;

/// Main error type for all attach operations.
#[derive(Debug, Error)]
pub enum AttachError {
    /// I/O error during connect, read, or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation in the multiplexed stream (unknown stream type).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// End of input reached before the response header terminator.
    #[error("reached unexpected end of input in header after {received} bytes")]
    IncompleteHeader {
        /// Number of header bytes consumed before EOF.
        received: usize,
    },

    /// The stream reader task was cancelled or panicked before finishing.
    #[error("container output reader interrupted: {0}")]
    Interrupted(String),

    /// Releasing the connection failed and no earlier failure was recorded.
    #[error("unable to close container attach connection: {0}")]
    Close(#[source] std::io::Error),

    /// Invalid configuration or request parameters.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AttachError {
    /// True when the error came from the transport rather than the protocol.
    pub fn is_io(&self) -> bool {
        matches!(self, AttachError::Io(_) | AttachError::Close(_))
    }
}

impl From<tokio::task::JoinError> for AttachError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            AttachError::Interrupted("reader task was cancelled".to_string())
        } else {
            AttachError::Interrupted("reader task panicked".to_string())
        }
    }
}

/// Result type alias using AttachError.
pub type Result<T> = std::result::Result<T, AttachError>;
