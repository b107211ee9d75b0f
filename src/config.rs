//! Attach configuration.
//!
//! Settings can be built in code with the fluent setters or loaded from
//! JSON; any field left out of the JSON keeps its default.
//!
//! # Example
//!
//! ```
//! use docker_attach::config::AttachConfig;
//!
//! let config = AttachConfig::from_json_str(r#"{ "api_version": "v1.41", "logs": true }"#).unwrap();
//! assert_eq!(config.api_version, "v1.41");
//! assert!(config.logs);
//! assert!(config.stream);
//! ```

use serde::Deserialize;

use crate::error::{AttachError, Result};
use crate::protocol::BASE_BUF_SIZE;
use crate::sender::DEFAULT_INPUT_CHUNK_SIZE;
use crate::transport::Endpoint;

/// Default daemon endpoint.
pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";

/// Default API version used as the request path prefix.
pub const DEFAULT_API_VERSION: &str = "v1.3";

/// Default capacity of the buffered read half.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Configuration for attach sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    /// Daemon address, see [`Endpoint::parse`].
    pub endpoint: String,
    /// Path prefix placed before `/containers/`.
    pub api_version: String,
    /// Replay output produced before the attach.
    pub logs: bool,
    /// Stream output produced after the attach.
    pub stream: bool,
    /// Capacity of the buffered read half.
    pub read_buffer_size: usize,
    /// Initial size of the demultiplexer payload buffer.
    pub frame_buffer_size: usize,
    /// Chunk size used when copying a reader to stdin.
    pub input_chunk_size: usize,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            logs: false,
            stream: true,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            frame_buffer_size: BASE_BUF_SIZE,
            input_chunk_size: DEFAULT_INPUT_CHUNK_SIZE,
        }
    }
}

impl AttachConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the daemon endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the API version path prefix.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the `logs` flag.
    pub fn logs(mut self, logs: bool) -> Self {
        self.logs = logs;
        self
    }

    /// Set the `stream` flag.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the buffered read half capacity.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the initial demultiplexer buffer size.
    pub fn frame_buffer_size(mut self, size: usize) -> Self {
        self.frame_buffer_size = size;
        self
    }

    /// Set the stdin copy chunk size.
    pub fn input_chunk_size(mut self, size: usize) -> Self {
        self.input_chunk_size = size;
        self
    }

    /// Parsed endpoint.
    pub fn parsed_endpoint(&self) -> Result<Endpoint> {
        Endpoint::parse(&self.endpoint)
    }

    /// Check sizes and the endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(AttachError::Config(
                "read_buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.frame_buffer_size == 0 {
            return Err(AttachError::Config(
                "frame_buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.input_chunk_size == 0 {
            return Err(AttachError::Config(
                "input_chunk_size must be greater than 0".to_string(),
            ));
        }
        self.parsed_endpoint()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AttachConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(!config.logs);
        assert!(config.stream);
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(config.frame_buffer_size, BASE_BUF_SIZE);
        assert_eq!(config.input_chunk_size, DEFAULT_INPUT_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_setters() {
        let config = AttachConfig::new()
            .endpoint("tcp://127.0.0.1:2375")
            .api_version("v1.24")
            .logs(true)
            .stream(false)
            .read_buffer_size(512)
            .frame_buffer_size(64)
            .input_chunk_size(1024);

        assert_eq!(config.endpoint, "tcp://127.0.0.1:2375");
        assert_eq!(config.api_version, "v1.24");
        assert!(config.logs);
        assert!(!config.stream);
        assert_eq!(config.read_buffer_size, 512);
        assert_eq!(config.frame_buffer_size, 64);
        assert_eq!(config.input_chunk_size, 1024);
    }

    #[test]
    fn test_from_json_partial() {
        let config = AttachConfig::from_json_str(r#"{ "endpoint": "localhost:2375" }"#).unwrap();
        assert_eq!(config.endpoint, "localhost:2375");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_from_json_invalid() {
        let result = AttachConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(AttachError::Json(_))));
    }

    #[test]
    fn test_validate_zero_sizes() {
        let result = AttachConfig::new().read_buffer_size(0).validate();
        assert!(result.unwrap_err().to_string().contains("read_buffer_size"));

        let result = AttachConfig::new().frame_buffer_size(0).validate();
        assert!(result.unwrap_err().to_string().contains("frame_buffer_size"));

        let result = AttachConfig::new().input_chunk_size(0).validate();
        assert!(result.unwrap_err().to_string().contains("input_chunk_size"));
    }

    #[test]
    fn test_validate_bad_endpoint() {
        let result = AttachConfig::from_json_str(r#"{ "endpoint": "ftp://nowhere" }"#);
        assert!(matches!(result, Err(AttachError::Config(_))));
    }
}
