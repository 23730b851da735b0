//! Common error types for WXR.

use thiserror::Error;

/// Result type alias using WXR's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for configuration and tracking records, shared by all crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed tracking record
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Create a config error from any displayable type.
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create a protocol error from any displayable type.
    pub fn protocol(msg: impl std::fmt::Display) -> Self {
        Self::Protocol(msg.to_string())
    }
}
