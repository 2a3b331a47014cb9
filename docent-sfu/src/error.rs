//! Error types for the upstream session proxy

use thiserror::Error;

/// SFU proxy error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not connected to the SFU")]
    NotConnected,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable identifier reported to signaling clients
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::InvalidState(_) => "invalid_state",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Protocol(_) => "protocol_error",
            Self::UpstreamTransport(_) => "upstream_unavailable",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

/// Result type for SFU proxy operations
pub type Result<T> = std::result::Result<T, Error>;
