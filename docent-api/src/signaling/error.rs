//! Error types for the signaling hub

use docent_core::models::RoomId;
use thiserror::Error;

use super::registry::ConnectionId;

#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Core(#[from] docent_core::Error),

    #[error(transparent)]
    Sfu(#[from] docent_sfu::Error),

    #[error("Connection already joined room {0}")]
    AlreadyJoined(RoomId),

    #[error("Not a participant of room {0}")]
    Forbidden(RoomId),

    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

impl HubError {
    /// Stable identifier sent in the client `error` event
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Core(e) => match e {
                docent_core::Error::NotFound(_) => "not_found",
                docent_core::Error::Authentication(_) => "unauthenticated",
                docent_core::Error::Authorization(_) => "forbidden",
                docent_core::Error::InvalidInput(_) => "invalid_argument",
                docent_core::Error::Storage(_) | docent_core::Error::Redis(_) => "storage_unavailable",
                docent_core::Error::Serialization(_) | docent_core::Error::Internal(_) => "internal",
            },
            Self::Sfu(e) => e.code(),
            Self::AlreadyJoined(_) => "already_joined",
            Self::Forbidden(_) => "forbidden",
            Self::UnknownConnection(_) => "unknown_connection",
            Self::InvalidMessage(_) => "invalid_message",
        }
    }
}

pub type HubResult<T> = std::result::Result<T, HubError>;
