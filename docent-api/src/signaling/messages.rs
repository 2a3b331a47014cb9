//! Client-facing signaling messages
//!
//! JSON text frames tagged by `type`. SDP and ICE payloads are accepted either
//! as the JSON string a browser produces with `JSON.stringify(desc)` or as the
//! object itself.

use docent_core::models::{RoomId, StreamId, UserId};
use docent_sfu::SessionDescription;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::registry::ConnectionId;

/// A JSON document carried as text, whichever way the client encoded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonText(String);

impl JsonText {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JsonText {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for JsonText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Self(text),
            other => Self(other.to_string()),
        })
    }
}

/// Client → server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { room_id: RoomId, offer: JsonText },
    Offer { desc: JsonText },
    Answer { desc: JsonText },
    Trickle { candidate: JsonText },
    SetStreamBinding { stream_id: StreamId },
    ResolveStream { stream_id: StreamId },
}

impl ClientMessage {
    /// Label used for logs and metrics
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Trickle { .. } => "trickle",
            Self::SetStreamBinding { .. } => "set_stream_binding",
            Self::ResolveStream { .. } => "resolve_stream",
        }
    }
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAssigned {
        connection_id: ConnectionId,
    },
    PeerJoined {
        connection_id: ConnectionId,
        user_id: UserId,
    },
    PeerDisconnected {
        connection_id: ConnectionId,
        user_id: UserId,
    },
    IncomingCandidate {
        candidate: Value,
        fresh: bool,
    },
    IncomingOffer {
        desc: Value,
    },
    IncomingAnswer {
        desc: SessionDescription,
    },
    StreamOwner {
        stream_id: StreamId,
        #[serde(skip_serializing_if = "Option::is_none")]
        connection_id: Option<ConnectionId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionAssigned { .. } => "connection_assigned",
            Self::PeerJoined { .. } => "peer_joined",
            Self::PeerDisconnected { .. } => "peer_disconnected",
            Self::IncomingCandidate { .. } => "incoming_candidate",
            Self::IncomingOffer { .. } => "incoming_offer",
            Self::IncomingAnswer { .. } => "incoming_answer",
            Self::StreamOwner { .. } => "stream_owner",
            Self::Error { .. } => "error",
        }
    }
}
