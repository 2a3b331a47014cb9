//! Common types used throughout the proxy

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Correlation id of one outbound JSON-RPC request
///
/// Allocated per proxy starting at 1, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the upstream link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    /// Terminal
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the proxy stands in SDP negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    /// No upstream offer seen yet; candidates belong to the initial publish
    AwaitingFirstOffer,
    /// At least one upstream offer was relayed
    Active,
}

/// Transport a trickled candidate is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrickleTarget {
    Publisher,
    Subscriber,
}

impl TrickleTarget {
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Publisher => 0,
            Self::Subscriber => 1,
        }
    }
}

impl Serialize for TrickleTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trickle_target_wire_value() {
        assert_eq!(serde_json::to_string(&TrickleTarget::Publisher).unwrap(), "0");
        assert_eq!(serde_json::to_string(&TrickleTarget::Subscriber).unwrap(), "1");
    }

    #[test]
    fn test_request_id_is_bare_integer() {
        assert_eq!(serde_json::to_string(&RequestId::new(7)).unwrap(), "7");
        assert!(RequestId::new(1) < RequestId::new(2));
    }
}
