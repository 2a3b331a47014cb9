//! Upstream link configuration

use serde::{Deserialize, Serialize};

/// Where and how a proxy reaches the SFU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfuConfig {
    /// WebSocket endpoint of the SFU (`ws://` or `wss://`)
    pub url: String,
    /// Largest JSON document accepted from the SFU, in bytes
    pub max_message_size: usize,
}

impl Default for SfuConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:7000/ws".to_string(),
            max_message_size: 1024 * 1024,
        }
    }
}

impl SfuConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
