//! Unified Redis key builder
//!
//! All keys use a configurable prefix so several environments can share one
//! Redis instance. The CRUD platform writes the event keys; the relay only
//! reads them.

use crate::Config;

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Create a new `KeyBuilder` with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Create `KeyBuilder` from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.redis.key_prefix.clone())
    }

    // ==================== Rooms ====================

    /// Room record
    ///
    /// Type: String
    /// Value: JSON { id, `event_id`, metadata }
    #[must_use]
    pub fn room(&self, room_id: &str) -> String {
        format!("{}:room:{}", self.prefix, room_id)
    }

    /// Rooms owned by an event
    ///
    /// Type: Set
    /// Members: `room_id`
    #[must_use]
    pub fn event_rooms(&self, event_id: &str) -> String {
        format!("{}:event:{}:rooms", self.prefix, event_id)
    }

    // ==================== Events (written by the CRUD platform) ====================

    /// Event marker; existence means the event exists
    ///
    /// Type: String or Hash
    #[must_use]
    pub fn event(&self, event_id: &str) -> String {
        format!("{}:event:{}", self.prefix, event_id)
    }

    /// Users with an accepted participation record
    ///
    /// Type: Set
    /// Members: `user_id`
    #[must_use]
    pub fn event_participants(&self, event_id: &str) -> String {
        format!("{}:event:{}:participants", self.prefix, event_id)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("docent")
    }
}
