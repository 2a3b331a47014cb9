use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::id::{EventId, RoomId};

/// Free-form session state attached to a room ("current slide", "active speaker", ...)
pub type RoomMetadata = Map<String, JsonValue>;

/// A live-session room owned by one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub event_id: EventId,
    #[serde(default)]
    pub metadata: RoomMetadata,
}

impl Room {
    #[must_use]
    pub fn new(id: RoomId, event_id: EventId) -> Self {
        Self {
            id,
            event_id,
            metadata: RoomMetadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: RoomMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Request to create a room
///
/// `id` may be assigned by the caller; a fresh nanoid is used otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    #[serde(default)]
    pub id: Option<RoomId>,
    pub event_id: EventId,
    #[serde(default)]
    pub metadata: RoomMetadata,
}

impl NewRoom {
    #[must_use]
    pub fn for_event(event_id: EventId) -> Self {
        Self {
            id: None,
            event_id,
            metadata: RoomMetadata::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: RoomId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn into_room(self) -> Room {
        Room {
            id: self.id.unwrap_or_default(),
            event_id: self.event_id,
            metadata: self.metadata,
        }
    }
}
