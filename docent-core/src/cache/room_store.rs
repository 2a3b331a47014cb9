//! Ephemeral room registry
//!
//! Rooms live in Redis next to the rest of the platform's short-lived state:
//! - `{prefix}:room:{id}` holds the JSON document
//! - `{prefix}:event:{event_id}:rooms` indexes the rooms of an event
//!
//! The primary record and the index entry are always written in the same
//! MULTI/EXEC transaction.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};

use super::KeyBuilder;
use crate::{
    metrics::rooms::STORE_OPERATIONS,
    models::{EventId, Room, RoomId},
    Error, Result,
};

/// Storage contract for rooms
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Store a room and index it under its event. Last writer wins.
    async fn create(&self, room: &Room) -> Result<()>;

    /// Fetch a room, `NotFound` if absent
    async fn get(&self, room_id: &RoomId) -> Result<Room>;

    /// Fetch every room of an event; index entries without a record are skipped
    async fn get_by_event(&self, event_id: &EventId) -> Result<Vec<Room>>;

    /// Replace the whole document, `NotFound` if the room does not exist
    async fn update(&self, room_id: &RoomId, room: &Room) -> Result<()>;

    /// Remove the record and its index entry, `NotFound` if absent
    async fn delete(&self, room_id: &RoomId) -> Result<()>;
}

pub(crate) fn record<T>(operation: &str, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(Error::NotFound(_)) => "not_found",
        Err(_) => "error",
    };
    STORE_OPERATIONS
        .with_label_values(&[operation, outcome])
        .inc();
}

fn room_not_found(room_id: &RoomId) -> Error {
    Error::NotFound(format!("Room {room_id} not found"))
}

/// Redis-backed room store
#[derive(Clone)]
pub struct RedisRoomStore {
    client: Client,
    keys: KeyBuilder,
}

impl std::fmt::Debug for RedisRoomStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRoomStore")
            .field("keys", &self.keys)
            .finish()
    }
}

impl RedisRoomStore {
    #[must_use]
    pub const fn new(client: Client, keys: KeyBuilder) -> Self {
        Self { client, keys }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Storage(format!("Redis connection failed: {e}")))
    }

    async fn load(&self, conn: &mut MultiplexedConnection, room_id: &RoomId) -> Result<Option<Room>> {
        let json: Option<String> = conn
            .get(self.keys.room(room_id.as_str()))
            .await
            .map_err(|e| Error::Storage(format!("Failed to read room: {e}")))?;

        json.map(|json| serde_json::from_str(&json).map_err(Error::from))
            .transpose()
    }

    async fn create_inner(&self, room: &Room) -> Result<()> {
        let json = serde_json::to_string(room)?;
        let mut conn = self.connection().await?;

        let () = redis::pipe()
            .atomic()
            .set(self.keys.room(room.id.as_str()), json)
            .ignore()
            .sadd(self.keys.event_rooms(room.event_id.as_str()), room.id.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create room: {e}")))?;

        tracing::debug!(room_id = %room.id, event_id = %room.event_id, "Room stored");
        Ok(())
    }

    async fn get_inner(&self, room_id: &RoomId) -> Result<Room> {
        let mut conn = self.connection().await?;
        self.load(&mut conn, room_id)
            .await?
            .ok_or_else(|| room_not_found(room_id))
    }

    async fn get_by_event_inner(&self, event_id: &EventId) -> Result<Vec<Room>> {
        let mut conn = self.connection().await?;

        let mut ids: Vec<String> = conn
            .smembers(self.keys.event_rooms(event_id.as_str()))
            .await
            .map_err(|e| Error::Storage(format!("Failed to read event index: {e}")))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.sort();

        let keys: Vec<String> = ids.iter().map(|id| self.keys.room(id)).collect();
        let documents: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read rooms: {e}")))?;

        let mut rooms = Vec::with_capacity(documents.len());
        for (id, document) in ids.iter().zip(documents) {
            let Some(json) = document else {
                tracing::debug!(room_id = %id, event_id = %event_id, "Skipping dangling index entry");
                continue;
            };
            let room: Room = serde_json::from_str(&json)?;
            // The id may have been re-created under another event
            if room.event_id == *event_id {
                rooms.push(room);
            }
        }
        Ok(rooms)
    }

    async fn update_inner(&self, room_id: &RoomId, room: &Room) -> Result<()> {
        let mut conn = self.connection().await?;
        let existing = self
            .load(&mut conn, room_id)
            .await?
            .ok_or_else(|| room_not_found(room_id))?;

        let mut document = room.clone();
        document.id = room_id.clone();
        let json = serde_json::to_string(&document)?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        // XX: only overwrite an existing key
        pipe.cmd("SET").arg(self.keys.room(room_id.as_str())).arg(json).arg("XX");
        if existing.event_id != document.event_id {
            pipe.srem(self.keys.event_rooms(existing.event_id.as_str()), room_id.as_str())
                .ignore();
            pipe.sadd(self.keys.event_rooms(document.event_id.as_str()), room_id.as_str())
                .ignore();
        }

        let (reply,): (Option<String>,) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Failed to update room: {e}")))?;

        if reply.is_none() {
            // Deleted between the read and the write
            return Err(room_not_found(room_id));
        }
        Ok(())
    }

    async fn delete_inner(&self, room_id: &RoomId) -> Result<()> {
        let mut conn = self.connection().await?;
        let existing = self
            .load(&mut conn, room_id)
            .await?
            .ok_or_else(|| room_not_found(room_id))?;

        let () = redis::pipe()
            .atomic()
            .del(self.keys.room(room_id.as_str()))
            .ignore()
            .srem(self.keys.event_rooms(existing.event_id.as_str()), room_id.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete room: {e}")))?;

        tracing::debug!(room_id = %room_id, event_id = %existing.event_id, "Room deleted");
        Ok(())
    }
}

#[async_trait]
impl RoomStore for RedisRoomStore {
    async fn create(&self, room: &Room) -> Result<()> {
        let result = self.create_inner(room).await;
        record("create", &result);
        result
    }

    async fn get(&self, room_id: &RoomId) -> Result<Room> {
        let result = self.get_inner(room_id).await;
        record("get", &result);
        result
    }

    async fn get_by_event(&self, event_id: &EventId) -> Result<Vec<Room>> {
        let result = self.get_by_event_inner(event_id).await;
        record("get_by_event", &result);
        result
    }

    async fn update(&self, room_id: &RoomId, room: &Room) -> Result<()> {
        let result = self.update_inner(room_id, room).await;
        record("update", &result);
        result
    }

    async fn delete(&self, room_id: &RoomId) -> Result<()> {
        let result = self.delete_inner(room_id).await;
        record("delete", &result);
        result
    }
}
