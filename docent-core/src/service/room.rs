use std::sync::Arc;

use crate::{
    cache::RoomStore,
    models::{EventId, NewRoom, Room, RoomId, RoomMetadata, UserId},
    service::EventDirectory,
    Error, Result,
};

/// Room directory: CRUD over the room store plus membership checks
#[derive(Clone)]
pub struct RoomService {
    store: Arc<dyn RoomStore>,
    events: Arc<dyn EventDirectory>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService").finish()
    }
}

impl RoomService {
    pub fn new(store: Arc<dyn RoomStore>, events: Arc<dyn EventDirectory>) -> Self {
        Self { store, events }
    }

    /// Create a room for an existing event
    pub async fn create_room(&self, new_room: NewRoom) -> Result<Room> {
        if !self.events.event_exists(&new_room.event_id).await? {
            return Err(Error::NotFound(format!(
                "Event {} not found",
                new_room.event_id
            )));
        }

        let room = new_room.into_room();
        self.store.create(&room).await?;

        tracing::info!(room_id = %room.id, event_id = %room.event_id, "Room created");
        Ok(room)
    }

    pub async fn get_room(&self, room_id: &RoomId) -> Result<Room> {
        self.store.get(room_id).await
    }

    pub async fn get_rooms_by_event(&self, event_id: &EventId) -> Result<Vec<Room>> {
        self.store.get_by_event(event_id).await
    }

    /// Replace the whole room document; `room_id` wins over `room.id`
    pub async fn update_room(&self, room_id: &RoomId, mut room: Room) -> Result<Room> {
        room.id = room_id.clone();
        self.store.update(room_id, &room).await?;
        Ok(room)
    }

    /// Replace only the metadata of a room
    pub async fn update_metadata(&self, room_id: &RoomId, metadata: RoomMetadata) -> Result<Room> {
        let room = self.store.get(room_id).await?.with_metadata(metadata);
        self.store.update(room_id, &room).await?;
        Ok(room)
    }

    pub async fn delete_room(&self, room_id: &RoomId) -> Result<()> {
        self.store.delete(room_id).await?;
        tracing::info!(room_id = %room_id, "Room deleted");
        Ok(())
    }

    /// Whether `user_id` may take part in the live session of `room_id`
    ///
    /// A missing room is not an error, the user simply is not a member.
    pub async fn validate_membership(&self, user_id: &UserId, room_id: &RoomId) -> Result<bool> {
        let room = match self.store.get(room_id).await {
            Ok(room) => room,
            Err(Error::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        self.events
            .is_accepted_participant(&room.event_id, user_id)
            .await
    }
}
