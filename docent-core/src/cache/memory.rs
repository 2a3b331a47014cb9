//! In-process room store for single-node development and tests

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

use super::room_store::{record, RoomStore};
use crate::{
    models::{EventId, Room, RoomId},
    Error, Result,
};

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomId, Room>,
    by_event: HashMap<EventId, BTreeSet<RoomId>>,
}

impl Inner {
    fn unindex(&mut self, event_id: &EventId, room_id: &RoomId) {
        if let Some(ids) = self.by_event.get_mut(event_id) {
            ids.remove(room_id);
            if ids.is_empty() {
                self.by_event.remove(event_id);
            }
        }
    }
}

/// Room store kept in memory; one lock covers record and index so both
/// change together
#[derive(Default)]
pub struct MemoryRoomStore {
    inner: RwLock<Inner>,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of index entries for an event, including dangling ones
    #[must_use]
    pub fn indexed_count(&self, event_id: &EventId) -> usize {
        self.inner
            .read()
            .by_event
            .get(event_id)
            .map_or(0, BTreeSet::len)
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create(&self, room: &Room) -> Result<()> {
        let mut inner = self.inner.write();
        if let Some(previous) = inner.rooms.insert(room.id.clone(), room.clone()) {
            if previous.event_id != room.event_id {
                inner.unindex(&previous.event_id, &room.id);
            }
        }
        inner
            .by_event
            .entry(room.event_id.clone())
            .or_default()
            .insert(room.id.clone());
        drop(inner);

        record("create", &Ok(()));
        Ok(())
    }

    async fn get(&self, room_id: &RoomId) -> Result<Room> {
        let result = self
            .inner
            .read()
            .rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Room {room_id} not found")));
        record("get", &result);
        result
    }

    async fn get_by_event(&self, event_id: &EventId) -> Result<Vec<Room>> {
        let inner = self.inner.read();
        let rooms = inner
            .by_event
            .get(event_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.rooms.get(id))
                    .filter(|room| room.event_id == *event_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(inner);

        let result = Ok(rooms);
        record("get_by_event", &result);
        result
    }

    async fn update(&self, room_id: &RoomId, room: &Room) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(previous_event) = inner.rooms.get(room_id).map(|r| r.event_id.clone()) else {
            drop(inner);
            let result = Err(Error::NotFound(format!("Room {room_id} not found")));
            record("update", &result);
            return result;
        };

        let mut document = room.clone();
        document.id = room_id.clone();
        if previous_event != document.event_id {
            inner.unindex(&previous_event, room_id);
            inner
                .by_event
                .entry(document.event_id.clone())
                .or_default()
                .insert(room_id.clone());
        }
        inner.rooms.insert(room_id.clone(), document);
        drop(inner);

        record("update", &Ok(()));
        Ok(())
    }

    async fn delete(&self, room_id: &RoomId) -> Result<()> {
        let mut inner = self.inner.write();
        let result = match inner.rooms.remove(room_id) {
            Some(room) => {
                inner.unindex(&room.event_id, room_id);
                Ok(())
            }
            None => Err(Error::NotFound(format!("Room {room_id} not found"))),
        };
        drop(inner);

        record("delete", &result);
        result
    }
}
