use dashmap::DashMap;
use docent_core::models::{RoomId, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    messages::ServerMessage,
    registry::{ClientSender, ConnectionId},
};

/// A connection subscribed to a room's presence events
#[derive(Debug, Clone)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub sender: ClientSender,
}

/// Room broadcast groups for presence notifications
/// Raw SDP/ICE never goes through here, only join/leave announcements
#[derive(Clone, Default)]
pub struct RoomGroups {
    /// Map of room_id -> members
    rooms: Arc<DashMap<RoomId, Vec<Member>>>,

    /// Map of connection_id -> room_id for cleanup
    connections: Arc<DashMap<ConnectionId, RoomId>>,
}

impl std::fmt::Debug for RoomGroups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomGroups")
            .field("rooms", &self.rooms.len())
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl RoomGroups {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room's group
    pub fn join(&self, room_id: RoomId, member: Member) {
        let connection_id = member.connection_id.clone();
        let user_id = member.user_id.clone();

        self.rooms.entry(room_id.clone()).or_default().push(member);
        self.connections.insert(connection_id.clone(), room_id.clone());

        info!(
            room_id = %room_id,
            user_id = %user_id,
            connection_id = %connection_id,
            "Connection joined room group"
        );
    }

    /// Remove a connection from whatever group it is in
    pub fn leave(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        let (_, room_id) = self.connections.remove(connection_id)?;

        if let Some(mut members) = self.rooms.get_mut(&room_id) {
            members.retain(|member| member.connection_id != *connection_id);

            if members.is_empty() {
                drop(members); // Drop the RefMut before removing
                self.rooms.remove_if(&room_id, |_, members| members.is_empty());
                debug!(room_id = %room_id, "Room group empty, removed");
            }
        }

        info!(room_id = %room_id, connection_id = %connection_id, "Connection left room group");
        Some(room_id)
    }

    /// Send a message to every member of a room except `except`
    ///
    /// Returns how many members it was queued for. A member whose writer is
    /// gone is skipped; its own teardown removes it.
    pub fn broadcast(
        &self,
        room_id: &RoomId,
        message: &ServerMessage,
        except: Option<&ConnectionId>,
    ) -> usize {
        // Snapshot so no map guard is held while sending
        let recipients: Vec<Member> = match self.rooms.get(room_id) {
            Some(members) => members
                .iter()
                .filter(|member| Some(&member.connection_id) != except)
                .cloned()
                .collect(),
            None => return 0,
        };

        let mut sent_count = 0;
        for member in recipients {
            match member.sender.send(message.clone()) {
                Ok(()) => sent_count += 1,
                Err(_) => warn!(
                    room_id = %room_id,
                    connection_id = %member.connection_id,
                    event_type = message.event_type(),
                    "Failed to queue event for member"
                ),
            }
        }

        debug!(
            room_id = %room_id,
            sent_count,
            event_type = message.event_type(),
            "Broadcast complete"
        );
        sent_count
    }

    /// Connection ids currently in a room's group
    #[must_use]
    pub fn members(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().map(|m| m.connection_id.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.connections.get(connection_id).map(|room| room.clone())
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
