//! Registry of live signaling connections

use dashmap::DashMap;
use docent_core::models::{RoomId, UserId};
use docent_sfu::SfuConnection;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Instant};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::messages::ServerMessage;

/// Channel feeding one client's socket writer
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Identifier of one client connection, assigned on connect
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Everything the hub owns for one client connection
pub struct ConnectionEntry {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub proxy: Arc<SfuConnection>,
    pub connected_at: Instant,
    outbound: ClientSender,
    room: Mutex<Option<RoomId>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("connection_id", &self.connection_id)
            .field("user_id", &self.user_id)
            .field("room", &self.room())
            .finish()
    }
}

impl ConnectionEntry {
    #[must_use]
    pub fn new(
        connection_id: ConnectionId,
        user_id: UserId,
        proxy: Arc<SfuConnection>,
        outbound: ClientSender,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            proxy,
            connected_at: Instant::now(),
            outbound,
            room: Mutex::new(None),
            relay: Mutex::new(None),
            shutdown,
        }
    }

    #[must_use]
    pub fn room(&self) -> Option<RoomId> {
        self.room.lock().clone()
    }

    /// Record the joined room; false if one was already recorded
    pub(crate) fn set_room(&self, room_id: RoomId) -> bool {
        let mut room = self.room.lock();
        if room.is_some() {
            return false;
        }
        *room = Some(room_id);
        true
    }

    pub(crate) fn set_relay(&self, handle: JoinHandle<()>) {
        *self.relay.lock() = Some(handle);
    }

    pub(crate) fn stop_relay(&self) {
        if let Some(handle) = self.relay.lock().take() {
            handle.abort();
        }
    }

    /// Queue a message for this client; false once the socket writer is gone
    pub fn send(&self, message: ServerMessage) -> bool {
        if self.outbound.send(message).is_err() {
            debug!(connection_id = %self.connection_id, "Client writer gone, message dropped");
            return false;
        }
        true
    }

    #[must_use]
    pub(crate) fn outbound(&self) -> ClientSender {
        self.outbound.clone()
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Concurrent map of live connections
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, Arc<ConnectionEntry>>>,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Arc<ConnectionEntry>) {
        self.connections.insert(entry.connection_id.clone(), entry);
    }

    #[must_use]
    pub fn get(&self, connection_id: &ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.get(connection_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.remove(connection_id).map(|(_, entry)| entry)
    }

    #[must_use]
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every registered connection id
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }
}
