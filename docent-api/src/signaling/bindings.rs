//! Process-wide peer ↔ media stream bindings
//!
//! Clients announce the id of the stream they publish so others can map a
//! remote track back to a participant.

use dashmap::DashMap;
use docent_core::models::StreamId;
use std::sync::Arc;
use tracing::debug;

use super::registry::ConnectionId;

#[derive(Debug, Clone, Default)]
pub struct StreamBindings {
    by_peer: Arc<DashMap<ConnectionId, StreamId>>,
    by_stream: Arc<DashMap<StreamId, ConnectionId>>,
}

impl StreamBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `peer` to `stream`, replacing either side's previous binding
    pub fn bind(&self, peer: &ConnectionId, stream: StreamId) {
        if let Some(previous) = self.by_peer.insert(peer.clone(), stream.clone()) {
            if previous != stream {
                self.by_stream.remove_if(&previous, |_, owner| owner == peer);
            }
        }
        if let Some(previous_owner) = self.by_stream.insert(stream.clone(), peer.clone()) {
            if previous_owner != *peer {
                self.by_peer.remove_if(&previous_owner, |_, bound| *bound == stream);
            }
        }
        debug!(connection_id = %peer, stream_id = %stream, "Stream bound");
    }

    /// Drop both directions of `peer`'s binding
    pub fn unbind(&self, peer: &ConnectionId) -> Option<StreamId> {
        let (_, stream) = self.by_peer.remove(peer)?;
        self.by_stream.remove_if(&stream, |_, owner| owner == peer);
        Some(stream)
    }

    #[must_use]
    pub fn stream_of(&self, peer: &ConnectionId) -> Option<StreamId> {
        self.by_peer.get(peer).map(|stream| stream.clone())
    }

    #[must_use]
    pub fn owner_of(&self, stream: &StreamId) -> Option<ConnectionId> {
        self.by_stream.get(stream).map(|owner| owner.clone())
    }

    /// Number of bound peers
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_peer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_peer.is_empty() && self.by_stream.is_empty()
    }
}
