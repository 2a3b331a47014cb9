//! Event participation lookups
//!
//! Events and their participant lists belong to the CRUD platform. The relay
//! only asks two questions of it, answered from keys the platform maintains
//! in the shared Redis instance.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::{AsyncCommands, Client};
use std::collections::HashSet;

use crate::{
    cache::KeyBuilder,
    models::{EventId, UserId},
    Error, Result,
};

/// Read-only view of the platform's events
#[async_trait]
pub trait EventDirectory: Send + Sync {
    /// Whether the event exists
    async fn event_exists(&self, event_id: &EventId) -> Result<bool>;

    /// Whether the user holds an accepted participation record for the event
    async fn is_accepted_participant(&self, event_id: &EventId, user_id: &UserId) -> Result<bool>;
}

/// Event directory backed by keys the platform writes to Redis
#[derive(Clone)]
pub struct RedisEventDirectory {
    client: Client,
    keys: KeyBuilder,
}

impl RedisEventDirectory {
    #[must_use]
    pub const fn new(client: Client, keys: KeyBuilder) -> Self {
        Self { client, keys }
    }
}

impl std::fmt::Debug for RedisEventDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventDirectory").finish()
    }
}

#[async_trait]
impl EventDirectory for RedisEventDirectory {
    async fn event_exists(&self, event_id: &EventId) -> Result<bool> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Storage(format!("Redis connection failed: {e}")))?;

        conn.exists(self.keys.event(event_id.as_str()))
            .await
            .map_err(|e| Error::Storage(format!("Failed to look up event: {e}")))
    }

    async fn is_accepted_participant(&self, event_id: &EventId, user_id: &UserId) -> Result<bool> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Storage(format!("Redis connection failed: {e}")))?;

        conn.sismember(self.keys.event_participants(event_id.as_str()), user_id.as_str())
            .await
            .map_err(|e| Error::Storage(format!("Failed to look up participant: {e}")))
    }
}

/// In-memory event directory for tests and local development
#[derive(Debug, Default)]
pub struct MemoryEventDirectory {
    participants: DashMap<EventId, HashSet<UserId>>,
}

impl MemoryEventDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event with no participants yet
    pub fn add_event(&self, event_id: EventId) {
        self.participants.entry(event_id).or_default();
    }

    /// Record an accepted participation, creating the event if needed
    pub fn accept_participant(&self, event_id: EventId, user_id: UserId) {
        self.participants.entry(event_id).or_default().insert(user_id);
    }
}

#[async_trait]
impl EventDirectory for MemoryEventDirectory {
    async fn event_exists(&self, event_id: &EventId) -> Result<bool> {
        Ok(self.participants.contains_key(event_id))
    }

    async fn is_accepted_participant(&self, event_id: &EventId, user_id: &UserId) -> Result<bool> {
        Ok(self
            .participants
            .get(event_id)
            .is_some_and(|users| users.contains(user_id)))
    }
}
