//! Signaling relay hub
//!
//! Owns one upstream proxy per client connection, relays client requests to
//! it and its events back to that client, and announces presence to the
//! other members of the joined room.

use docent_core::{
    metrics::signaling::{ACTIVE_CONNECTIONS, CLIENT_REQUESTS, TEARDOWNS, UPSTREAM_EVENTS},
    models::{RoomId, StreamId, UserId},
    RoomService,
};
use docent_sfu::{RequestId, SfuConfig, SfuConnection, SfuEvent, TrickleTarget};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    bindings::StreamBindings,
    error::{HubError, HubResult},
    groups::{Member, RoomGroups},
    messages::{ClientMessage, ServerMessage},
    registry::{ClientSender, ConnectionEntry, ConnectionId, ConnectionRegistry},
};

/// Candidates from clients always describe their publishing transport
const CLIENT_TRICKLE_TARGET: TrickleTarget = TrickleTarget::Publisher;

/// What triggered a connection teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    ClientClosed,
    TransportError,
    UpstreamLost,
    Shutdown,
}

impl TeardownReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::TransportError => "transport_error",
            Self::UpstreamLost => "upstream_lost",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Handle returned to the transport for a registered connection
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    /// Cancelled once the hub has torn the connection down
    pub closed: CancellationToken,
}

pub struct SignalingHub {
    rooms: Arc<RoomService>,
    sfu: SfuConfig,
    registry: ConnectionRegistry,
    groups: RoomGroups,
    bindings: StreamBindings,
}

impl std::fmt::Debug for SignalingHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingHub")
            .field("sfu_url", &self.sfu.url)
            .field("registry", &self.registry)
            .field("groups", &self.groups)
            .finish()
    }
}

impl SignalingHub {
    #[must_use]
    pub fn new(
        rooms: Arc<RoomService>,
        sfu: SfuConfig,
        registry: ConnectionRegistry,
        groups: RoomGroups,
        bindings: StreamBindings,
    ) -> Self {
        Self {
            rooms,
            sfu,
            registry,
            groups,
            bindings,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn groups(&self) -> &RoomGroups {
        &self.groups
    }

    #[must_use]
    pub const fn bindings(&self) -> &StreamBindings {
        &self.bindings
    }

    fn entry(&self, connection_id: &ConnectionId) -> HubResult<Arc<ConnectionEntry>> {
        self.registry
            .get(connection_id)
            .ok_or_else(|| HubError::UnknownConnection(connection_id.clone()))
    }

    /// Register an authenticated client
    ///
    /// Opens its upstream link first; if that fails nothing is registered.
    pub async fn connect(self: &Arc<Self>, user_id: UserId, outbound: ClientSender) -> HubResult<Session> {
        let connection_id = ConnectionId::new();
        let (proxy, events) = SfuConnection::new(connection_id.as_str(), self.sfu.clone());
        proxy.connect().await?;

        let closed = CancellationToken::new();
        let entry = Arc::new(ConnectionEntry::new(
            connection_id.clone(),
            user_id,
            Arc::new(proxy),
            outbound,
            closed.clone(),
        ));
        self.registry.insert(Arc::clone(&entry));
        ACTIVE_CONNECTIONS.inc();

        let relay = tokio::spawn(relay_upstream(Arc::clone(self), Arc::clone(&entry), events));
        entry.set_relay(relay);

        entry.send(ServerMessage::ConnectionAssigned {
            connection_id: connection_id.clone(),
        });
        info!(connection_id = %connection_id, user_id = %entry.user_id, "Signaling connection registered");

        Ok(Session {
            connection_id,
            closed,
        })
    }

    /// Dispatch one parsed client message
    pub async fn handle_message(&self, connection_id: &ConnectionId, message: ClientMessage) -> HubResult<()> {
        let method = message.method();
        let result = match message {
            ClientMessage::Join { room_id, offer } => {
                self.join(connection_id, room_id, offer.as_str()).await.map(drop)
            }
            ClientMessage::Offer { desc } => self.offer(connection_id, desc.as_str()).await.map(drop),
            ClientMessage::Answer { desc } => self.answer(connection_id, desc.as_str()).await.map(drop),
            ClientMessage::Trickle { candidate } => {
                self.trickle(connection_id, candidate.as_str()).await.map(drop)
            }
            ClientMessage::SetStreamBinding { stream_id } => {
                self.set_stream_binding(connection_id, stream_id)
            }
            ClientMessage::ResolveStream { stream_id } => self.resolve_stream(connection_id, &stream_id),
        };

        let outcome = if result.is_ok() { "ok" } else { "error" };
        CLIENT_REQUESTS.with_label_values(&[method, outcome]).inc();
        result
    }

    /// Join the live session of a room
    pub async fn join(&self, connection_id: &ConnectionId, room_id: RoomId, offer: &str) -> HubResult<RequestId> {
        let entry = self.entry(connection_id)?;
        if let Some(current) = entry.room() {
            return Err(HubError::AlreadyJoined(current));
        }
        if !self.rooms.validate_membership(&entry.user_id, &room_id).await? {
            return Err(HubError::Forbidden(room_id));
        }

        let request_id = entry
            .proxy
            .join(room_id.as_str(), entry.user_id.as_str(), offer)
            .await?;

        if !entry.set_room(room_id.clone()) {
            return Err(HubError::AlreadyJoined(room_id));
        }
        self.groups.join(
            room_id.clone(),
            Member {
                connection_id: connection_id.clone(),
                user_id: entry.user_id.clone(),
                sender: entry.outbound(),
            },
        );

        // Torn down while the join was in flight
        if !self.registry.contains(connection_id) {
            self.groups.leave(connection_id);
            return Err(HubError::UnknownConnection(connection_id.clone()));
        }

        self.groups.broadcast(
            &room_id,
            &ServerMessage::PeerJoined {
                connection_id: connection_id.clone(),
                user_id: entry.user_id.clone(),
            },
            Some(connection_id),
        );
        Ok(request_id)
    }

    pub async fn offer(&self, connection_id: &ConnectionId, desc: &str) -> HubResult<RequestId> {
        let entry = self.entry(connection_id)?;
        Ok(entry.proxy.offer(desc).await?)
    }

    pub async fn answer(&self, connection_id: &ConnectionId, desc: &str) -> HubResult<RequestId> {
        let entry = self.entry(connection_id)?;
        Ok(entry.proxy.answer(desc).await?)
    }

    /// Forward a client ICE candidate; a malformed one is skipped
    pub async fn trickle(&self, connection_id: &ConnectionId, candidate: &str) -> HubResult<Option<RequestId>> {
        let entry = self.entry(connection_id)?;
        Ok(entry.proxy.trickle(candidate, CLIENT_TRICKLE_TARGET).await?)
    }

    pub fn set_stream_binding(&self, connection_id: &ConnectionId, stream_id: StreamId) -> HubResult<()> {
        self.entry(connection_id)?;
        self.bindings.bind(connection_id, stream_id);
        Ok(())
    }

    /// Tell the caller which participant publishes `stream_id`
    pub fn resolve_stream(&self, connection_id: &ConnectionId, stream_id: &StreamId) -> HubResult<()> {
        let entry = self.entry(connection_id)?;
        let owner = self
            .bindings
            .owner_of(stream_id)
            .and_then(|owner| self.registry.get(&owner));

        entry.send(ServerMessage::StreamOwner {
            stream_id: stream_id.clone(),
            connection_id: owner.as_ref().map(|o| o.connection_id.clone()),
            user_id: owner.map(|o| o.user_id.clone()),
        });
        Ok(())
    }

    /// Release everything a connection owns; no-op for unknown ids
    pub async fn disconnect(&self, connection_id: &ConnectionId, reason: TeardownReason) {
        let Some(entry) = self.registry.remove(connection_id) else {
            debug!(connection_id = %connection_id, "Connection already torn down");
            return;
        };
        ACTIVE_CONNECTIONS.dec();

        // Only announce a departure whose arrival was announced
        if let Some(room_id) = self.groups.leave(connection_id) {
            let notified = self.groups.broadcast(
                &room_id,
                &ServerMessage::PeerDisconnected {
                    connection_id: connection_id.clone(),
                    user_id: entry.user_id.clone(),
                },
                None,
            );
            debug!(connection_id = %connection_id, room_id = %room_id, notified, "Departure announced");
        }

        self.bindings.unbind(connection_id);
        entry.proxy.close().await;
        entry.stop_relay();
        entry.shutdown();

        TEARDOWNS.with_label_values(&[reason.as_str()]).inc();
        info!(
            connection_id = %connection_id,
            user_id = %entry.user_id,
            reason = reason.as_str(),
            duration_secs = entry.connected_at.elapsed().as_secs(),
            "Signaling connection torn down"
        );
    }

    /// Tear down every connection, used on server shutdown
    pub async fn disconnect_all(&self) {
        let ids = self.registry.connection_ids();
        if !ids.is_empty() {
            info!(connections = ids.len(), "Closing signaling connections");
        }
        for connection_id in ids {
            self.disconnect(&connection_id, TeardownReason::Shutdown).await;
        }
    }
}

/// Pump proxy events to the owning client until the link goes away
async fn relay_upstream(
    hub: Arc<SignalingHub>,
    entry: Arc<ConnectionEntry>,
    mut events: mpsc::UnboundedReceiver<SfuEvent>,
) {
    while let Some(event) = events.recv().await {
        UPSTREAM_EVENTS.with_label_values(&[event.kind()]).inc();

        let message = match event {
            SfuEvent::Candidate { candidate, fresh } => ServerMessage::IncomingCandidate { candidate, fresh },
            SfuEvent::Offer(desc) => ServerMessage::IncomingOffer { desc },
            SfuEvent::Answer(desc) => ServerMessage::IncomingAnswer { desc },
            SfuEvent::RequestFailed { id, code, message } => {
                let request = id.map_or_else(|| "unknown".to_string(), |id| id.to_string());
                ServerMessage::error(
                    "upstream_rejected",
                    format!("request {request} failed ({code}): {message}"),
                )
            }
            SfuEvent::Closed { reason } => {
                warn!(connection_id = %entry.connection_id, reason = %reason, "Upstream link lost");
                entry.send(ServerMessage::error("upstream_unavailable", reason));
                hub.disconnect(&entry.connection_id, TeardownReason::UpstreamLost)
                    .await;
                return;
            }
        };
        entry.send(message);
    }
}
