//! WebSocket signaling endpoint
//!
//! Clients authenticate during the handshake with a bearer token, either in
//! the `Authorization` header or as `?token=` since browsers cannot set
//! headers on a WebSocket upgrade. Frames are JSON text; see
//! [`ClientMessage`] and [`ServerMessage`].

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::http::{AppError, AppState};
use crate::signaling::{ClientMessage, HubError, ServerMessage, TeardownReason};
use docent_core::models::UserId;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    /// JWT token for authentication
    pub token: Option<String>,
}

/// Signaling WebSocket handler
///
/// <ws://host/ws/signal?token={jwt_token}>
pub async fn signal_handler(
    State(state): State<AppState>,
    Query(query): Query<SignalQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth_header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let user_id = state
        .validator
        .authenticate(auth_header, query.token.as_deref())
        .map_err(|e| AppError::unauthorized(format!("Invalid token: {e}")))?;

    let ws = ws.map_err(|rejection| AppError::new(rejection.status(), rejection.body_text()))?;

    // Signaling frames are small; cap well below the 64MB default
    Ok(ws
        .max_message_size(state.ws_max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn send_json(sink: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Failed to encode signaling message");
            return true;
        }
    };
    sink.send(Message::Text(text.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: UserId) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let session = match state.hub.connect(user_id.clone(), tx.clone()).await {
        Ok(session) => session,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Rejecting signaling connection");
            send_json(&mut ws_sink, &ServerMessage::error(e.code(), e.to_string())).await;
            let _ = ws_sink.send(Message::Close(None)).await;
            return;
        }
    };
    let connection_id = session.connection_id.clone();

    // Spawn task to handle server messages -> WebSocket
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if !send_json(&mut ws_sink, &message).await {
                debug!("Client socket closed while sending");
                return;
            }
        }
        let _ = ws_sink.send(Message::Close(None)).await;
    });

    let reason = loop {
        tokio::select! {
            () = session.closed.cancelled() => break TeardownReason::UpstreamLost,
            frame = ws_stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let failure = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(message) => state.hub.handle_message(&connection_id, message).await.err(),
                        Err(e) => Some(HubError::InvalidMessage(e.to_string())),
                    };
                    if let Some(e) = failure {
                        debug!(connection_id = %connection_id, error = %e, "Signaling request failed");
                        let _ = tx.send(ServerMessage::error(e.code(), e.to_string()));
                    }
                }
                Some(Ok(Message::Close(_))) | None => break TeardownReason::ClientClosed,
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "Client socket error");
                    break TeardownReason::TransportError;
                }
                // Binary frames carry nothing; ping/pong is answered by axum
                Some(Ok(_)) => {}
            },
        }
    };

    state.hub.disconnect(&connection_id, reason).await;
    drop(tx);
    if let Err(e) = writer.await {
        debug!(connection_id = %connection_id, error = %e, "Writer task ended abnormally");
    }

    info!(connection_id = %connection_id, user_id = %user_id, "WebSocket connection closed");
}
