// Module: http
// WebSocket signaling endpoint plus health and metrics

pub mod error;
pub mod health;
pub mod websocket;

use axum::{routing::get, Router};
use docent_core::service::JwtValidator;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::signaling::SignalingHub;

pub use error::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SignalingHub>,
    pub validator: Arc<JwtValidator>,
    /// Largest client frame accepted on the signaling socket
    pub ws_max_message_size: usize,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/signal", get(websocket::signal_handler))
        .merge(health::create_health_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
