//! Health and metrics endpoints
//!
//! Plain liveness for probes plus the Prometheus scrape target.

use axum::{
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::http::AppState;

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        docent_core::metrics::gather(),
    )
}
