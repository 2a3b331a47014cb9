//! Prometheus metrics for the signaling relay
//!
//! All metrics live in one registry exposed via the `/metrics` endpoint.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, Encoder,
    IntCounterVec, IntGauge, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

/// Render every registered metric in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Signaling hub metrics
pub mod signaling {
    use super::{
        register_int_counter_vec_with_registry, register_int_gauge_with_registry, IntCounterVec,
        IntGauge, REGISTRY,
    };

    /// Client connections currently registered with the hub
    pub static ACTIVE_CONNECTIONS: std::sync::LazyLock<IntGauge> = std::sync::LazyLock::new(|| {
        register_int_gauge_with_registry!(
            "signaling_active_connections",
            "Current number of registered signaling connections",
            REGISTRY.clone()
        )
        .expect("Failed to register ACTIVE_CONNECTIONS")
    });

    /// Inbound upstream events relayed to clients, by kind
    pub static UPSTREAM_EVENTS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
        register_int_counter_vec_with_registry!(
            "signaling_upstream_events_total",
            "Upstream SFU events relayed to clients",
            &["kind"],
            REGISTRY.clone()
        )
        .expect("Failed to register UPSTREAM_EVENTS")
    });

    /// Client requests handled, by method and outcome
    pub static CLIENT_REQUESTS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
        register_int_counter_vec_with_registry!(
            "signaling_client_requests_total",
            "Client signaling requests handled",
            &["method", "outcome"],
            REGISTRY.clone()
        )
        .expect("Failed to register CLIENT_REQUESTS")
    });

    /// Completed connection teardowns, by trigger
    pub static TEARDOWNS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
        register_int_counter_vec_with_registry!(
            "signaling_teardowns_total",
            "Signaling connection teardowns",
            &["reason"],
            REGISTRY.clone()
        )
        .expect("Failed to register TEARDOWNS")
    });
}

/// Room store metrics
pub mod rooms {
    use super::{register_int_counter_vec_with_registry, IntCounterVec, REGISTRY};

    /// Room store operations, by operation and outcome
    pub static STORE_OPERATIONS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
        register_int_counter_vec_with_registry!(
            "room_store_operations_total",
            "Room store operations",
            &["operation", "outcome"],
            REGISTRY.clone()
        )
        .expect("Failed to register STORE_OPERATIONS")
    });
}
