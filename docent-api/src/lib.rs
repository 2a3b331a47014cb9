// Docent API Library
//
// Signaling relay hub and its HTTP/WebSocket surface

pub mod http;
pub mod signaling;

// Re-export commonly used types
pub use http::{create_router, AppState};
pub use signaling::SignalingHub;
