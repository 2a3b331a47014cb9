//! Docent SFU session proxy
//!
//! Every signaling client gets its own [`SfuConnection`]: a WebSocket link to
//! the media server speaking a small JSON-RPC-like protocol.
//!
//! ## Architecture
//!
//! - **`SfuConnection`**: state machine (Disconnected → Connected → Closed)
//!   owning the upstream socket; outbound `join`/`offer`/`answer`/`trickle`
//! - **`FrameAssembler`**: turns upstream frames into whole JSON documents
//! - **`UpstreamMessage`**: closed set of inbound messages decoded at the boundary
//! - **`SfuEvent`**: what the proxy hands back to its owner over a channel
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docent_sfu::{SfuConfig, SfuConnection, TrickleTarget};
//!
//! let (proxy, mut events) = SfuConnection::new(connection_id, SfuConfig::new(url));
//! proxy.connect().await?;
//! proxy.join("room-1", "alice", &offer_json).await?;
//! while let Some(event) = events.recv().await {
//!     // relay to the client
//! }
//! ```

mod config;
mod connection;
mod error;
mod frame;
mod protocol;
mod types;

pub use config::SfuConfig;
pub use connection::{SfuConnection, SfuEvent};
pub use error::{Error, Result};
pub use frame::FrameAssembler;
pub use protocol::{
    IceCandidateInit, SdpType, SessionDescription, Unhandled, UpstreamMessage,
};
pub use types::{ConnectionState, NegotiationPhase, RequestId, TrickleTarget};
