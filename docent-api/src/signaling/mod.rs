//! Real-time signaling between browser clients and the SFU

pub mod bindings;
pub mod error;
pub mod groups;
pub mod hub;
pub mod messages;
pub mod registry;

pub use bindings::StreamBindings;
pub use error::{HubError, HubResult};
pub use groups::{Member, RoomGroups};
pub use hub::{Session, SignalingHub, TeardownReason};
pub use messages::{ClientMessage, JsonText, ServerMessage};
pub use registry::{ClientSender, ConnectionEntry, ConnectionId, ConnectionRegistry};
