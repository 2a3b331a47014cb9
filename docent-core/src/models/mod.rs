pub mod id;
pub mod room;

pub use id::{generate_id, EventId, RoomId, StreamId, UserId};
pub use room::{NewRoom, Room, RoomMetadata};
