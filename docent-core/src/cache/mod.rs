pub mod key_builder;
pub mod memory;
pub mod room_store;

pub use key_builder::KeyBuilder;
pub use memory::MemoryRoomStore;
pub use room_store::{RedisRoomStore, RoomStore};
