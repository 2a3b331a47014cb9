pub mod auth;
pub mod event;
pub mod room;

pub use auth::{Claims, JwtService, JwtValidator, TokenType};
pub use event::{EventDirectory, MemoryEventDirectory, RedisEventDirectory};
pub use room::RoomService;
