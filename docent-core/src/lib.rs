//! Core building blocks of the Docent signaling relay
//!
//! Ids and room models, configuration, logging, metrics, token validation,
//! the ephemeral room store and the room directory service.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;

pub use cache::{KeyBuilder, MemoryRoomStore, RedisRoomStore, RoomStore};
pub use config::Config;
pub use error::{Error, Result};
pub use service::{EventDirectory, MemoryEventDirectory, RedisEventDirectory, RoomService};
