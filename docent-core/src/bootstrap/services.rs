//! Service initialization and dependency injection

use std::sync::Arc;

use tracing::info;

use crate::{
    cache::{KeyBuilder, RedisRoomStore},
    service::{JwtService, JwtValidator, RedisEventDirectory, RoomService},
    Config,
};

/// Container for the core services shared by the HTTP layer
#[derive(Clone, Debug)]
pub struct Services {
    /// Room directory backed by Redis
    pub room_service: Arc<RoomService>,
    /// Access token verification
    pub jwt_validator: Arc<JwtValidator>,
}

/// Initialize the core services
///
/// Opening the Redis client does not connect; the first store operation does.
pub fn init_services(config: &Config) -> anyhow::Result<Services> {
    info!("Initializing services...");

    let jwt_service = Arc::new(JwtService::from_config(&config.jwt)?);
    let jwt_validator = Arc::new(JwtValidator::new(jwt_service));

    let client = redis::Client::open(config.redis_url())?;
    let keys = KeyBuilder::from_config(config);
    let store = Arc::new(RedisRoomStore::new(client.clone(), keys.clone()));
    let events = Arc::new(RedisEventDirectory::new(client, keys));
    let room_service = Arc::new(RoomService::new(store, events));

    info!(key_prefix = %config.redis.key_prefix, "Services initialized");
    Ok(Services {
        room_service,
        jwt_validator,
    })
}
