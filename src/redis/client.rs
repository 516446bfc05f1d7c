use redis::{aio::ConnectionManager, Client};

use crate::{config::RedisConfig, errors::Result};

/// Connect the Redis client backing the single-use OAuth state store.
/// `ConnectionManager` reconnects on its own, so the handle is created once
/// at startup and cloned into the API state.
pub async fn create_client(config: &RedisConfig) -> Result<ConnectionManager> {
    let client = Client::open(config.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Redis connection manager ready");

    Ok(manager)
}

/// PING round trip backing the readiness endpoint
pub async fn health_check(manager: &mut ConnectionManager) -> Result<()> {
    let _: String = redis::cmd("PING").query_async(manager).await?;
    Ok(())
}
