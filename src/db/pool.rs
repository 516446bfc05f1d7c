use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::DatabaseConfig, errors::Result};

/// Build the Postgres pool the sync engine runs on. API handlers, the sync
/// worker, and the token monitor all draw from the same pool, so it is sized
/// for `sync.max_parallel_accounts` plus request traffic via config.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        // Sync runs hold connections across slow upstream API calls; a
        // connection that died while idle must fail at acquire, not mid-run
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Postgres pool ready"
    );

    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./src/db/migrations").run(pool).await?;
    tracing::info!("Schema migrations applied");
    Ok(())
}

/// Round-trip query backing the readiness endpoint
pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
