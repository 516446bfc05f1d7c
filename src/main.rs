use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use adsync::{
    adapters::{GoogleAdsAdapter, LinkedInAdsAdapter, MetaAdsAdapter, PlatformAdapter},
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, run_migrations, PgStore, Store},
    domain::Platform,
    oauth::{OAuthClient, StateStore},
    observability::{init_tracing, HealthChecker},
    rate_limit::RateLimiter,
    redis::create_client,
    sync::{run_scheduler, run_worker, SyncOrchestrator, SyncQueue, TokenMonitor},
    vault::{Cipher, TokenVault},
    webhook::LoggingSink,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Initialize tracing/logging
    init_tracing(&config.observability);

    tracing::info!("Starting ad sync service");
    tracing::info!("Configuration loaded: {:?}", config.server);

    // Create database connection pool
    let db_pool = create_pool(&config.database).await?;

    // Run database migrations
    run_migrations(&db_pool).await?;

    // Create Redis connection
    let redis_manager = create_client(&config.redis).await?;

    let config = Arc::new(config);
    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool.clone()));

    // Credential vault and OAuth client
    let cipher = Cipher::from_hex_key(&config.vault.encryption_key_hex)?;
    let oauth = Arc::new(OAuthClient::new(config.oauth.clone())?);
    let vault = Arc::new(TokenVault::new(
        cipher,
        store.clone(),
        oauth.clone(),
        config.vault.refresh_threshold_seconds,
    ));

    // Shared rate limiter and the platform adapters
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let request_timeout = Duration::from_secs(config.sync.request_timeout_seconds);
    let mut adapters: HashMap<Platform, Arc<dyn PlatformAdapter>> = HashMap::new();
    adapters.insert(
        Platform::GoogleAds,
        Arc::new(GoogleAdsAdapter::new(request_timeout)),
    );
    adapters.insert(
        Platform::MetaAds,
        Arc::new(MetaAdsAdapter::new(request_timeout)),
    );
    adapters.insert(
        Platform::LinkedInAds,
        Arc::new(LinkedInAdsAdapter::new(request_timeout)),
    );

    // Sync pipeline: queue, worker, scheduler, token monitor
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store.clone(),
        vault.clone(),
        limiter,
        adapters,
        &config.sync,
        config.oauth.google.developer_token.clone(),
    ));
    let (queue, queue_rx) = SyncQueue::new(config.sync.queue_depth);

    tokio::spawn(run_worker(queue_rx, orchestrator));
    tokio::spawn(run_scheduler(
        queue.clone(),
        store.clone(),
        config.sync.clone(),
    ));
    tokio::spawn(TokenMonitor::new(store.clone(), config.sync.monitor_interval_seconds).run());

    // HTTP surface
    let state = AppState {
        health_checker: Arc::new(HealthChecker::new(db_pool.clone(), redis_manager.clone())),
        store,
        vault,
        oauth,
        state_store: StateStore::new(redis_manager),
        queue,
        webhook_sink: Arc::new(LoggingSink),
        config: config.clone(),
    };
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Ad sync service is ready to accept requests");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
