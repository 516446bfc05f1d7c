use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub vault: VaultConfig,
    pub oauth: OAuthConfig,
    pub rate_limit: RateLimitConfig,
    pub sync: SyncConfig,
    pub webhook: WebhookConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Hex-encoded 32-byte AEAD key for token-at-rest encryption
    pub encryption_key_hex: String,
    /// Tokens within this window of expiry are refreshed before use
    pub refresh_threshold_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub google: OAuthAppConfig,
    pub meta: OAuthAppConfig,
    pub linkedin: OAuthAppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Platform-specific extras, e.g. the Google Ads developer token
    #[serde(default)]
    pub developer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity per platform (burst size)
    pub capacity: f64,
    /// Continuous refill rate, tokens per second
    pub refill_per_second: f64,
    /// How long acquire() may wait before giving up
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Bounded fan-out across one tenant's accounts
    pub max_parallel_accounts: usize,
    /// Outbound call timeout for platform fetches
    pub request_timeout_seconds: u64,
    /// Backoff before the single rate-limit retry
    pub retry_backoff_seconds: u64,
    /// How far back a scheduled sync reaches
    pub lookback_days: i64,
    /// Cadence of the periodic scheduler
    pub schedule_interval_seconds: u64,
    /// Cadence of the token monitor scan
    pub monitor_interval_seconds: u64,
    /// Capacity of the sync job queue
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret for inbound signature verification
    pub app_secret: String,
    /// Expected hub.verify_token on subscription handshake
    pub verify_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        // Determine environment
        let environment = env::var("ADSYNC_ENV").unwrap_or_else(|_| "development".to_string());

        // Build configuration
        let config = config::Config::builder()
            // Start with default config
            .add_source(config::File::with_name("config/default"))
            // Add environment-specific config
            .add_source(
                config::File::with_name(&format!("config/{}", environment)).required(false),
            )
            // Add environment variables with prefix ADSYNC
            // e.g., ADSYNC__SERVER__PORT=8080
            .add_source(
                config::Environment::with_prefix("ADSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        // Deserialize into our Config struct
        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(AppError::Configuration(
                "Database URL is required".to_string(),
            ));
        }

        if self.redis.url.is_empty() {
            return Err(AppError::Configuration("Redis URL is required".to_string()));
        }

        // The AEAD key must decode to exactly 32 bytes
        match hex::decode(&self.vault.encryption_key_hex) {
            Ok(key) if key.len() == 32 => {}
            _ => {
                return Err(AppError::Configuration(
                    "vault.encryption_key_hex must be 64 hex chars (32 bytes)".to_string(),
                ))
            }
        }

        if self.rate_limit.capacity < 1.0 || self.rate_limit.refill_per_second <= 0.0 {
            return Err(AppError::Configuration(
                "Rate limit capacity and refill rate must be positive".to_string(),
            ));
        }

        if self.sync.max_parallel_accounts == 0 {
            return Err(AppError::Configuration(
                "sync.max_parallel_accounts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
