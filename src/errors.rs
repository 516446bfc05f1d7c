use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::adapters::PlatformError;
use crate::vault::VaultError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    DatabaseMigration(#[from] sqlx::migrate::MigrateError),

    // Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // Upstream platform errors
    #[error(transparent)]
    Platform(#[from] PlatformError),

    // Credential vault errors
    #[error(transparent)]
    Vault(#[from] VaultError),

    // OAuth connect flow
    #[error("OAuth state mismatch or expired")]
    InvalidOAuthState,
    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    // Webhook path
    #[error("Webhook signature verification failed")]
    SignatureVerification,

    // Rate limiting
    #[error("Rate limit exceeded for {0}")]
    RateLimitExceeded(String),

    // Account state
    #[error("No connected account for platform")]
    AccountNotConnected,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

// Implement IntoResponse for Axum
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(_) | AppError::DatabaseMigration(_) => {
                tracing::error!("Database error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Redis(_) => {
                tracing::error!("Redis error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Platform(e) => {
                tracing::error!("Platform error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Upstream platform error".to_string())
            }
            AppError::Vault(e) => {
                tracing::error!("Vault error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InvalidOAuthState => {
                (StatusCode::BAD_REQUEST, "Invalid or expired OAuth state".to_string())
            }
            AppError::OAuthExchange(_) => {
                tracing::error!("OAuth exchange error: {:?}", self);
                (StatusCode::BAD_GATEWAY, "OAuth token exchange failed".to_string())
            }
            AppError::SignatureVerification => {
                (StatusCode::UNAUTHORIZED, "Invalid signature".to_string())
            }
            AppError::RateLimitExceeded(_) => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string())
            }
            AppError::AccountNotConnected => {
                (StatusCode::NOT_FOUND, "No connected account".to_string())
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Configuration(_) => {
                tracing::error!("Configuration error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
