use std::sync::Arc;

use axum::{
    http::HeaderMap,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    api::{accounts, connect, health, reports, sync, webhooks},
    config::Config,
    db::Store,
    domain::Platform,
    errors::{AppError, Result},
    oauth::{OAuthClient, StateStore},
    observability::HealthChecker,
    sync::SyncQueue,
    vault::TokenVault,
    webhook::WebhookSink,
};

/// Header carrying the caller's tenant id. Tenant resolution lives in the
/// edge proxy; by the time a request reaches this service the header is
/// authoritative.
pub const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Clone)]
pub struct AppState {
    pub health_checker: Arc<HealthChecker>,
    pub store: Arc<dyn Store>,
    pub vault: Arc<TokenVault>,
    pub oauth: Arc<OAuthClient>,
    pub state_store: StateStore,
    pub queue: SyncQueue,
    pub webhook_sink: Arc<dyn WebhookSink>,
    pub config: Arc<Config>,
}

pub fn create_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Meta webhook surface (unauthenticated, signature-verified)
        .route(
            "/webhooks/meta",
            get(webhooks::subscribe).post(webhooks::receive),
        )
        // API v1 routes
        .nest("/v1", v1_routes())
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}

fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/connect/:platform", get(connect::connect))
        .route("/oauth/:platform/callback", get(connect::callback))
        .route("/accounts", get(accounts::list))
        .route("/accounts/:platform", delete(accounts::disconnect))
        .route("/sync", post(sync::trigger))
        .route("/sync/runs", get(sync::runs))
        .route("/reports/summary", get(reports::summary))
}

/// Extract and parse the tenant id header
pub(crate) fn tenant_id(headers: &HeaderMap) -> Result<Uuid> {
    let value = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation(format!("missing {} header", TENANT_HEADER)))?;
    Uuid::parse_str(value)
        .map_err(|_| AppError::Validation(format!("{} must be a uuid", TENANT_HEADER)))
}

/// Parse a platform path segment
pub(crate) fn parse_platform(raw: &str) -> Result<Platform> {
    Platform::from_str(raw)
        .ok_or_else(|| AppError::Validation(format!("unknown platform '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_tenant_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(tenant_id(&headers).is_err());

        headers.insert(TENANT_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(tenant_id(&headers).is_err());

        let id = Uuid::new_v4();
        headers.insert(
            TENANT_HEADER,
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(tenant_id(&headers).unwrap(), id);
    }

    #[test]
    fn test_platform_segment_parsing() {
        assert_eq!(parse_platform("google_ads").unwrap(), Platform::GoogleAds);
        assert!(parse_platform("bing_ads").is_err());
    }
}
