// Platform adapters: fetch one platform's campaigns/metrics and normalize
// them into the canonical model.

pub mod google;
pub mod linkedin;
pub mod meta;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{DateRange, NormalizedBatch, Platform};

pub use google::GoogleAdsAdapter;
pub use linkedin::LinkedInAdsAdapter;
pub use meta::MetaAdsAdapter;

// ============================================================================
// Errors
// ============================================================================

/// Upstream platform failure, carrying the platform, the operation that
/// failed, and the upstream status code.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// 401/403: credentials expired or invalid. The orchestrator forces one
    /// refresh and retries once before surfacing.
    #[error("{platform} auth error in {operation} (status {status})")]
    Auth {
        platform: Platform,
        operation: &'static str,
        status: u16,
    },

    /// 429: retried once with backoff.
    #[error("{platform} rate limited in {operation}")]
    RateLimited {
        platform: Platform,
        operation: &'static str,
    },

    /// Anything else, including timeouts and malformed responses. Not
    /// retried automatically.
    #[error("{platform} API error in {operation} (status {status}): {message}")]
    Api {
        platform: Platform,
        operation: &'static str,
        status: u16,
        message: String,
    },
}

// ============================================================================
// Contract
// ============================================================================

/// What an adapter needs to call its platform for one account
#[derive(Debug, Clone)]
pub struct AdapterCredentials {
    pub access_token: String,
    /// Platform-native account identifier (customer id / act id / urn id)
    pub account_id: String,
    /// Google Ads developer token; unused elsewhere
    pub developer_token: Option<String>,
}

/// Raw, validated platform responses before normalization
#[derive(Debug, Clone)]
pub enum RawResponse {
    Google(google::GoogleSearchResponse),
    Meta(meta::MetaRaw),
    LinkedIn(linkedin::LinkedInRaw),
}

/// Uniform per-platform contract: fetch raw data, then normalize it into
/// canonical campaigns and metric rows.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Call the platform API for the given date range. Fails with
    /// [`PlatformError::Auth`] on 401/403, [`PlatformError::RateLimited`]
    /// on 429, [`PlatformError::Api`] otherwise.
    async fn fetch_raw(
        &self,
        credentials: &AdapterCredentials,
        range: &DateRange,
    ) -> Result<RawResponse, PlatformError>;

    /// Transform a raw response into the canonical model. `run_date` fills
    /// in when the platform omits a row date; a metric date is never blank.
    fn normalize(
        &self,
        raw: &RawResponse,
        run_date: NaiveDate,
    ) -> Result<NormalizedBatch, PlatformError>;
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Map a platform status string through the fixed canonical vocabulary.
/// Unknown values fall back to the lower-cased source string, never an error.
pub(crate) fn map_status(platform: Platform, raw: &str) -> String {
    let canonical = match (platform, raw) {
        (Platform::GoogleAds, "ENABLED") => Some("active"),
        (Platform::GoogleAds, "PAUSED") => Some("paused"),
        (Platform::GoogleAds, "REMOVED") => Some("archived"),
        (Platform::MetaAds, "ACTIVE") => Some("active"),
        (Platform::MetaAds, "PAUSED") => Some("paused"),
        (Platform::MetaAds, "ARCHIVED") => Some("archived"),
        (Platform::LinkedInAds, "ACTIVE") => Some("active"),
        (Platform::LinkedInAds, "PAUSED") => Some("paused"),
        (Platform::LinkedInAds, "ARCHIVED") => Some("archived"),
        (Platform::LinkedInAds, "COMPLETED") => Some("archived"),
        _ => None,
    };
    canonical
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_lowercase())
}

/// Classify an HTTP response, consuming it into a typed error when it is
/// not a success.
pub(crate) async fn check_response(
    platform: Platform,
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    match code {
        401 | 403 => Err(PlatformError::Auth {
            platform,
            operation,
            status: code,
        }),
        429 => Err(PlatformError::RateLimited {
            platform,
            operation,
        }),
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(PlatformError::Api {
                platform,
                operation,
                status: code,
                message,
            })
        }
    }
}

/// Transport-level failures (timeouts included) are API errors
pub(crate) fn transport_error(
    platform: Platform,
    operation: &'static str,
    err: reqwest::Error,
) -> PlatformError {
    PlatformError::Api {
        platform,
        operation,
        status: 0,
        message: err.to_string(),
    }
}

/// Parse a numeric string field, defaulting absent or malformed to 0 so
/// downstream sums stay well-defined.
pub(crate) fn count_or_zero(value: Option<&String>) -> i64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

pub(crate) fn amount_or_zero(value: Option<&String>) -> f64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

/// Parse a platform `YYYY-MM-DD` date, falling back to the run date
pub(crate) fn date_or_run_date(value: Option<&String>, run_date: NaiveDate) -> NaiveDate {
    value
        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        .unwrap_or(run_date)
}
