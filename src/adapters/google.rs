// Google Ads adapter: GAQL search over the REST endpoint

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{DateRange, NormalizedBatch, NormalizedCampaign, NormalizedMetric, Platform};

use super::{
    amount_or_zero, check_response, count_or_zero, date_or_run_date, map_status, transport_error,
    AdapterCredentials, PlatformAdapter, PlatformError, RawResponse,
};

const GOOGLE_ADS_BASE_URL: &str = "https://googleads.googleapis.com/v17";

/// Cost and budget arrive in micros of the account currency
const MICROS_PER_UNIT: f64 = 1_000_000.0;

// ============================================================================
// Response DTOs
// ============================================================================

// int64 fields are serialized as strings in the Google Ads REST JSON.

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSearchResponse {
    #[serde(default)]
    pub results: Vec<GoogleRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleRow {
    pub campaign: Option<GoogleCampaign>,
    pub campaign_budget: Option<GoogleBudget>,
    pub metrics: Option<GoogleMetrics>,
    pub segments: Option<GoogleSegments>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCampaign {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleBudget {
    pub amount_micros: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleMetrics {
    pub impressions: Option<String>,
    pub clicks: Option<String>,
    pub conversions: Option<f64>,
    pub cost_micros: Option<String>,
    pub conversions_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSegments {
    pub date: Option<String>,
}

// ============================================================================
// Adapter
// ============================================================================

pub struct GoogleAdsAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleAdsAdapter {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            base_url: GOOGLE_ADS_BASE_URL.to_string(),
        }
    }

    fn gaql_query(range: &DateRange) -> String {
        format!(
            "SELECT campaign.id, campaign.name, campaign.status, \
             campaign_budget.amount_micros, metrics.impressions, metrics.clicks, \
             metrics.conversions, metrics.cost_micros, metrics.conversions_value, \
             segments.date \
             FROM campaign \
             WHERE segments.date BETWEEN '{}' AND '{}'",
            range.start, range.end
        )
    }
}

#[async_trait]
impl PlatformAdapter for GoogleAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::GoogleAds
    }

    async fn fetch_raw(
        &self,
        credentials: &AdapterCredentials,
        range: &DateRange,
    ) -> Result<RawResponse, PlatformError> {
        let operation = "googleAds.search";
        let url = format!(
            "{}/customers/{}/googleAds:search",
            self.base_url, credentials.account_id
        );

        let developer_token = credentials.developer_token.as_deref().ok_or_else(|| {
            PlatformError::Api {
                platform: Platform::GoogleAds,
                operation,
                status: 0,
                message: "missing developer token".to_string(),
            }
        })?;

        let response = self
            .http
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .header("developer-token", developer_token)
            .json(&serde_json::json!({ "query": Self::gaql_query(range) }))
            .send()
            .await
            .map_err(|e| transport_error(Platform::GoogleAds, operation, e))?;

        let response = check_response(Platform::GoogleAds, operation, response).await?;
        let parsed: GoogleSearchResponse = response.json().await.map_err(|e| PlatformError::Api {
            platform: Platform::GoogleAds,
            operation,
            status: 0,
            message: format!("invalid response body: {}", e),
        })?;

        Ok(RawResponse::Google(parsed))
    }

    fn normalize(
        &self,
        raw: &RawResponse,
        run_date: NaiveDate,
    ) -> Result<NormalizedBatch, PlatformError> {
        let RawResponse::Google(search) = raw else {
            return Err(PlatformError::Api {
                platform: Platform::GoogleAds,
                operation: "normalize",
                status: 0,
                message: "raw response is not a Google Ads payload".to_string(),
            });
        };

        let mut campaigns: BTreeMap<String, NormalizedCampaign> = BTreeMap::new();
        let mut metrics = Vec::new();

        for row in &search.results {
            // Rows without a campaign cannot be keyed; reject them rather
            // than propagate blanks into arithmetic.
            let Some(campaign) = &row.campaign else {
                tracing::warn!(platform = "google_ads", "Dropping result row without campaign");
                continue;
            };

            let budget_amount = row
                .campaign_budget
                .as_ref()
                .and_then(|b| b.amount_micros.as_ref())
                .and_then(|m| m.parse::<f64>().ok())
                .map(|micros| micros / MICROS_PER_UNIT);

            campaigns
                .entry(campaign.id.clone())
                .or_insert_with(|| NormalizedCampaign {
                    campaign_id: campaign.id.clone(),
                    campaign_name: campaign.name.clone(),
                    status: map_status(Platform::GoogleAds, &campaign.status),
                    budget_amount,
                });

            let date = date_or_run_date(
                row.segments.as_ref().and_then(|s| s.date.as_ref()),
                run_date,
            );
            let m = row.metrics.as_ref();
            metrics.push(NormalizedMetric {
                campaign_id: campaign.id.clone(),
                date,
                impressions: count_or_zero(m.and_then(|m| m.impressions.as_ref())),
                clicks: count_or_zero(m.and_then(|m| m.clicks.as_ref())),
                conversions: m.and_then(|m| m.conversions).unwrap_or(0.0),
                spend: amount_or_zero(m.and_then(|m| m.cost_micros.as_ref())) / MICROS_PER_UNIT,
                revenue: m.and_then(|m| m.conversions_value).unwrap_or(0.0),
            });
        }

        Ok(NormalizedBatch {
            platform: Platform::GoogleAds,
            campaigns: campaigns.into_values().collect(),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> GoogleAdsAdapter {
        GoogleAdsAdapter::new(Duration::from_secs(5))
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_normalize_converts_micros_and_status() {
        let raw: GoogleSearchResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "campaign": { "id": "111", "name": "Brand", "status": "ENABLED" },
                "campaignBudget": { "amountMicros": "25000000" },
                "metrics": {
                    "impressions": "1000",
                    "clicks": "50",
                    "conversions": 4.0,
                    "costMicros": "12500000",
                    "conversionsValue": 200.0
                },
                "segments": { "date": "2024-06-14" }
            }]
        }))
        .unwrap();

        let batch = adapter()
            .normalize(&RawResponse::Google(raw), run_date())
            .unwrap();

        assert_eq!(batch.campaigns.len(), 1);
        let campaign = &batch.campaigns[0];
        assert_eq!(campaign.status, "active");
        assert_eq!(campaign.budget_amount, Some(25.0));

        assert_eq!(batch.metrics.len(), 1);
        let metric = &batch.metrics[0];
        assert_eq!(metric.spend, 12.5);
        assert_eq!(metric.impressions, 1000);
        assert_eq!(metric.date, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
    }

    #[test]
    fn test_normalize_defaults_missing_metrics_to_zero() {
        let raw: GoogleSearchResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "campaign": { "id": "222", "name": "NoMetrics", "status": "PAUSED" }
            }]
        }))
        .unwrap();

        let batch = adapter()
            .normalize(&RawResponse::Google(raw), run_date())
            .unwrap();

        let metric = &batch.metrics[0];
        assert_eq!(metric.impressions, 0);
        assert_eq!(metric.clicks, 0);
        assert_eq!(metric.spend, 0.0);
        assert_eq!(metric.revenue, 0.0);
        // Missing segments.date falls back to the run date
        assert_eq!(metric.date, run_date());
    }

    #[test]
    fn test_normalize_rejects_rows_without_campaign() {
        let raw: GoogleSearchResponse = serde_json::from_value(serde_json::json!({
            "results": [
                { "metrics": { "impressions": "10" } },
                { "campaign": { "id": "333", "name": "Kept", "status": "REMOVED" } }
            ]
        }))
        .unwrap();

        let batch = adapter()
            .normalize(&RawResponse::Google(raw), run_date())
            .unwrap();

        assert_eq!(batch.campaigns.len(), 1);
        assert_eq!(batch.campaigns[0].campaign_id, "333");
        assert_eq!(batch.campaigns[0].status, "archived");
        assert_eq!(batch.metrics.len(), 1);
    }

    #[test]
    fn test_campaign_deduped_across_date_rows() {
        let raw: GoogleSearchResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {
                    "campaign": { "id": "444", "name": "Multi", "status": "ENABLED" },
                    "segments": { "date": "2024-06-13" }
                },
                {
                    "campaign": { "id": "444", "name": "Multi", "status": "ENABLED" },
                    "segments": { "date": "2024-06-14" }
                }
            ]
        }))
        .unwrap();

        let batch = adapter()
            .normalize(&RawResponse::Google(raw), run_date())
            .unwrap();

        assert_eq!(batch.campaigns.len(), 1);
        assert_eq!(batch.metrics.len(), 2);
    }

    #[test]
    fn test_gaql_query_covers_range() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        };
        let query = GoogleAdsAdapter::gaql_query(&range);
        assert!(query.contains("BETWEEN '2024-06-01' AND '2024-06-30'"));
        assert!(query.contains("segments.date"));
    }
}
