// Meta Ads adapter: Graph API campaigns + campaign-level insights

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

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const GRAPH_API_VERSION: &str = "v21.0";

const CAMPAIGN_FIELDS: &str = "id,name,status,daily_budget";
const INSIGHT_FIELDS: &str =
    "campaign_id,impressions,clicks,spend,actions,action_values,date_start";

/// Purchase action types that count as conversions/revenue
const PURCHASE_ACTIONS: [&str; 2] = ["purchase", "offsite_conversion.fb_pixel_purchase"];

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MetaList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaCampaign {
    pub id: String,
    pub name: String,
    pub status: String,
    /// Minor currency units (cents) as a string
    pub daily_budget: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaInsightRow {
    pub campaign_id: Option<String>,
    pub impressions: Option<String>,
    pub clicks: Option<String>,
    pub spend: Option<String>,
    pub date_start: Option<String>,
    pub actions: Option<Vec<MetaAction>>,
    pub action_values: Option<Vec<MetaAction>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaAction {
    pub action_type: String,
    pub value: String,
}

/// Both Graph calls an account sync needs
#[derive(Debug, Clone)]
pub struct MetaRaw {
    pub campaigns: Vec<MetaCampaign>,
    pub insights: Vec<MetaInsightRow>,
}

fn sum_purchase_actions(actions: Option<&Vec<MetaAction>>) -> f64 {
    actions
        .map(|list| {
            list.iter()
                .filter(|a| PURCHASE_ACTIONS.contains(&a.action_type.as_str()))
                .filter_map(|a| a.value.parse::<f64>().ok())
                .sum()
        })
        .unwrap_or(0.0)
}

// ============================================================================
// Adapter
// ============================================================================

pub struct MetaAdsAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl MetaAdsAdapter {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            base_url: format!("{}/{}", GRAPH_BASE_URL, GRAPH_API_VERSION),
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, PlatformError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(Platform::MetaAds, operation, e))?;

        let response = check_response(Platform::MetaAds, operation, response).await?;
        let list: MetaList<T> = response.json().await.map_err(|e| PlatformError::Api {
            platform: Platform::MetaAds,
            operation,
            status: 0,
            message: format!("invalid response body: {}", e),
        })?;
        Ok(list.data)
    }
}

#[async_trait]
impl PlatformAdapter for MetaAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::MetaAds
    }

    async fn fetch_raw(
        &self,
        credentials: &AdapterCredentials,
        range: &DateRange,
    ) -> Result<RawResponse, PlatformError> {
        let campaigns_url = format!("{}/act_{}/campaigns", self.base_url, credentials.account_id);
        let campaigns: Vec<MetaCampaign> = self
            .get_list(
                "campaigns.list",
                &campaigns_url,
                &[
                    ("access_token", credentials.access_token.as_str()),
                    ("fields", CAMPAIGN_FIELDS),
                ],
            )
            .await?;

        let time_range = format!(
            r#"{{"since":"{}","until":"{}"}}"#,
            range.start, range.end
        );
        let insights_url = format!("{}/act_{}/insights", self.base_url, credentials.account_id);
        let insights: Vec<MetaInsightRow> = self
            .get_list(
                "insights.list",
                &insights_url,
                &[
                    ("access_token", credentials.access_token.as_str()),
                    ("fields", INSIGHT_FIELDS),
                    ("level", "campaign"),
                    ("time_increment", "1"),
                    ("time_range", time_range.as_str()),
                ],
            )
            .await?;

        Ok(RawResponse::Meta(MetaRaw { campaigns, insights }))
    }

    fn normalize(
        &self,
        raw: &RawResponse,
        run_date: NaiveDate,
    ) -> Result<NormalizedBatch, PlatformError> {
        let RawResponse::Meta(meta) = raw else {
            return Err(PlatformError::Api {
                platform: Platform::MetaAds,
                operation: "normalize",
                status: 0,
                message: "raw response is not a Meta Ads payload".to_string(),
            });
        };

        let mut campaigns: BTreeMap<String, NormalizedCampaign> = BTreeMap::new();
        for campaign in &meta.campaigns {
            campaigns.insert(
                campaign.id.clone(),
                NormalizedCampaign {
                    campaign_id: campaign.id.clone(),
                    campaign_name: campaign.name.clone(),
                    status: map_status(Platform::MetaAds, &campaign.status),
                    // daily_budget arrives in cents
                    budget_amount: campaign
                        .daily_budget
                        .as_ref()
                        .and_then(|b| b.parse::<f64>().ok())
                        .map(|cents| cents / 100.0),
                },
            );
        }

        let mut metrics = Vec::new();
        for row in &meta.insights {
            // Insight rows not attributable to a campaign cannot be keyed
            let Some(campaign_id) = &row.campaign_id else {
                tracing::warn!(platform = "meta_ads", "Dropping insight row without campaign_id");
                continue;
            };

            metrics.push(NormalizedMetric {
                campaign_id: campaign_id.clone(),
                date: date_or_run_date(row.date_start.as_ref(), run_date),
                impressions: count_or_zero(row.impressions.as_ref()),
                clicks: count_or_zero(row.clicks.as_ref()),
                conversions: sum_purchase_actions(row.actions.as_ref()),
                spend: amount_or_zero(row.spend.as_ref()),
                revenue: sum_purchase_actions(row.action_values.as_ref()),
            });
        }

        Ok(NormalizedBatch {
            platform: Platform::MetaAds,
            campaigns: campaigns.into_values().collect(),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> MetaAdsAdapter {
        MetaAdsAdapter::new(Duration::from_secs(5))
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn raw(campaigns: serde_json::Value, insights: serde_json::Value) -> MetaRaw {
        MetaRaw {
            campaigns: serde_json::from_value(campaigns).unwrap(),
            insights: serde_json::from_value(insights).unwrap(),
        }
    }

    #[test]
    fn test_normalize_budget_cents_and_purchase_actions() {
        let meta = raw(
            serde_json::json!([
                { "id": "c1", "name": "Retarget", "status": "ACTIVE", "daily_budget": "2500" }
            ]),
            serde_json::json!([{
                "campaign_id": "c1",
                "impressions": "800",
                "clicks": "40",
                "spend": "19.99",
                "date_start": "2024-06-14",
                "actions": [
                    { "action_type": "purchase", "value": "3" },
                    { "action_type": "link_click", "value": "40" }
                ],
                "action_values": [
                    { "action_type": "purchase", "value": "150.50" }
                ]
            }]),
        );

        let batch = adapter()
            .normalize(&RawResponse::Meta(meta), run_date())
            .unwrap();

        assert_eq!(batch.campaigns[0].budget_amount, Some(25.0));
        assert_eq!(batch.campaigns[0].status, "active");

        let metric = &batch.metrics[0];
        assert_eq!(metric.spend, 19.99);
        assert_eq!(metric.conversions, 3.0);
        assert_eq!(metric.revenue, 150.50);
        // link_click is not a purchase action and must not leak into conversions
        assert_eq!(metric.clicks, 40);
    }

    #[test]
    fn test_normalize_missing_fields_default_to_zero() {
        let meta = raw(
            serde_json::json!([{ "id": "c2", "name": "Sparse", "status": "PAUSED" }]),
            serde_json::json!([{ "campaign_id": "c2" }]),
        );

        let batch = adapter()
            .normalize(&RawResponse::Meta(meta), run_date())
            .unwrap();

        assert_eq!(batch.campaigns[0].budget_amount, None);
        let metric = &batch.metrics[0];
        assert_eq!(metric.impressions, 0);
        assert_eq!(metric.spend, 0.0);
        assert_eq!(metric.revenue, 0.0);
        assert_eq!(metric.date, run_date());
    }

    #[test]
    fn test_normalize_drops_unattributable_insights() {
        let meta = raw(
            serde_json::json!([]),
            serde_json::json!([
                { "impressions": "999" },
                { "campaign_id": "c3", "impressions": "5" }
            ]),
        );

        let batch = adapter()
            .normalize(&RawResponse::Meta(meta), run_date())
            .unwrap();

        assert_eq!(batch.metrics.len(), 1);
        assert_eq!(batch.metrics[0].campaign_id, "c3");
    }
}
