// LinkedIn Ads adapter: Marketing API (Rest.li) campaigns + daily analytics

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::{DateRange, NormalizedBatch, NormalizedCampaign, NormalizedMetric, Platform};

use super::{
    check_response, map_status, transport_error, AdapterCredentials, PlatformAdapter,
    PlatformError, RawResponse,
};

const LINKEDIN_BASE_URL: &str = "https://api.linkedin.com";
const LINKEDIN_VERSION: &str = "202411";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";

const CAMPAIGN_URN_PREFIX: &str = "urn:li:sponsoredCampaign:";

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInElements<T> {
    #[serde(default = "Vec::new")]
    pub elements: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInCampaign {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub daily_budget: Option<LinkedInMoney>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInMoney {
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInAnalyticsRow {
    pub pivot_values: Option<Vec<String>>,
    pub date_range: Option<LinkedInDateRange>,
    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub cost_in_local_currency: Option<String>,
    pub external_website_conversions: Option<i64>,
    pub conversion_value_in_local_currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInDateRange {
    pub start: Option<LinkedInDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Both Marketing API calls an account sync needs
#[derive(Debug, Clone)]
pub struct LinkedInRaw {
    pub campaigns: Vec<LinkedInCampaign>,
    pub analytics: Vec<LinkedInAnalyticsRow>,
}

fn campaign_id_from_urn(pivot_values: Option<&Vec<String>>) -> Option<String> {
    pivot_values?
        .iter()
        .find_map(|urn| urn.strip_prefix(CAMPAIGN_URN_PREFIX))
        .map(str::to_string)
}

fn restli_date(date: NaiveDate) -> String {
    use chrono::Datelike;
    format!(
        "(year:{},month:{},day:{})",
        date.year(),
        date.month(),
        date.day()
    )
}

// ============================================================================
// Adapter
// ============================================================================

pub struct LinkedInAdsAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl LinkedInAdsAdapter {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            base_url: LINKEDIN_BASE_URL.to_string(),
        }
    }

    async fn get_elements<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        url: String,
        access_token: &str,
    ) -> Result<Vec<T>, PlatformError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("LinkedIn-Version", LINKEDIN_VERSION)
            .header("X-Restli-Protocol-Version", RESTLI_PROTOCOL_VERSION)
            .send()
            .await
            .map_err(|e| transport_error(Platform::LinkedInAds, operation, e))?;

        let response = check_response(Platform::LinkedInAds, operation, response).await?;
        let parsed: LinkedInElements<T> =
            response.json().await.map_err(|e| PlatformError::Api {
                platform: Platform::LinkedInAds,
                operation,
                status: 0,
                message: format!("invalid response body: {}", e),
            })?;
        Ok(parsed.elements)
    }
}

#[async_trait]
impl PlatformAdapter for LinkedInAdsAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedInAds
    }

    async fn fetch_raw(
        &self,
        credentials: &AdapterCredentials,
        range: &DateRange,
    ) -> Result<RawResponse, PlatformError> {
        // Rest.li query syntax wants its structured parameters pre-encoded,
        // so these URLs are assembled by hand rather than via .query()
        let account_urn = format!("urn%3Ali%3AsponsoredAccount%3A{}", credentials.account_id);

        let campaigns_url = format!(
            "{}/rest/adCampaigns?q=search&search=(account:(values:List({})))",
            self.base_url, account_urn
        );
        let campaigns: Vec<LinkedInCampaign> = self
            .get_elements("adCampaigns.search", campaigns_url, &credentials.access_token)
            .await?;

        let analytics_url = format!(
            "{}/rest/adAnalytics?q=analytics&pivot=CAMPAIGN&timeGranularity=DAILY\
             &dateRange=(start:{},end:{})&accounts=List({})\
             &fields=pivotValues,dateRange,impressions,clicks,costInLocalCurrency,\
             externalWebsiteConversions,conversionValueInLocalCurrency",
            self.base_url,
            restli_date(range.start),
            restli_date(range.end),
            account_urn
        );
        let analytics: Vec<LinkedInAnalyticsRow> = self
            .get_elements("adAnalytics.analytics", analytics_url, &credentials.access_token)
            .await?;

        Ok(RawResponse::LinkedIn(LinkedInRaw { campaigns, analytics }))
    }

    fn normalize(
        &self,
        raw: &RawResponse,
        run_date: NaiveDate,
    ) -> Result<NormalizedBatch, PlatformError> {
        let RawResponse::LinkedIn(linkedin) = raw else {
            return Err(PlatformError::Api {
                platform: Platform::LinkedInAds,
                operation: "normalize",
                status: 0,
                message: "raw response is not a LinkedIn Ads payload".to_string(),
            });
        };

        let mut campaigns: BTreeMap<String, NormalizedCampaign> = BTreeMap::new();
        for campaign in &linkedin.campaigns {
            let id = campaign.id.to_string();
            campaigns.insert(
                id.clone(),
                NormalizedCampaign {
                    campaign_id: id,
                    campaign_name: campaign.name.clone(),
                    status: map_status(Platform::LinkedInAds, &campaign.status),
                    budget_amount: campaign
                        .daily_budget
                        .as_ref()
                        .and_then(|b| b.amount.parse::<f64>().ok()),
                },
            );
        }

        let mut metrics = Vec::new();
        for row in &linkedin.analytics {
            let Some(campaign_id) = campaign_id_from_urn(row.pivot_values.as_ref()) else {
                tracing::warn!(
                    platform = "linkedin_ads",
                    "Dropping analytics row without campaign pivot"
                );
                continue;
            };

            let date = row
                .date_range
                .as_ref()
                .and_then(|r| r.start.as_ref())
                .and_then(|d| NaiveDate::from_ymd_opt(d.year, d.month, d.day))
                .unwrap_or(run_date);

            metrics.push(NormalizedMetric {
                campaign_id,
                date,
                impressions: row.impressions.unwrap_or(0),
                clicks: row.clicks.unwrap_or(0),
                conversions: row.external_website_conversions.unwrap_or(0) as f64,
                spend: row
                    .cost_in_local_currency
                    .as_ref()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(0.0),
                revenue: row
                    .conversion_value_in_local_currency
                    .as_ref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0),
            });
        }

        Ok(NormalizedBatch {
            platform: Platform::LinkedInAds,
            campaigns: campaigns.into_values().collect(),
            metrics,
        })
    }
}
