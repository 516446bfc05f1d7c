use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::Platform;

// ============================================================================
// Date range
// ============================================================================

/// Inclusive date range a sync or report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

// ============================================================================
// Canonical campaign
// ============================================================================

/// Platform-agnostic campaign as persisted.
///
/// Natural key is (tenant_id, platform, campaign_id); `campaign_id` is the
/// platform-native identifier, `id` is ours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: Platform,
    pub campaign_id: String,
    pub campaign_name: String,
    pub status: String,
    pub budget_amount: Option<f64>,
}

// ============================================================================
// Canonical metrics
// ============================================================================

/// One day of performance for one campaign, as persisted.
///
/// Unique per (campaign_id, date); a resync overwrites the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
}

// ============================================================================
// Adapter output
// ============================================================================

/// Campaign as produced by an adapter, keyed by the platform-native id
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCampaign {
    pub campaign_id: String,
    pub campaign_name: String,
    pub status: String,
    pub budget_amount: Option<f64>,
}

/// Metric row as produced by an adapter, still referencing the
/// platform-native campaign id; the orchestrator resolves it to our uuid
/// after the campaign upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetric {
    pub campaign_id: String,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
}

/// Everything one adapter call yields for one account
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub platform: Platform,
    pub campaigns: Vec<NormalizedCampaign>,
    pub metrics: Vec<NormalizedMetric>,
}
