// Cross-platform metrics aggregation: per-platform and total summaries with
// guarded derived ratios, plus deterministic platform rankings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{DateRange, MetricRecord, Platform};

/// Return on ad spend. Guarded: zero spend yields 0, never NaN/Infinity.
pub fn roas(spend: f64, revenue: f64) -> f64 {
    if spend > 0.0 {
        revenue / spend
    } else {
        0.0
    }
}

/// Click-through rate in percent. Guarded like [`roas`].
pub fn ctr(impressions: i64, clicks: i64) -> f64 {
    if impressions > 0 {
        clicks as f64 / impressions as f64 * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlatformSummary {
    pub platform: Platform,
    pub spend: f64,
    pub revenue: f64,
    pub conversions: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub roas: f64,
    pub ctr: f64,
    pub campaign_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TotalSummary {
    pub spend: f64,
    pub revenue: f64,
    pub conversions: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub roas: f64,
    pub ctr: f64,
    pub campaign_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossPlatformSummary {
    pub range: DateRange,
    pub platforms: Vec<PlatformSummary>,
    pub total: TotalSummary,
}

/// Deterministic platform rankings, best first. Ties break by platform name
/// ascending so repeated runs always agree.
#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub by_roas: Vec<Platform>,
    pub by_ctr: Vec<Platform>,
    pub by_spend: Vec<Platform>,
}

/// Merge metric rows into per-platform and total summaries.
///
/// `campaign_platforms` maps internal campaign ids to their platform; rows
/// whose campaign is not in the map are skipped (they cannot be attributed).
pub fn summarize(
    metrics: &[MetricRecord],
    campaign_platforms: &HashMap<Uuid, Platform>,
    range: DateRange,
) -> CrossPlatformSummary {
    #[derive(Default)]
    struct Acc {
        spend: f64,
        revenue: f64,
        conversions: f64,
        impressions: i64,
        clicks: i64,
        campaigns: BTreeSet<Uuid>,
    }

    let mut per_platform: BTreeMap<Platform, Acc> = BTreeMap::new();

    for record in metrics {
        if !range.contains(record.date) {
            continue;
        }
        let Some(platform) = campaign_platforms.get(&record.campaign_id) else {
            continue;
        };
        let acc = per_platform.entry(*platform).or_default();
        acc.spend += record.spend;
        acc.revenue += record.revenue;
        acc.conversions += record.conversions;
        acc.impressions += record.impressions;
        acc.clicks += record.clicks;
        acc.campaigns.insert(record.campaign_id);
    }

    let platforms: Vec<PlatformSummary> = per_platform
        .into_iter()
        .map(|(platform, acc)| PlatformSummary {
            platform,
            spend: acc.spend,
            revenue: acc.revenue,
            conversions: acc.conversions,
            impressions: acc.impressions,
            clicks: acc.clicks,
            roas: roas(acc.spend, acc.revenue),
            ctr: ctr(acc.impressions, acc.clicks),
            campaign_count: acc.campaigns.len(),
        })
        .collect();

    let total = TotalSummary {
        spend: platforms.iter().map(|p| p.spend).sum(),
        revenue: platforms.iter().map(|p| p.revenue).sum(),
        conversions: platforms.iter().map(|p| p.conversions).sum(),
        impressions: platforms.iter().map(|p| p.impressions).sum(),
        clicks: platforms.iter().map(|p| p.clicks).sum(),
        roas: roas(
            platforms.iter().map(|p| p.spend).sum(),
            platforms.iter().map(|p| p.revenue).sum(),
        ),
        ctr: ctr(
            platforms.iter().map(|p| p.impressions).sum(),
            platforms.iter().map(|p| p.clicks).sum(),
        ),
        campaign_count: platforms.iter().map(|p| p.campaign_count).sum(),
    };

    CrossPlatformSummary {
        range,
        platforms,
        total,
    }
}

/// Rank platforms by a metric, best first, ties by platform name ascending
fn ranked_by<F>(summaries: &[PlatformSummary], metric: F) -> Vec<Platform>
where
    F: Fn(&PlatformSummary) -> f64,
{
    let mut ordered: Vec<&PlatformSummary> = summaries.iter().collect();
    ordered.sort_by(|a, b| {
        metric(b)
            .partial_cmp(&metric(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.platform.as_str().cmp(b.platform.as_str()))
    });
    ordered.into_iter().map(|s| s.platform).collect()
}

pub fn insights(summary: &CrossPlatformSummary) -> Insights {
    Insights {
        by_roas: ranked_by(&summary.platforms, |s| s.roas),
        by_ctr: ranked_by(&summary.platforms, |s| s.ctr),
        by_spend: ranked_by(&summary.platforms, |s| s.spend),
    }
}
