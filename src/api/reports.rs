// Cross-platform reporting endpoint

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    aggregate::{self, CrossPlatformSummary, Insights},
    api::routes::{tenant_id, AppState},
    domain::{DateRange, Platform},
    errors::{AppError, Result},
    sync::scheduled_range,
};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: CrossPlatformSummary,
    pub insights: Insights,
}

/// GET /v1/reports/summary?from&to
/// Per-platform and total summaries with deterministic rankings. Defaults
/// to the configured lookback window when the range is omitted.
#[tracing::instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SummaryParams>,
) -> Result<impl IntoResponse> {
    let tenant_id = tenant_id(&headers)?;

    let default_range = scheduled_range(state.config.sync.lookback_days);
    let range = DateRange {
        start: params.from.unwrap_or(default_range.start),
        end: params.to.unwrap_or(default_range.end),
    };
    if range.start > range.end {
        return Err(AppError::Validation(
            "from must not be after to".to_string(),
        ));
    }

    let metrics = state.store.metrics_for_tenant(tenant_id, range).await?;
    let campaigns = state.store.campaigns_for_tenant(tenant_id).await?;
    let campaign_platforms: HashMap<Uuid, Platform> =
        campaigns.iter().map(|c| (c.id, c.platform)).collect();

    let summary = aggregate::summarize(&metrics, &campaign_platforms, range);
    let insights = aggregate::insights(&summary);

    Ok(Json(SummaryResponse { summary, insights }))
}
