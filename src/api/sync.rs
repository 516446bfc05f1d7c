// Manual sync trigger

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    api::routes::{tenant_id, AppState},
    domain::{DateRange, SyncRun},
    errors::{AppError, Result},
    sync::{scheduled_range, SyncJob},
};

/// How many recent runs the audit endpoint returns
const RUN_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct SyncQueuedResponse {
    pub status: &'static str,
    pub range: DateRange,
}

/// POST /v1/sync
/// Enqueues a sync job for the tenant. An explicit date range in the body
/// overrides the default lookback window.
#[tracing::instrument(skip(state, body))]
pub async fn trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<SyncRequest>>,
) -> Result<impl IntoResponse> {
    let tenant_id = tenant_id(&headers)?;

    let range = match body {
        Some(Json(request)) => {
            if request.from > request.to {
                return Err(AppError::Validation(
                    "from must not be after to".to_string(),
                ));
            }
            DateRange {
                start: request.from,
                end: request.to,
            }
        }
        None => scheduled_range(state.config.sync.lookback_days),
    };

    state.queue.enqueue(SyncJob { tenant_id, range })?;
    tracing::info!(tenant_id = %tenant_id, "Manual sync queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncQueuedResponse {
            status: "queued",
            range,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct SyncRunsResponse {
    pub runs: Vec<SyncRun>,
}

/// GET /v1/sync/runs
/// Most recent sync attempts for the tenant, newest first.
#[tracing::instrument(skip(state))]
pub async fn runs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let tenant_id = tenant_id(&headers)?;
    let runs = state
        .store
        .recent_sync_runs(tenant_id, RUN_HISTORY_LIMIT)
        .await?;
    Ok(Json(SyncRunsResponse { runs }))
}
