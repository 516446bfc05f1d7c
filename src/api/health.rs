use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::api::routes::AppState;

/// GET /health/live - Liveness probe
#[tracing::instrument(skip(state))]
pub async fn liveness(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.health_checker.liveness().await;
    Json(status)
}

/// GET /health/ready - Readiness probe
#[tracing::instrument(skip(state))]
pub async fn readiness(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let status = state.health_checker.readiness().await;

    if status.status == "ok" {
        Ok(Json(status))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
