// Account listing and disconnect endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    api::routes::{parse_platform, tenant_id, AppState},
    domain::{AccountStatus, Platform},
    errors::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct AccountEntry {
    pub platform: Platform,
    pub status: AccountStatus,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountEntry>,
}

/// GET /v1/accounts
/// Connection status for every supported platform, connected or not.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let tenant_id = tenant_id(&headers)?;
    let connected = state.store.accounts_for_tenant(tenant_id).await?;

    let accounts = Platform::ALL
        .into_iter()
        .map(|platform| {
            match connected.iter().find(|a| a.platform == platform) {
                Some(account) => AccountEntry {
                    platform,
                    status: account.status,
                    account_id: Some(account.account_id.clone()),
                    account_name: Some(account.account_name.clone()),
                    token_expires_at: account.token_expires_at,
                },
                None => AccountEntry {
                    platform,
                    status: AccountStatus::NotConnected,
                    account_id: None,
                    account_name: None,
                    token_expires_at: None,
                },
            }
        })
        .collect();

    Ok(Json(AccountListResponse { accounts }))
}

/// DELETE /v1/accounts/:platform
/// Clears tokens and marks the connection revoked. The row survives.
#[tracing::instrument(skip(state))]
pub async fn disconnect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let platform = parse_platform(&platform)?;
    let tenant_id = tenant_id(&headers)?;

    state
        .store
        .account_for_platform(tenant_id, platform)
        .await?
        .ok_or(AppError::AccountNotConnected)?;

    state.store.disconnect_account(tenant_id, platform).await?;

    Ok(StatusCode::NO_CONTENT)
}
