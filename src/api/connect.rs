// OAuth connect flow endpoints: the authorize redirect and the provider
// callback that lands the encrypted credentials.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::routes::{parse_platform, tenant_id, AppState},
    domain::{AccountStatus, AdAccount, Platform},
    errors::{AppError, Result},
    oauth::PendingConnect,
    sync::{scheduled_range, SyncJob},
};

/// Cookie echoing the CSRF state so the callback can bind the browser
/// session to the Redis-stored token.
const STATE_COOKIE: &str = "adsync_oauth_state";

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub account_id: String,
    pub account_name: Option<String>,
}

/// GET /v1/connect/:platform
/// Issues the CSRF state and redirects to the provider's consent screen.
#[tracing::instrument(skip(state, params))]
pub async fn connect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
) -> Result<impl IntoResponse> {
    let platform = parse_platform(&platform)?;
    let tenant_id = tenant_id(&headers)?;

    if params.account_id.trim().is_empty() {
        return Err(AppError::Validation("account_id is required".to_string()));
    }

    let pending = PendingConnect {
        tenant_id,
        platform,
        account_id: params.account_id,
        account_name: params.account_name,
    };
    let state_token = state.state_store.issue(&pending).await?;
    let url = state.oauth.authorize_url(platform, &state_token)?;

    tracing::info!(tenant_id = %tenant_id, platform = %platform, "OAuth connect initiated");

    let cookie = format!(
        "{}={}; Max-Age=600; Path=/; HttpOnly; SameSite=Lax",
        STATE_COOKIE, state_token
    );
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::temporary(&url),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectedResponse {
    pub platform: Platform,
    pub account_id: String,
    pub status: AccountStatus,
}

/// GET /v1/oauth/:platform/callback
/// Validates and consumes the CSRF state, exchanges the code, stores the
/// encrypted tokens, and queues the account's first sync.
#[tracing::instrument(skip(state, params))]
pub async fn callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse> {
    let platform = parse_platform(&platform)?;

    // The browser must echo the exact state we set at connect time
    let cookie_state = state_cookie(&headers).ok_or(AppError::InvalidOAuthState)?;
    if cookie_state != params.state {
        tracing::warn!(platform = %platform, "OAuth state cookie mismatch");
        return Err(AppError::InvalidOAuthState);
    }

    let pending = state.state_store.consume(&params.state).await?;
    if pending.platform != platform {
        return Err(AppError::InvalidOAuthState);
    }

    let token = state.oauth.exchange_code(platform, &params.code).await?;

    let cipher = state.vault.cipher();
    let encrypted_access_token = cipher.encrypt(token.access_token.as_bytes())?;
    let encrypted_refresh_token = match &token.refresh_token {
        Some(t) => Some(cipher.encrypt(t.as_bytes())?),
        None => None,
    };

    let account = AdAccount {
        id: Uuid::new_v4(),
        tenant_id: pending.tenant_id,
        platform,
        account_id: pending.account_id.clone(),
        account_name: pending
            .account_name
            .unwrap_or_else(|| pending.account_id.clone()),
        status: AccountStatus::Active,
        encrypted_access_token: Some(encrypted_access_token),
        encrypted_refresh_token,
        token_expires_at: Some(Utc::now() + Duration::seconds(token.expires_in)),
        last_alerted_status: None,
        metadata: serde_json::json!({}),
    };
    state.store.upsert_account(&account).await?;

    tracing::info!(
        tenant_id = %pending.tenant_id,
        platform = %platform,
        "Account connected"
    );

    // Kick off the first sync; a full queue is not a connect failure
    let range = scheduled_range(state.config.sync.lookback_days);
    if let Err(e) = state.queue.enqueue(SyncJob {
        tenant_id: pending.tenant_id,
        range,
    }) {
        tracing::warn!(tenant_id = %pending.tenant_id, error = %e, "Initial sync not queued");
    }

    let expired_cookie = format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", STATE_COOKIE);
    Ok((
        [(header::SET_COOKIE, expired_cookie)],
        Json(ConnectedResponse {
            platform,
            account_id: account.account_id,
            status: account.status,
        }),
    ))
}

fn state_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == STATE_COOKIE).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_state_cookie_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(state_cookie(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; adsync_oauth_state=abc123; x=y"),
        );
        assert_eq!(state_cookie(&headers), Some("abc123".to_string()));
    }
}
