// Meta webhook surface: subscription handshake and signed event delivery.
//
// Verification runs against the raw request bytes before anything parses
// the payload. After a valid signature the response is always 200; a sink
// failure must not trigger the sender's retry storm.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    api::routes::AppState,
    errors::{AppError, Result},
    webhook::{verify_signature, WebhookSink},
};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhooks/meta - subscription handshake
#[tracing::instrument(skip(state, params))]
pub async fn subscribe(
    State(state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> impl IntoResponse {
    let token_matches = params.verify_token.as_deref() == Some(&state.config.webhook.verify_token)
        && !state.config.webhook.verify_token.is_empty();

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        tracing::info!("Webhook subscription verified");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        tracing::warn!("Webhook subscription handshake rejected");
        (StatusCode::FORBIDDEN, String::new())
    }
}

/// POST /webhooks/meta - signed event delivery
#[tracing::instrument(skip(state, headers, body))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    dispatch(
        &state.config.webhook.app_secret,
        state.webhook_sink.as_ref(),
        signature,
        &body,
    )
    .await
}

/// Verify the signature over the raw bytes, then hand the payload to the
/// sink. The sink never sees an unverified event; once verified, the answer
/// is 200 no matter what the sink or the JSON parse does.
async fn dispatch(
    secret: &str,
    sink: &dyn WebhookSink,
    signature: Option<&str>,
    body: &[u8],
) -> Result<StatusCode> {
    if let Err(e) = verify_signature(body, signature, secret) {
        tracing::warn!(reason = e.0, "Webhook signature rejected");
        return Err(AppError::SignatureVerification);
    }

    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(payload) => {
            if let Err(e) = sink.handle(&payload).await {
                tracing::error!(error = %e, "Webhook sink failed");
            }
        }
        Err(e) => {
            // Authentic sender, unparseable body: acknowledge anyway
            tracing::warn!(error = %e, "Verified webhook payload was not valid JSON");
        }
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use ring::hmac;

    struct CountingSink {
        calls: AtomicUsize,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WebhookSink for CountingSink {
        async fn handle(&self, _payload: &serde_json::Value) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sign(body: &[u8], secret: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
        format!("sha256={}", hex::encode(hmac::sign(&key, body).as_ref()))
    }

    #[tokio::test]
    async fn test_bad_signature_is_401_and_never_reaches_sink() {
        let sink = CountingSink::new();
        let body = br#"{"object":"page","entry":[]}"#;

        let err = dispatch("s3cret", &sink, Some("sha256=00ff"), body)
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_is_401_and_never_reaches_sink() {
        let sink = CountingSink::new();

        let err = dispatch("s3cret", &sink, None, b"{}").await.unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_signature_dispatches_exactly_once() {
        let sink = CountingSink::new();
        let body = br#"{"object":"page","entry":[]}"#;
        let header = sign(body, "s3cret");

        let status = dispatch("s3cret", &sink, Some(&header), body)
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verified_but_invalid_json_still_acknowledged() {
        let sink = CountingSink::new();
        let body = b"not json at all";
        let header = sign(body, "s3cret");

        let status = dispatch("s3cret", &sink, Some(&header), body)
            .await
            .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
