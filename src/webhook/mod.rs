pub mod verify;

use async_trait::async_trait;

pub use verify::verify_signature;

/// Downstream consumer of verified webhook events. The real handler lives
/// outside this service; dispatch failures are logged, never re-signalled to
/// the sender.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value) -> crate::errors::Result<()>;
}

/// Default sink that just records the event
pub struct LoggingSink;

#[async_trait]
impl WebhookSink for LoggingSink {
    async fn handle(&self, payload: &serde_json::Value) -> crate::errors::Result<()> {
        let object = payload
            .get("object")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        tracing::info!(object = %object, "Verified webhook event received");
        Ok(())
    }
}
