// Single-use CSRF state tokens for the OAuth connect flow

use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Platform;
use crate::errors::{AppError, Result};

const STATE_PREFIX: &str = "oauth:state:";

/// TTL for a pending authorization (10 minutes)
const STATE_TTL_SECONDS: u64 = 600;

/// The in-flight authorization request a state token is bound to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConnect {
    pub tenant_id: Uuid,
    pub platform: Platform,
    /// Platform-native account identifier the tenant is connecting
    pub account_id: String,
    pub account_name: Option<String>,
}

/// Issues and consumes opaque single-use correlation tokens, stored in
/// Redis with a short TTL. Consumption is atomic (GETDEL), so a replayed
/// callback can never match twice.
#[derive(Clone)]
pub struct StateStore {
    redis: ConnectionManager,
}

impl StateStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Generate a random state parameter for CSRF protection
    pub fn generate_state() -> String {
        let bytes: [u8; 32] = rand::random();
        hex::encode(bytes)
    }

    /// Issue a state token bound to the pending connect request
    pub async fn issue(&self, pending: &PendingConnect) -> Result<String> {
        let state = Self::generate_state();
        let key = format!("{}{}", STATE_PREFIX, state);
        let value = serde_json::to_string(pending)
            .map_err(|e| AppError::Internal(format!("Failed to serialize state: {}", e)))?;

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&key, value, STATE_TTL_SECONDS).await?;

        Ok(state)
    }

    /// Verify and consume a state token. Unknown, expired, or already-used
    /// tokens are a hard failure.
    pub async fn consume(&self, state: &str) -> Result<PendingConnect> {
        let key = format!("{}{}", STATE_PREFIX, state);

        let mut conn = self.redis.clone();
        let value: Option<String> = redis::cmd("GETDEL").arg(&key).query_async(&mut conn).await?;

        match value {
            Some(v) => {
                serde_json::from_str(&v).map_err(|_| AppError::InvalidOAuthState)
            }
            None => Err(AppError::InvalidOAuthState),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_states_are_unique_and_opaque() {
        let a = StateStore::generate_state();
        let b = StateStore::generate_state();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_issue_and_consume_once() {
        let client = redis::Client::open("redis://localhost:6379").unwrap();
        let manager = ConnectionManager::new(client).await.unwrap();
        let store = StateStore::new(manager);

        let tenant = Uuid::new_v4();
        let state = store
            .issue(&PendingConnect {
                tenant_id: tenant,
                platform: Platform::GoogleAds,
                account_id: "123-456-7890".to_string(),
                account_name: Some("Main".to_string()),
            })
            .await
            .unwrap();

        let pending = store.consume(&state).await.unwrap();
        assert_eq!(pending.tenant_id, tenant);
        assert_eq!(pending.platform, Platform::GoogleAds);
        assert_eq!(pending.account_id, "123-456-7890");

        // Second consumption must fail
        assert!(store.consume(&state).await.is_err());
    }
}
