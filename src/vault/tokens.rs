use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::Store;
use crate::domain::{AccountStatus, AdAccount, Platform};
use crate::errors::{AppError, Result};
use crate::oauth::OAuthClient;
use crate::vault::cipher::{Cipher, VaultError};

/// Manages OAuth token lifecycle: decryption for use, lazy refresh near
/// expiry, and revocation on unusable credentials.
///
/// Refresh is serialized per account. Some providers rotate the refresh
/// token on every grant, so a concurrent duplicate refresh would strand the
/// account; a second caller arriving mid-refresh waits and reuses the
/// refreshed row instead of issuing its own grant.
pub struct TokenVault {
    cipher: Cipher,
    store: Arc<dyn Store>,
    oauth: Arc<OAuthClient>,
    refresh_threshold: Duration,
    refresh_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TokenVault {
    pub fn new(
        cipher: Cipher,
        store: Arc<dyn Store>,
        oauth: Arc<OAuthClient>,
        refresh_threshold_seconds: i64,
    ) -> Self {
        Self {
            cipher,
            store,
            oauth,
            refresh_threshold: Duration::seconds(refresh_threshold_seconds),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Return a usable access token for the account, refreshing first if the
    /// stored token is within the refresh threshold or already expired.
    pub async fn valid_access_token(&self, account: &AdAccount) -> Result<String> {
        if !self.needs_refresh(account) {
            return self.decrypt_access(account).await;
        }
        self.refresh_account(account, false).await
    }

    /// Refresh regardless of the stored expiry. Used by the orchestrator's
    /// single retry after an upstream 401/403.
    pub async fn force_refresh(&self, account: &AdAccount) -> Result<String> {
        self.refresh_account(account, true).await
    }

    fn needs_refresh(&self, account: &AdAccount) -> bool {
        match account.token_expires_at {
            Some(expires_at) => expires_at - Utc::now() <= self.refresh_threshold,
            None => true,
        }
    }

    async fn refresh_account(&self, account: &AdAccount, force: bool) -> Result<String> {
        let lock = self.account_lock(account.id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent caller may have finished the
        // refresh while we waited, and its rotated refresh token is the only
        // valid one now.
        let current = self
            .store
            .get_account(account.id)
            .await?
            .ok_or(AppError::AccountNotConnected)?;

        let already_refreshed = current.token_expires_at != account.token_expires_at;
        if already_refreshed || (!force && !self.needs_refresh(&current)) {
            return self.decrypt_access(&current).await;
        }

        // Meta has no refresh token; the long-lived token itself is the
        // exchange input. Everyone else uses the stored refresh token.
        let grant_input = match current.platform {
            Platform::MetaAds => self.decrypt_access(&current).await?,
            _ => {
                let ciphertext = current
                    .encrypted_refresh_token
                    .as_deref()
                    .ok_or_else(|| self.needs_reconnect("no refresh token on record"))?;
                self.decrypt_field(&current, ciphertext).await?
            }
        };

        let refreshed = match self.oauth.refresh(current.platform, &grant_input).await {
            Ok(token) => token,
            Err(e) => {
                // Provider rejected the grant: the account needs a reconnect
                tracing::warn!(
                    account_id = %current.id,
                    platform = %current.platform,
                    "Token refresh rejected by provider"
                );
                self.store
                    .update_account_status(current.id, AccountStatus::Expired)
                    .await?;
                return Err(AppError::Vault(VaultError::Refresh(e.to_string())));
            }
        };

        let expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);
        let enc_access = self.cipher.encrypt(refreshed.access_token.as_bytes())?;
        let enc_refresh = match &refreshed.refresh_token {
            Some(t) => Some(self.cipher.encrypt(t.as_bytes())?),
            // Keep the previous refresh token when the provider omits one
            None => current.encrypted_refresh_token.clone(),
        };

        self.store
            .update_account_tokens(current.id, &enc_access, enc_refresh.as_deref(), expires_at)
            .await?;

        tracing::info!(
            account_id = %current.id,
            platform = %current.platform,
            "Access token refreshed"
        );

        Ok(refreshed.access_token)
    }

    async fn decrypt_access(&self, account: &AdAccount) -> Result<String> {
        let ciphertext = account
            .encrypted_access_token
            .as_deref()
            .ok_or(AppError::AccountNotConnected)?;
        self.decrypt_field(account, ciphertext).await
    }

    /// Decrypt one token field; failure means the credentials are unusable,
    /// so the account transitions to revoked before the error surfaces.
    async fn decrypt_field(&self, account: &AdAccount, ciphertext: &[u8]) -> Result<String> {
        match self.cipher.decrypt_str(ciphertext) {
            Ok(token) => Ok(token),
            Err(VaultError::Decryption) => {
                tracing::error!(
                    account_id = %account.id,
                    platform = %account.platform,
                    "Stored credentials failed decryption, revoking account"
                );
                self.store
                    .update_account_status(account.id, AccountStatus::Revoked)
                    .await?;
                Err(AppError::Vault(VaultError::Decryption))
            }
            Err(e) => Err(AppError::Vault(e)),
        }
    }

    fn needs_reconnect(&self, reason: &str) -> AppError {
        AppError::Vault(VaultError::Refresh(reason.to_string()))
    }

    async fn account_lock(&self, account_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks.entry(account_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    use crate::config::{OAuthAppConfig, OAuthConfig};
    use crate::db::store::mem::MemStore;

    const TEST_KEY: &str = "2222222222222222222222222222222222222222222222222222222222222222";

    fn oauth_config() -> OAuthConfig {
        let app = OAuthAppConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            developer_token: None,
        };
        OAuthConfig {
            google: app.clone(),
            meta: app.clone(),
            linkedin: app,
        }
    }

    fn account(encrypted_access_token: Option<Vec<u8>>) -> AdAccount {
        AdAccount {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            platform: Platform::GoogleAds,
            account_id: "acct-1".to_string(),
            account_name: "Test Account".to_string(),
            status: AccountStatus::Active,
            encrypted_access_token,
            encrypted_refresh_token: None,
            // Far enough out that no refresh is attempted
            token_expires_at: Some(Utc::now() + ChronoDuration::hours(12)),
            last_alerted_status: None,
            metadata: serde_json::json!({}),
        }
    }

    fn vault(store: Arc<MemStore>) -> TokenVault {
        let cipher = Cipher::from_hex_key(TEST_KEY).unwrap();
        let oauth = Arc::new(OAuthClient::new(oauth_config()).unwrap());
        TokenVault::new(cipher, store, oauth, 300)
    }

    #[tokio::test]
    async fn test_fresh_token_decrypts_without_refresh() {
        let cipher = Cipher::from_hex_key(TEST_KEY).unwrap();
        let acct = account(Some(cipher.encrypt(b"ya29.live-token").unwrap()));
        let store = Arc::new(MemStore::with_accounts(vec![acct.clone()]));

        let token = vault(store).valid_access_token(&acct).await.unwrap();
        assert_eq!(token, "ya29.live-token");
    }

    #[tokio::test]
    async fn test_corrupt_ciphertext_revokes_account() {
        // Bytes that were never produced by the cipher
        let acct = account(Some(vec![0u8; 24]));
        let id = acct.id;
        let store = Arc::new(MemStore::with_accounts(vec![acct.clone()]));

        let err = vault(store.clone())
            .valid_access_token(&acct)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Vault(VaultError::Decryption)));

        let after = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(after.status, AccountStatus::Revoked);
    }

    #[tokio::test]
    async fn test_missing_access_token_is_not_connected() {
        let acct = account(None);
        let store = Arc::new(MemStore::with_accounts(vec![acct.clone()]));

        let err = vault(store).valid_access_token(&acct).await.unwrap_err();
        assert!(matches!(err, AppError::AccountNotConnected));
    }
}
