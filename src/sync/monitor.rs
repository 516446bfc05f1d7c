// Periodic token health scan.
//
// The monitor classifies every connected account's token expiry, persists
// status transitions, and raises at most one alert per transition. It never
// refreshes tokens itself; refresh stays lazy in the vault. Ciphertext
// integrity is also the vault's job: stored credentials that fail decryption
// get the account revoked the next time a sync decrypts them, so the monitor
// only reads expiry metadata and never touches key material.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::db::Store;
use crate::domain::{AccountStatus, AdAccount, TokenHealth};
use crate::errors::Result;

pub struct TokenMonitor {
    store: Arc<dyn Store>,
    interval: Duration,
}

impl TokenMonitor {
    pub fn new(store: Arc<dyn Store>, interval_seconds: u64) -> Self {
        Self {
            store,
            interval: Duration::from_secs(interval_seconds),
        }
    }

    /// Run forever on the configured cadence. Spawned as a background task.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(interval_seconds = self.interval.as_secs(), "Token monitor started");
        loop {
            interval.tick().await;
            if let Err(e) = self.scan_once().await {
                tracing::error!(error = %e, "Token monitor scan failed");
            }
        }
    }

    /// One full pass over all accounts
    pub async fn scan_once(&self) -> Result<()> {
        let accounts = self.store.all_accounts().await?;
        let now = Utc::now();

        for account in &accounts {
            // Disconnected accounts have nothing to classify
            if matches!(
                account.status,
                AccountStatus::NotConnected | AccountStatus::Revoked
            ) {
                continue;
            }
            self.check_account(account, now).await?;
        }

        Ok(())
    }

    async fn check_account(
        &self,
        account: &AdAccount,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let health = TokenHealth::classify(account.token_expires_at, now);
        let new_status = health.as_account_status();

        if new_status != account.status {
            self.store
                .update_account_status(account.id, new_status)
                .await?;
        }

        // One alert per transition: a status we already alerted on stays
        // quiet until the account changes state again.
        if account.last_alerted_status == Some(new_status) {
            return Ok(());
        }

        match new_status {
            AccountStatus::ExpiringSoon | AccountStatus::Expired => {
                tracing::warn!(
                    alert = "token_expiry",
                    account_id = %account.id,
                    tenant_id = %account.tenant_id,
                    platform = %account.platform,
                    status = new_status.as_str(),
                    expires_at = ?account.token_expires_at,
                    "Account token needs attention"
                );
                self.store
                    .update_last_alerted(account.id, new_status)
                    .await?;
            }
            // Recovery resets the dedupe marker so a later expiry alerts again
            AccountStatus::Active => {
                if account.last_alerted_status.is_some() {
                    self.store
                        .update_last_alerted(account.id, new_status)
                        .await?;
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    use crate::db::store::mem::MemStore;
    use crate::domain::Platform;

    fn account(status: AccountStatus, expires_in: Option<ChronoDuration>) -> AdAccount {
        AdAccount {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            platform: Platform::GoogleAds,
            account_id: "123".to_string(),
            account_name: "Test".to_string(),
            status,
            encrypted_access_token: Some(vec![1, 2, 3]),
            encrypted_refresh_token: None,
            token_expires_at: expires_in.map(|d| Utc::now() + d),
            last_alerted_status: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_expiring_account_transitions_and_alerts_once() {
        let acct = account(AccountStatus::Active, Some(ChronoDuration::days(3)));
        let id = acct.id;
        let store = Arc::new(MemStore::with_accounts(vec![acct]));
        let monitor = TokenMonitor::new(store.clone(), 60);

        monitor.scan_once().await.unwrap();
        let after_first = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(after_first.status, AccountStatus::ExpiringSoon);
        assert_eq!(after_first.last_alerted_status, Some(AccountStatus::ExpiringSoon));

        // Second scan sees the same classification and stays quiet
        monitor.scan_once().await.unwrap();
        let after_second = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(after_second.last_alerted_status, Some(AccountStatus::ExpiringSoon));
    }

    #[tokio::test]
    async fn test_expired_after_expiring_alerts_again() {
        let mut acct = account(AccountStatus::ExpiringSoon, Some(-ChronoDuration::hours(1)));
        acct.last_alerted_status = Some(AccountStatus::ExpiringSoon);
        let id = acct.id;
        let store = Arc::new(MemStore::with_accounts(vec![acct]));
        let monitor = TokenMonitor::new(store.clone(), 60);

        monitor.scan_once().await.unwrap();
        let after = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(after.status, AccountStatus::Expired);
        assert_eq!(after.last_alerted_status, Some(AccountStatus::Expired));
    }

    #[tokio::test]
    async fn test_recovery_resets_alert_dedupe() {
        let mut acct = account(AccountStatus::Expired, Some(ChronoDuration::days(30)));
        acct.last_alerted_status = Some(AccountStatus::Expired);
        let id = acct.id;
        let store = Arc::new(MemStore::with_accounts(vec![acct]));
        let monitor = TokenMonitor::new(store.clone(), 60);

        monitor.scan_once().await.unwrap();
        let after = store.get_account(id).await.unwrap().unwrap();
        assert_eq!(after.status, AccountStatus::Active);
        assert_eq!(after.last_alerted_status, Some(AccountStatus::Active));
    }

    #[tokio::test]
    async fn test_revoked_accounts_are_skipped() {
        let acct = account(AccountStatus::Revoked, None);
        let id = acct.id;
        let store = Arc::new(MemStore::with_accounts(vec![acct]));
        let monitor = TokenMonitor::new(store.clone(), 60);

        monitor.scan_once().await.unwrap();
        let after = store.get_account(id).await.unwrap().unwrap();
        // Revocation is terminal until the tenant reconnects
        assert_eq!(after.status, AccountStatus::Revoked);
        assert_eq!(after.last_alerted_status, None);
    }
}
