// Drives one tenant's sync: fan out over connected accounts, pull each
// platform through its adapter, persist the canonical rows, and record a
// SyncRun per account.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::{AdapterCredentials, PlatformAdapter, PlatformError};
use crate::config::SyncConfig;
use crate::db::Store;
use crate::domain::{
    AdAccount, DateRange, MetricRecord, NormalizedMetric, Platform, SyncRun, SyncStatus,
};
use crate::errors::{AppError, Result};
use crate::rate_limit::RateLimiter;
use crate::vault::TokenVault;

/// Tenant-level outcome of one sync pass
#[derive(Debug, Serialize)]
pub struct TenantSyncReport {
    pub tenant_id: Uuid,
    pub status: SyncStatus,
    pub runs: Vec<SyncRun>,
}

pub struct SyncOrchestrator {
    store: Arc<dyn Store>,
    vault: Arc<TokenVault>,
    limiter: Arc<RateLimiter>,
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    max_parallel_accounts: usize,
    retry_backoff: Duration,
    google_developer_token: Option<String>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        vault: Arc<TokenVault>,
        limiter: Arc<RateLimiter>,
        adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
        config: &SyncConfig,
        google_developer_token: Option<String>,
    ) -> Self {
        Self {
            store,
            vault,
            limiter,
            adapters,
            max_parallel_accounts: config.max_parallel_accounts.max(1),
            retry_backoff: Duration::from_secs(config.retry_backoff_seconds),
            google_developer_token,
        }
    }

    /// Sync every connected account the tenant has, in parallel up to the
    /// configured bound. One account's failure never aborts its siblings.
    pub async fn sync_tenant(
        &self,
        tenant_id: Uuid,
        range: DateRange,
    ) -> Result<TenantSyncReport> {
        let accounts: Vec<AdAccount> = self
            .store
            .accounts_for_tenant(tenant_id)
            .await?
            .into_iter()
            .filter(AdAccount::is_connected)
            .collect();

        tracing::info!(
            tenant_id = %tenant_id,
            accounts = accounts.len(),
            start = %range.start,
            end = %range.end,
            "Starting tenant sync"
        );

        let runs: Vec<SyncRun> = stream::iter(accounts)
            .map(|account| async move { self.sync_account(&account, range).await })
            .buffer_unordered(self.max_parallel_accounts)
            .collect()
            .await;

        let succeeded = runs
            .iter()
            .filter(|r| r.status == SyncStatus::Success)
            .count();
        let failed = runs.len() - succeeded;
        let status = SyncStatus::rollup(succeeded, failed);

        tracing::info!(
            tenant_id = %tenant_id,
            succeeded,
            failed,
            status = status.as_str(),
            "Tenant sync finished"
        );

        Ok(TenantSyncReport {
            tenant_id,
            status,
            runs,
        })
    }

    /// Run one account's sync and record the outcome. Errors are folded
    /// into the SyncRun, never propagated.
    async fn sync_account(&self, account: &AdAccount, range: DateRange) -> SyncRun {
        let started_at = Utc::now();
        let (status, error) = match self.run_account_sync(account, &range).await {
            Ok(()) => (SyncStatus::Success, None),
            Err(e) => {
                tracing::warn!(
                    account_id = %account.id,
                    platform = %account.platform,
                    error = %e,
                    "Account sync failed"
                );
                (SyncStatus::Failed, Some(e.to_string()))
            }
        };

        let run = SyncRun {
            id: Uuid::new_v4(),
            tenant_id: account.tenant_id,
            platform: account.platform,
            account_id: account.account_id.clone(),
            started_at,
            finished_at: Utc::now(),
            status,
            error,
        };

        if let Err(e) = self.store.insert_sync_run(&run).await {
            tracing::error!(account_id = %account.id, error = %e, "Failed to record sync run");
        }

        run
    }

    async fn run_account_sync(&self, account: &AdAccount, range: &DateRange) -> Result<()> {
        let adapter = self
            .adapters
            .get(&account.platform)
            .ok_or_else(|| AppError::Internal(format!("no adapter for {}", account.platform)))?;

        let token = self.vault.valid_access_token(account).await?;
        let mut credentials = self.credentials(account, token);

        self.limiter.acquire(account.platform).await?;
        let raw = match adapter.fetch_raw(&credentials, range).await {
            Ok(raw) => raw,
            // Upstream 429: back off once, then retry through the limiter
            Err(PlatformError::RateLimited { .. }) => {
                tracing::info!(
                    account_id = %account.id,
                    platform = %account.platform,
                    "Upstream rate limited, backing off before retry"
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.limiter.acquire(account.platform).await?;
                adapter.fetch_raw(&credentials, range).await?
            }
            // 401/403: the stored token may be stale; force one refresh
            Err(PlatformError::Auth { .. }) => {
                tracing::info!(
                    account_id = %account.id,
                    platform = %account.platform,
                    "Auth rejected, forcing token refresh"
                );
                credentials.access_token = self.vault.force_refresh(account).await?;
                self.limiter.acquire(account.platform).await?;
                adapter.fetch_raw(&credentials, range).await?
            }
            Err(e) => return Err(e.into()),
        };

        let batch = adapter.normalize(&raw, range.end)?;
        let mapping = self
            .store
            .upsert_campaigns(account.tenant_id, account.platform, &batch.campaigns)
            .await?;
        let records = resolve_metrics(&batch.metrics, &mapping);
        self.store.replace_metrics(&records).await?;

        tracing::info!(
            account_id = %account.id,
            platform = %account.platform,
            campaigns = batch.campaigns.len(),
            metric_rows = records.len(),
            "Account synced"
        );

        Ok(())
    }

    fn credentials(&self, account: &AdAccount, access_token: String) -> AdapterCredentials {
        let developer_token = match account.platform {
            Platform::GoogleAds => self.google_developer_token.clone(),
            _ => None,
        };
        AdapterCredentials {
            access_token,
            account_id: account.account_id.clone(),
            developer_token,
        }
    }
}

/// Resolve adapter metric rows against the campaign id mapping from the
/// upsert. A metric referencing a campaign the upsert never saw is dropped,
/// not an error.
fn resolve_metrics(
    metrics: &[NormalizedMetric],
    mapping: &HashMap<String, Uuid>,
) -> Vec<MetricRecord> {
    metrics
        .iter()
        .filter_map(|m| match mapping.get(&m.campaign_id) {
            Some(&campaign_id) => Some(MetricRecord {
                campaign_id,
                date: m.date,
                impressions: m.impressions,
                clicks: m.clicks,
                conversions: m.conversions,
                spend: m.spend,
                revenue: m.revenue,
            }),
            None => {
                tracing::warn!(
                    campaign_id = %m.campaign_id,
                    date = %m.date,
                    "Dropping metric row for unknown campaign"
                );
                None
            }
        })
        .collect()
}
