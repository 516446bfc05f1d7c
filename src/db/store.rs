// Repository trait over the persistence layer.
//
// The orchestrator, vault, and monitor take `Arc<dyn Store>` so their
// behavior can be tested against an in-memory double without Postgres.
// `PgStore` is the production implementation and delegates to the query
// modules in this directory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{accounts, campaigns, sync_runs};
use crate::domain::{
    AccountStatus, AdAccount, Campaign, DateRange, MetricRecord, NormalizedCampaign, Platform,
    SyncRun,
};
use crate::errors::Result;

#[async_trait]
pub trait Store: Send + Sync {
    // Accounts
    async fn get_account(&self, id: Uuid) -> Result<Option<AdAccount>>;
    async fn account_for_platform(
        &self,
        tenant_id: Uuid,
        platform: Platform,
    ) -> Result<Option<AdAccount>>;
    async fn accounts_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<AdAccount>>;
    async fn all_accounts(&self) -> Result<Vec<AdAccount>>;
    async fn tenants_with_accounts(&self) -> Result<Vec<Uuid>>;
    async fn upsert_account(&self, account: &AdAccount) -> Result<()>;
    async fn update_account_tokens(
        &self,
        id: Uuid,
        encrypted_access_token: &[u8],
        encrypted_refresh_token: Option<&[u8]>,
        token_expires_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn update_account_status(&self, id: Uuid, status: AccountStatus) -> Result<()>;
    async fn update_last_alerted(&self, id: Uuid, status: AccountStatus) -> Result<()>;
    async fn disconnect_account(&self, tenant_id: Uuid, platform: Platform) -> Result<()>;

    // Campaigns and metrics
    async fn upsert_campaigns(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        campaigns: &[NormalizedCampaign],
    ) -> Result<HashMap<String, Uuid>>;
    async fn replace_metrics(&self, records: &[MetricRecord]) -> Result<()>;
    async fn campaigns_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Campaign>>;
    async fn metrics_for_tenant(&self, tenant_id: Uuid, range: DateRange)
        -> Result<Vec<MetricRecord>>;

    // Sync runs
    async fn insert_sync_run(&self, run: &SyncRun) -> Result<()>;
    async fn recent_sync_runs(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<SyncRun>>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<AdAccount>> {
        accounts::get_by_id(&self.pool, id).await
    }

    async fn account_for_platform(
        &self,
        tenant_id: Uuid,
        platform: Platform,
    ) -> Result<Option<AdAccount>> {
        accounts::get_for_platform(&self.pool, tenant_id, platform).await
    }

    async fn accounts_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<AdAccount>> {
        accounts::list_for_tenant(&self.pool, tenant_id).await
    }

    async fn all_accounts(&self) -> Result<Vec<AdAccount>> {
        accounts::list_all(&self.pool).await
    }

    async fn tenants_with_accounts(&self) -> Result<Vec<Uuid>> {
        accounts::tenants_with_accounts(&self.pool).await
    }

    async fn upsert_account(&self, account: &AdAccount) -> Result<()> {
        accounts::upsert(&self.pool, account).await
    }

    async fn update_account_tokens(
        &self,
        id: Uuid,
        encrypted_access_token: &[u8],
        encrypted_refresh_token: Option<&[u8]>,
        token_expires_at: DateTime<Utc>,
    ) -> Result<()> {
        accounts::update_tokens(
            &self.pool,
            id,
            encrypted_access_token,
            encrypted_refresh_token,
            token_expires_at,
        )
        .await
    }

    async fn update_account_status(&self, id: Uuid, status: AccountStatus) -> Result<()> {
        accounts::update_status(&self.pool, id, status).await
    }

    async fn update_last_alerted(&self, id: Uuid, status: AccountStatus) -> Result<()> {
        accounts::update_last_alerted(&self.pool, id, status).await
    }

    async fn disconnect_account(&self, tenant_id: Uuid, platform: Platform) -> Result<()> {
        accounts::disconnect(&self.pool, tenant_id, platform).await
    }

    async fn upsert_campaigns(
        &self,
        tenant_id: Uuid,
        platform: Platform,
        normalized: &[NormalizedCampaign],
    ) -> Result<HashMap<String, Uuid>> {
        campaigns::upsert_campaigns(&self.pool, tenant_id, platform, normalized).await
    }

    async fn replace_metrics(&self, records: &[MetricRecord]) -> Result<()> {
        campaigns::replace_metrics(&self.pool, records).await
    }

    async fn campaigns_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Campaign>> {
        campaigns::list_for_tenant(&self.pool, tenant_id).await
    }

    async fn metrics_for_tenant(
        &self,
        tenant_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<MetricRecord>> {
        campaigns::metrics_for_tenant(&self.pool, tenant_id, range).await
    }

    async fn insert_sync_run(&self, run: &SyncRun) -> Result<()> {
        sync_runs::insert(&self.pool, run).await
    }

    async fn recent_sync_runs(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<SyncRun>> {
        sync_runs::recent_for_tenant(&self.pool, tenant_id, limit).await
    }
}

/// In-memory Store for unit tests
#[cfg(test)]
pub mod mem {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        accounts: Vec<AdAccount>,
        campaigns: Vec<Campaign>,
        metrics: HashMap<(Uuid, chrono::NaiveDate), MetricRecord>,
        sync_runs: Vec<SyncRun>,
    }

    #[derive(Default)]
    pub struct MemStore {
        inner: Mutex<Inner>,
    }

    impl MemStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_accounts(accounts: Vec<AdAccount>) -> Self {
            let store = Self::default();
            store.inner.lock().unwrap().accounts = accounts;
            store
        }

        pub fn metric_rows(&self) -> Vec<MetricRecord> {
            self.inner.lock().unwrap().metrics.values().cloned().collect()
        }

        pub fn sync_runs(&self) -> Vec<SyncRun> {
            self.inner.lock().unwrap().sync_runs.clone()
        }
    }

    #[async_trait]
    impl Store for MemStore {
        async fn get_account(&self, id: Uuid) -> Result<Option<AdAccount>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .accounts
                .iter()
                .find(|a| a.id == id)
                .cloned())
        }

        async fn account_for_platform(
            &self,
            tenant_id: Uuid,
            platform: Platform,
        ) -> Result<Option<AdAccount>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .accounts
                .iter()
                .find(|a| a.tenant_id == tenant_id && a.platform == platform)
                .cloned())
        }

        async fn accounts_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<AdAccount>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .accounts
                .iter()
                .filter(|a| a.tenant_id == tenant_id)
                .cloned()
                .collect())
        }

        async fn all_accounts(&self) -> Result<Vec<AdAccount>> {
            Ok(self.inner.lock().unwrap().accounts.clone())
        }

        async fn tenants_with_accounts(&self) -> Result<Vec<Uuid>> {
            let mut tenants: Vec<Uuid> = self
                .inner
                .lock()
                .unwrap()
                .accounts
                .iter()
                .map(|a| a.tenant_id)
                .collect();
            tenants.sort();
            tenants.dedup();
            Ok(tenants)
        }

        async fn upsert_account(&self, account: &AdAccount) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = inner
                .accounts
                .iter_mut()
                .find(|a| a.tenant_id == account.tenant_id && a.platform == account.platform)
            {
                *existing = account.clone();
            } else {
                inner.accounts.push(account.clone());
            }
            Ok(())
        }

        async fn update_account_tokens(
            &self,
            id: Uuid,
            encrypted_access_token: &[u8],
            encrypted_refresh_token: Option<&[u8]>,
            token_expires_at: DateTime<Utc>,
        ) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(account) = inner.accounts.iter_mut().find(|a| a.id == id) {
                account.encrypted_access_token = Some(encrypted_access_token.to_vec());
                if let Some(refresh) = encrypted_refresh_token {
                    account.encrypted_refresh_token = Some(refresh.to_vec());
                }
                account.token_expires_at = Some(token_expires_at);
                account.status = AccountStatus::Active;
            }
            Ok(())
        }

        async fn update_account_status(&self, id: Uuid, status: AccountStatus) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(account) = inner.accounts.iter_mut().find(|a| a.id == id) {
                account.status = status;
            }
            Ok(())
        }

        async fn update_last_alerted(&self, id: Uuid, status: AccountStatus) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(account) = inner.accounts.iter_mut().find(|a| a.id == id) {
                account.last_alerted_status = Some(status);
            }
            Ok(())
        }

        async fn disconnect_account(&self, tenant_id: Uuid, platform: Platform) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(account) = inner
                .accounts
                .iter_mut()
                .find(|a| a.tenant_id == tenant_id && a.platform == platform)
            {
                account.status = AccountStatus::Revoked;
                account.encrypted_access_token = None;
                account.encrypted_refresh_token = None;
                account.token_expires_at = None;
            }
            Ok(())
        }

        async fn upsert_campaigns(
            &self,
            tenant_id: Uuid,
            platform: Platform,
            normalized: &[NormalizedCampaign],
        ) -> Result<HashMap<String, Uuid>> {
            let mut inner = self.inner.lock().unwrap();
            let mut mapping = HashMap::new();
            for campaign in normalized {
                let id = if let Some(existing) = inner.campaigns.iter_mut().find(|c| {
                    c.tenant_id == tenant_id
                        && c.platform == platform
                        && c.campaign_id == campaign.campaign_id
                }) {
                    existing.campaign_name = campaign.campaign_name.clone();
                    existing.status = campaign.status.clone();
                    existing.budget_amount = campaign.budget_amount;
                    existing.id
                } else {
                    let id = Uuid::new_v4();
                    inner.campaigns.push(Campaign {
                        id,
                        tenant_id,
                        platform,
                        campaign_id: campaign.campaign_id.clone(),
                        campaign_name: campaign.campaign_name.clone(),
                        status: campaign.status.clone(),
                        budget_amount: campaign.budget_amount,
                    });
                    id
                };
                mapping.insert(campaign.campaign_id.clone(), id);
            }
            Ok(mapping)
        }

        async fn replace_metrics(&self, records: &[MetricRecord]) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            for record in records {
                inner
                    .metrics
                    .insert((record.campaign_id, record.date), record.clone());
            }
            Ok(())
        }

        async fn campaigns_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Campaign>> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .campaigns
                .iter()
                .filter(|c| c.tenant_id == tenant_id)
                .cloned()
                .collect())
        }

        async fn metrics_for_tenant(
            &self,
            tenant_id: Uuid,
            range: DateRange,
        ) -> Result<Vec<MetricRecord>> {
            let inner = self.inner.lock().unwrap();
            let tenant_campaigns: Vec<Uuid> = inner
                .campaigns
                .iter()
                .filter(|c| c.tenant_id == tenant_id)
                .map(|c| c.id)
                .collect();
            Ok(inner
                .metrics
                .values()
                .filter(|m| tenant_campaigns.contains(&m.campaign_id) && range.contains(m.date))
                .cloned()
                .collect())
        }

        async fn insert_sync_run(&self, run: &SyncRun) -> Result<()> {
            self.inner.lock().unwrap().sync_runs.push(run.clone());
            Ok(())
        }

        async fn recent_sync_runs(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<SyncRun>> {
            let inner = self.inner.lock().unwrap();
            let mut runs: Vec<SyncRun> = inner
                .sync_runs
                .iter()
                .filter(|r| r.tenant_id == tenant_id)
                .cloned()
                .collect();
            runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            runs.truncate(limit as usize);
            Ok(runs)
        }
    }
}
