// Database row types and their conversions into domain types

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    AccountStatus, AdAccount, Campaign, MetricRecord, Platform, SyncRun, SyncStatus,
};
use crate::errors::AppError;

// ============================================================================
// AdAccount
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct AdAccountRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: String,
    pub account_id: String,
    pub account_name: String,
    pub status: String,
    pub encrypted_access_token: Option<Vec<u8>>,
    pub encrypted_refresh_token: Option<Vec<u8>>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub last_alerted_status: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AdAccountRow> for AdAccount {
    type Error = AppError;

    fn try_from(row: AdAccountRow) -> Result<Self, Self::Error> {
        let platform = Platform::from_str(&row.platform)
            .ok_or_else(|| AppError::Internal(format!("unknown platform '{}'", row.platform)))?;
        let status = AccountStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("unknown account status '{}'", row.status)))?;
        let last_alerted_status = row
            .last_alerted_status
            .as_deref()
            .and_then(AccountStatus::from_str);

        Ok(AdAccount {
            id: row.id,
            tenant_id: row.tenant_id,
            platform,
            account_id: row.account_id,
            account_name: row.account_name,
            status,
            encrypted_access_token: row.encrypted_access_token,
            encrypted_refresh_token: row.encrypted_refresh_token,
            token_expires_at: row.token_expires_at,
            last_alerted_status,
            metadata: row.metadata,
        })
    }
}

// ============================================================================
// Campaign
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub status: String,
    pub budget_amount: Option<f64>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = AppError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let platform = Platform::from_str(&row.platform)
            .ok_or_else(|| AppError::Internal(format!("unknown platform '{}'", row.platform)))?;
        Ok(Campaign {
            id: row.id,
            tenant_id: row.tenant_id,
            platform,
            campaign_id: row.campaign_id,
            campaign_name: row.campaign_name,
            status: row.status,
            budget_amount: row.budget_amount,
        })
    }
}

// ============================================================================
// MetricRecord
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct MetricRecordRow {
    pub campaign_id: Uuid,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: f64,
    pub spend: f64,
    pub revenue: f64,
}

impl From<MetricRecordRow> for MetricRecord {
    fn from(row: MetricRecordRow) -> Self {
        MetricRecord {
            campaign_id: row.campaign_id,
            date: row.date,
            impressions: row.impressions,
            clicks: row.clicks,
            conversions: row.conversions,
            spend: row.spend,
            revenue: row.revenue,
        }
    }
}

// ============================================================================
// SyncRun
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct SyncRunRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: String,
    pub account_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: String,
    pub error: Option<String>,
}

impl TryFrom<SyncRunRow> for SyncRun {
    type Error = AppError;

    fn try_from(row: SyncRunRow) -> Result<Self, Self::Error> {
        let platform = Platform::from_str(&row.platform)
            .ok_or_else(|| AppError::Internal(format!("unknown platform '{}'", row.platform)))?;
        let status = SyncStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("unknown sync status '{}'", row.status)))?;
        Ok(SyncRun {
            id: row.id,
            tenant_id: row.tenant_id,
            platform,
            account_id: row.account_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status,
            error: row.error,
        })
    }
}
