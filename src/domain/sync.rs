use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::Platform;

/// Outcome of a sync attempt, per account or rolled up per tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(SyncStatus::Success),
            "partial" => Some(SyncStatus::Partial),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }

    /// Roll per-account outcomes up to a tenant-level status.
    ///
    /// All succeeded (or nothing to do) is success; all failed is failed;
    /// anything in between is partial.
    pub fn rollup(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => SyncStatus::Success,
            (0, _) => SyncStatus::Failed,
            _ => SyncStatus::Partial,
        }
    }
}

/// Append-only audit record for one account's sync attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub platform: Platform,
    pub account_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub error: Option<String>,
}
