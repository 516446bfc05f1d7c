// Bounded sync job queue and the periodic scheduler that feeds it.
//
// HTTP handlers and the OAuth callback enqueue and return immediately; a
// single worker task drains the queue and drives the orchestrator. The
// queue is bounded so a burst of manual sync requests cannot pile up work
// without limit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::db::Store;
use crate::domain::DateRange;
use crate::errors::{AppError, Result};
use crate::sync::orchestrator::SyncOrchestrator;

#[derive(Debug, Clone)]
pub struct SyncJob {
    pub tenant_id: Uuid,
    pub range: DateRange,
}

/// Producer half of the job queue, shared by handlers and the scheduler
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::Sender<SyncJob>,
}

impl SyncQueue {
    pub fn new(depth: usize) -> (Self, mpsc::Receiver<SyncJob>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. A full queue is back-pressure, reported to
    /// the caller rather than absorbed.
    pub fn enqueue(&self, job: SyncJob) -> Result<()> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(tenant_id = %job.tenant_id, "Sync queue full, job rejected");
                Err(AppError::RateLimitExceeded("sync queue".to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(AppError::Internal("sync queue closed".to_string()))
            }
        }
    }
}

/// Date range a scheduled sync covers: the last `lookback_days` up to today
pub fn scheduled_range(lookback_days: i64) -> DateRange {
    let today = Utc::now().date_naive();
    DateRange {
        start: today - chrono::Duration::days(lookback_days.max(0)),
        end: today,
    }
}

/// Drain the queue forever. Runs as a spawned task; orchestrator errors are
/// logged and the worker moves on to the next job.
pub async fn run_worker(mut rx: mpsc::Receiver<SyncJob>, orchestrator: Arc<SyncOrchestrator>) {
    tracing::info!("Sync worker started");
    while let Some(job) = rx.recv().await {
        if let Err(e) = orchestrator.sync_tenant(job.tenant_id, job.range).await {
            tracing::error!(tenant_id = %job.tenant_id, error = %e, "Sync job failed");
        }
    }
    tracing::info!("Sync worker stopped, queue closed");
}

/// Periodically enqueue a sync for every tenant with at least one account
pub async fn run_scheduler(queue: SyncQueue, store: Arc<dyn Store>, config: SyncConfig) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.schedule_interval_seconds));
    // The immediate first tick would race startup; skip it
    interval.tick().await;

    loop {
        interval.tick().await;
        let tenants = match store.tenants_with_accounts().await {
            Ok(tenants) => tenants,
            Err(e) => {
                tracing::error!(error = %e, "Scheduler failed to list tenants");
                continue;
            }
        };

        let range = scheduled_range(config.lookback_days);
        tracing::info!(tenants = tenants.len(), "Scheduling periodic sync");
        for tenant_id in tenants {
            if let Err(e) = queue.enqueue(SyncJob { tenant_id, range }) {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Could not schedule sync");
            }
        }
    }
}
