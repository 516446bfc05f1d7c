pub mod monitor;
pub mod orchestrator;
pub mod queue;

pub use monitor::TokenMonitor;
pub use orchestrator::{SyncOrchestrator, TenantSyncReport};
pub use queue::{run_scheduler, run_worker, scheduled_range, SyncJob, SyncQueue};
