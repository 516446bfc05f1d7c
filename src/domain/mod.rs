pub mod account;
pub mod metrics;
pub mod sync;

pub use account::{AccountStatus, AdAccount, Platform, TokenHealth};
pub use metrics::{Campaign, DateRange, MetricRecord, NormalizedBatch, NormalizedCampaign, NormalizedMetric};
pub use sync::{SyncRun, SyncStatus};
