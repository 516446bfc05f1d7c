pub mod health;
pub mod tracing;

pub use health::{HealthChecker, HealthStatus};
pub use tracing::init_tracing;
