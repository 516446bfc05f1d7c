pub mod accounts;
pub mod campaigns;
pub mod pool;
pub mod schema;
pub mod store;
pub mod sync_runs;

pub use pool::{create_pool, health_check, run_migrations};
pub use store::{PgStore, Store};
