pub mod accounts;
pub mod connect;
pub mod health;
pub mod reports;
pub mod routes;
pub mod sync;
pub mod webhooks;

pub use routes::{create_router, AppState};
