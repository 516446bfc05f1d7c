// Multi-platform ad performance sync library

pub mod adapters;
pub mod aggregate;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod oauth;
pub mod observability;
pub mod rate_limit;
pub mod redis;
pub mod sync;
pub mod vault;
pub mod webhook;

pub use config::Config;
pub use errors::{AppError, Result};
