pub mod provider;
pub mod state;

pub use provider::{OAuthClient, TokenResponse};
pub use state::{PendingConnect, StateStore};
