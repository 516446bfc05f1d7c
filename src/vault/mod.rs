pub mod cipher;
pub mod tokens;

pub use cipher::{Cipher, VaultError};
pub use tokens::TokenVault;
