use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Credential vault errors
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid encryption key: {0}")]
    Key(String),
    #[error("Encryption failed")]
    Encryption,
    /// Tamper, truncation, or key mismatch. Callers must treat the
    /// credentials as unusable and move the account to revoked.
    #[error("Decryption failed")]
    Decryption,
    #[error("Token refresh rejected: {0}")]
    Refresh(String),
}

/// AES-256-GCM cipher for OAuth tokens at rest.
///
/// Ciphertext layout: 12-byte random nonce || sealed payload (tag appended).
pub struct Cipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl Cipher {
    /// Build from a hex-encoded 32-byte key
    pub fn from_hex_key(key_hex: &str) -> Result<Self, VaultError> {
        let key_bytes = hex::decode(key_hex).map_err(|e| VaultError::Key(e.to_string()))?;
        if key_bytes.len() != AES_256_GCM.key_len() {
            return Err(VaultError::Key(format!(
                "expected {} bytes, got {}",
                AES_256_GCM.key_len(),
                key_bytes.len()
            )));
        }
        let unbound =
            UnboundKey::new(&AES_256_GCM, &key_bytes).map_err(|_| VaultError::Key("unusable key".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt a plaintext token. Every call uses a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VaultError::Encryption)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut sealed = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut sealed)
            .map_err(|_| VaultError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a nonce-prefixed ciphertext produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, VaultError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(VaultError::Decryption);
        }
        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| VaultError::Decryption)?;

        let mut buf = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut buf)
            .map_err(|_| VaultError::Decryption)?;
        Ok(plaintext.to_vec())
    }

    /// Decrypt straight to a UTF-8 token string
    pub fn decrypt_str(&self, ciphertext: &[u8]) -> Result<String, VaultError> {
        let plaintext = self.decrypt(ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> Cipher {
        Cipher::from_hex_key(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt(b"ya29.secret-token").unwrap();
        assert_ne!(&ciphertext[NONCE_LEN..], b"ya29.secret-token");
        assert_eq!(cipher.decrypt_str(&ciphertext).unwrap(), "ya29.secret-token");
    }

    #[test]
    fn test_nonces_are_unique_per_value() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same-token").unwrap();
        let b = cipher.encrypt(b"same-token").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tamper_is_rejected() {
        let cipher = test_cipher();
        let mut ciphertext = cipher.encrypt(b"refresh-token").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        assert!(matches!(cipher.decrypt(&ciphertext), Err(VaultError::Decryption)));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let cipher = test_cipher();
        let ciphertext = cipher.encrypt(b"token").unwrap();

        let other = Cipher::from_hex_key(&"cd".repeat(32)).unwrap();
        assert!(matches!(other.decrypt(&ciphertext), Err(VaultError::Decryption)));
    }

    #[test]
    fn test_truncated_ciphertext_is_rejected() {
        let cipher = test_cipher();
        assert!(matches!(cipher.decrypt(&[0u8; 4]), Err(VaultError::Decryption)));
    }

    #[test]
    fn test_bad_key_length_rejected() {
        assert!(matches!(Cipher::from_hex_key("deadbeef"), Err(VaultError::Key(_))));
    }
}
