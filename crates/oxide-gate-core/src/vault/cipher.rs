//! Symmetric encryption of the roster blob.
//!
//! Blob layout: `base64(nonce(12 bytes) || ciphertext)`, AES-256-GCM.
//! Key file: base64 of 32 random bytes.

use super::VaultError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::path::Path;
use tracing::info;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher bound to the roster key
pub struct RosterCipher {
    cipher: Aes256Gcm,
}

impl RosterCipher {
    /// Build a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::KeyFormat` if the key is not 32 bytes long.
    pub fn from_key(key: &[u8]) -> Result<Self, VaultError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| VaultError::KeyFormat(format!("expected {KEY_LEN} bytes, got {}", key.len())))?;
        Ok(Self { cipher })
    }

    /// Load the key file, generating a fresh random key when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be read, written or decoded.
    pub async fn load_or_generate(path: &Path) -> Result<Self, VaultError> {
        if !tokio::fs::try_exists(path).await? {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut key = [0u8; KEY_LEN];
            rand::rngs::OsRng.fill_bytes(&mut key);
            tokio::fs::write(path, BASE64.encode(key)).await?;
            info!(path = %path.display(), "Generated new roster key");
        }

        let encoded = tokio::fs::read_to_string(path).await?;
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| VaultError::KeyFormat(e.to_string()))?;
        Self::from_key(&key)
    }

    /// Encrypt a plaintext into the blob format.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Crypto` if encryption fails.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob).into_bytes())
    }

    /// Decrypt a blob produced by [`RosterCipher::seal`].
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Crypto` on malformed input or a wrong key.
    pub fn open(&self, blob: &[u8]) -> Result<Vec<u8>, VaultError> {
        let text = std::str::from_utf8(blob).map_err(|e| VaultError::Crypto(e.to_string()))?;
        let raw = BASE64
            .decode(text.trim())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        if raw.len() <= NONCE_LEN {
            return Err(VaultError::Crypto("blob too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| VaultError::Crypto("decryption failed - wrong key or corrupted blob".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_key_is_rejected() -> Result<(), VaultError> {
        let sealed = RosterCipher::from_key(&[1u8; 32])?.seal(b"{\"admins\":[1]}")?;
        let other = RosterCipher::from_key(&[2u8; 32])?;

        assert!(matches!(other.open(&sealed), Err(VaultError::Crypto(_))));
        Ok(())
    }

    #[test]
    fn test_short_key_is_rejected() {
        assert!(matches!(
            RosterCipher::from_key(&[0u8; 16]),
            Err(VaultError::KeyFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_key_file_is_generated_once() -> Result<(), VaultError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("secret.key");

        let first = RosterCipher::load_or_generate(&path).await?;
        let sealed = first.seal(b"payload")?;
        let second = RosterCipher::load_or_generate(&path).await?;

        assert_eq!(second.open(&sealed)?, b"payload");
        Ok(())
    }
}
