//! Encryption for provider credentials at rest.
//!
//! Per-org OAuth tokens and API keys are stored in the
//! `org_connections.config_encrypted` column as
//! `base64(nonce || AES-256-GCM ciphertext)`. GCM authentication means a
//! tampered blob fails to decrypt rather than yielding garbage JSON.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// AES-256 key length in bytes.
const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts JSON credential blobs with a process-wide key.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Build a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Build a cipher from the `BOOKD_ENCRYPTION_KEY` environment variable
    /// (base64-encoded 32-byte key).
    pub fn from_env() -> Result<Self, CoreError> {
        let encoded = std::env::var("BOOKD_ENCRYPTION_KEY").map_err(|_| {
            CoreError::Configuration("BOOKD_ENCRYPTION_KEY must be set".to_string())
        })?;
        let bytes = BASE64.decode(encoded.trim()).map_err(|e| {
            CoreError::Configuration(format!("BOOKD_ENCRYPTION_KEY is not valid base64: {e}"))
        })?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CoreError::Configuration(format!(
                "BOOKD_ENCRYPTION_KEY must decode to exactly {KEY_LEN} bytes"
            ))
        })?;
        Ok(Self::new(&key))
    }

    /// Serialize `value` to JSON and encrypt it.
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String, CoreError> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| CoreError::Internal(format!("credential serialization failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| CoreError::Internal("credential encryption failed".to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt_json`](Self::encrypt_json) and
    /// deserialize the JSON inside.
    pub fn decrypt_json<T: DeserializeOwned>(&self, blob: &str) -> Result<T, CoreError> {
        let bytes = BASE64
            .decode(blob.trim())
            .map_err(|e| CoreError::Validation(format!("credential blob is not base64: {e}")))?;
        if bytes.len() <= NONCE_LEN {
            return Err(CoreError::Validation(
                "credential blob is too short".to_string(),
            ));
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CoreError::Validation("credential decryption failed".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| CoreError::Validation(format!("decrypted credential is not JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct FakeCreds {
        access_token: String,
        refresh_token: String,
    }

    fn test_cipher() -> CredentialCipher {
        CredentialCipher::new(&[7u8; 32])
    }

    fn sample() -> FakeCreds {
        FakeCreds {
            access_token: "ya29.secret".to_string(),
            refresh_token: "1//refresh".to_string(),
        }
    }

    #[test]
    fn roundtrip() {
        let cipher = test_cipher();
        let blob = cipher.encrypt_json(&sample()).unwrap();
        let decrypted: FakeCreds = cipher.decrypt_json(&blob).unwrap();
        assert_eq!(decrypted, sample());
    }

    #[test]
    fn ciphertext_is_not_plaintext() {
        let cipher = test_cipher();
        let blob = cipher.encrypt_json(&sample()).unwrap();
        assert!(!blob.contains("ya29"));
    }

    #[test]
    fn nonces_differ_between_calls() {
        let cipher = test_cipher();
        let a = cipher.encrypt_json(&sample()).unwrap();
        let b = cipher.encrypt_json(&sample()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_blob_is_rejected() {
        let cipher = test_cipher();
        let blob = cipher.encrypt_json(&sample()).unwrap();
        let mut bytes = BASE64.decode(&blob).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let tampered = BASE64.encode(bytes);
        assert!(cipher.decrypt_json::<FakeCreds>(&tampered).is_err());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let blob = test_cipher().encrypt_json(&sample()).unwrap();
        let other = CredentialCipher::new(&[8u8; 32]);
        assert!(other.decrypt_json::<FakeCreds>(&blob).is_err());
    }

    #[test]
    fn garbage_blob_is_rejected() {
        let cipher = test_cipher();
        assert!(cipher.decrypt_json::<FakeCreds>("not base64!!").is_err());
        assert!(cipher.decrypt_json::<FakeCreds>("AAAA").is_err());
    }
}
