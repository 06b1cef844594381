//! Settings encryption.
//!
//! Tenant setting values are encrypted with AES-256-GCM under a single
//! process-wide key and a single fixed IV. Identical plaintexts therefore
//! always produce identical ciphertexts; that equality is a property of the
//! deployed scheme and is asserted in tests.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{ConfigError, Result};

const KEY_LEN: usize = 32;

/// Fixed IV shared by every encrypted setting value.
const SETTINGS_IV: &[u8; 12] = b"meridian-cfg";

/// Encrypts and decrypts tenant setting values.
#[derive(Clone)]
pub struct SettingsCipher {
    cipher: Aes256Gcm,
}

impl SettingsCipher {
    /// Build a cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(ConfigError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| ConfigError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Build a cipher from a base64-encoded 32-byte key.
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let key = BASE64.decode(encoded.trim().as_bytes())?;
        Self::new(&key)
    }

    /// Encrypt a plaintext value for storage, base64-encoded.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Nonce::from_slice(SETTINGS_IV);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| ConfigError::Decrypt)?;
        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt a stored value back to its plaintext.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let ciphertext = BASE64.decode(encoded.as_bytes())?;
        let nonce = Nonce::from_slice(SETTINGS_IV);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| ConfigError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| ConfigError::Decrypt)
    }
}

impl std::fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_cipher() -> SettingsCipher {
    SettingsCipher::new(&[7u8; 32]).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("sk-write-key-123").unwrap();
        assert_ne!(encrypted, "sk-write-key-123");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sk-write-key-123");
    }

    #[test]
    fn test_fixed_iv_makes_ciphertexts_deterministic() {
        let cipher = test_cipher();
        let first = cipher.encrypt("same value").unwrap();
        let second = cipher.encrypt("same value").unwrap();
        assert_eq!(first, second);

        let different = cipher.encrypt("other value").unwrap();
        assert_ne!(first, different);
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("!!! not base64 !!!"),
            Err(ConfigError::Decode(_))
        ));

        let valid_b64_garbage = base64::engine::general_purpose::STANDARD.encode(b"short");
        assert!(matches!(
            cipher.decrypt(&valid_b64_garbage),
            Err(ConfigError::Decrypt)
        ));
    }

    #[test]
    fn test_wrong_key_fails_decrypt() {
        let cipher = test_cipher();
        let other = SettingsCipher::new(&[9u8; 32]).unwrap();
        let encrypted = cipher.encrypt("secret").unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(ConfigError::Decrypt)));
    }

    #[test]
    fn test_key_length_enforced() {
        assert!(matches!(
            SettingsCipher::new(&[1u8; 16]),
            Err(ConfigError::InvalidKey)
        ));
    }
}
