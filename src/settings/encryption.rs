//! AES-256-GCM sealing for stored settings values.
//!
//! Every write gets a fresh random nonce. The master key is 32 bytes,
//! base64-encoded, and only ever held in memory.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the master key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// A sealed value ready for storage. Both fields are base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: String,
    pub nonce: String,
}

/// Seals and opens settings values with one master key.
pub struct SettingsCipher {
    cipher: Aes256Gcm,
}

impl SettingsCipher {
    /// Builds a cipher from a base64-encoded 32-byte master key.
    pub fn from_base64_key(key_base64: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .context("Failed to decode base64 encryption key")?;

        if key_bytes.len() != KEY_SIZE {
            return Err(anyhow!(
                "Encryption key must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                key_bytes.len()
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| anyhow!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a new random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<Sealed> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        Ok(Sealed {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
        })
    }

    /// Decrypts a sealed value. Fails on a wrong key or tampered data.
    pub fn open(&self, sealed: &Sealed) -> Result<String> {
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .context("Failed to decode ciphertext")?;
        let nonce_bytes = BASE64
            .decode(&sealed.nonce)
            .context("Failed to decode nonce")?;

        if nonce_bytes.len() != NONCE_SIZE {
            return Err(anyhow!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            ));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

        String::from_utf8(plaintext).context("Decrypted settings value is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher(byte: u8) -> SettingsCipher {
        SettingsCipher::from_base64_key(&BASE64.encode([byte; 32])).unwrap()
    }

    #[test]
    fn test_key_validation() {
        assert!(SettingsCipher::from_base64_key(&BASE64.encode([0u8; 32])).is_ok());
        assert!(SettingsCipher::from_base64_key(&BASE64.encode([0u8; 16])).is_err());
        assert!(SettingsCipher::from_base64_key(&BASE64.encode([0u8; 64])).is_err());
        assert!(SettingsCipher::from_base64_key("not-valid-base64!@#$").is_err());
    }

    #[test]
    fn test_seal_hides_plaintext_and_opens_back() {
        let cipher = test_cipher(0);
        let value = r#"{"host":"https://svc","token":"abc"}"#;

        let sealed = cipher.seal(value).unwrap();
        assert!(!sealed.ciphertext.contains("abc"));
        assert_eq!(cipher.open(&sealed).unwrap(), value);
    }

    #[test]
    fn test_each_seal_uses_fresh_nonce() {
        let cipher = test_cipher(0);
        let first = cipher.seal("same").unwrap();
        let second = cipher.seal("same").unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = test_cipher(0).seal("secret").unwrap();
        assert!(test_cipher(1).open(&sealed).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = test_cipher(0);
        let mut sealed = cipher.seal("secret").unwrap();
        sealed.ciphertext.push('X');
        assert!(cipher.open(&sealed).is_err());
    }
}
