//! Local symmetric-key provider using ChaCha20-Poly1305.
//!
//! The payload format is `nonce (12 bytes) || ciphertext || tag (16 bytes)`. A fresh
//! random nonce is drawn for every protect call, so protecting the same section twice
//! never yields the same payload.

use crate::providers::{ProtectionProvider, ProviderError};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use std::fs;
use std::path::Path;

/// Name under which the local-key provider registers itself by default.
pub const DEFAULT_PROVIDER: &str = "ChaChaConfigurationProvider";
/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Protection provider backed by a 256-bit key held in memory.
pub struct LocalKeyProvider {
    name: String,
    key: [u8; KEY_SIZE],
}

impl LocalKeyProvider {
    #[must_use]
    /// Creates a provider from raw key bytes.
    pub fn new(name: impl Into<String>, key: [u8; KEY_SIZE]) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    /// Creates a provider from a hex-encoded key (64 hex characters).
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not hex or does not decode to exactly
    /// `KEY_SIZE` bytes.
    pub fn from_hex(name: impl Into<String>, text: &str) -> Result<Self, ProviderError> {
        let bytes = hex::decode(text.trim()).map_err(|e| ProviderError::InvalidKey(e.to_string()))?;
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            ProviderError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(name, key))
    }

    /// Reads a hex-encoded key from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds an invalid key.
    pub fn from_key_file(name: impl Into<String>, path: &Path) -> Result<Self, ProviderError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ProviderError::InvalidKey(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_hex(name, &text)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }
}

impl ProtectionProvider for LocalKeyProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).map_err(|_| ProviderError::Encrypt)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, plaintext)
            .map_err(|_| ProviderError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn unprotect(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
        if payload.len() < NONCE_SIZE + TAG_SIZE {
            return Err(ProviderError::Malformed(format!(
                "payload too short ({} bytes)",
                payload.len()
            )));
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ProviderError::Decrypt)
    }
}
