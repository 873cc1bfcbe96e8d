//! Protection providers and the registry that names them.
//!
//! A provider turns the raw text of a section into an opaque payload and back. The
//! document layer decides where that payload lives; the state machine only ever refers
//! to a provider by name, so a section protected by one mechanism can be read back by
//! looking up the name recorded on the section.

pub mod chacha;

use std::collections::HashMap;

/// Errors raised while protecting or unprotecting a section.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider is registered under the requested name.
    #[error("protection provider '{0}' is not available")]
    Unavailable(String),

    /// Key material was missing or had the wrong shape.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The protect transform failed.
    #[error("encryption failed")]
    Encrypt,

    /// The unprotect transform rejected the payload (wrong key or tampered data).
    #[error("decryption failed")]
    Decrypt,

    /// The protected payload could not be decoded.
    #[error("malformed protected payload: {0}")]
    Malformed(String),

    /// The provider name cannot be recorded on a section.
    #[error("provider name '{0}' is not a valid XML name")]
    InvalidName(String),

    /// The section is not in the state the transform expects.
    #[error("invalid protection state: {0}")]
    InvalidState(&'static str),
}

/// A named mechanism that performs the actual protect/unprotect transform.
pub trait ProtectionProvider {
    /// Name recorded on sections protected by this provider.
    fn name(&self) -> &str;

    /// Protect raw section content.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying mechanism is unavailable or fails.
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, ProviderError>;

    /// Recover raw section content from a payload produced by [`Self::protect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed or fails authentication.
    fn unprotect(&self, payload: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Default)]
/// Providers available to a run, keyed by name.
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn ProtectionProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under its own name, replacing any previous entry.
    pub fn register(&mut self, provider: Box<dyn ProtectionProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Looks up a provider by name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unavailable`] when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn ProtectionProvider, ProviderError> {
        match self.providers.get(name) {
            Some(provider) => Ok(&**provider),
            None => Err(ProviderError::Unavailable(name.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "tests/providers.rs"]
mod tests;
