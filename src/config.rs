//! Configuration to acknowledge operator preferences as well as set defaults.
//!
//! Specifically, we try to find a confseal.toml, and if present we load settings from there.
//! This provides the managed section list, the configuration file name, the provider used
//! for protection and where the key lives.

use crate::error::{Error, Result};
use crate::providers::chacha::{LocalKeyProvider, DEFAULT_PROVIDER};
use crate::providers::ProviderRegistry;
use crate::section::is_xml_name;
use facet::Facet;
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Preferences file looked up in the working directory.
pub const CONFIG_FILE: &str = "confseal.toml";
/// Environment variable holding a hex-encoded key, overriding `key_file`.
pub const KEY_ENV: &str = "CONFSEAL_KEY";

#[derive(Facet, Clone, Debug)]
/// Operator preferences loaded from confseal.toml or falling back to defaults.
pub struct Config {
    #[facet(default = "web.config".to_string())]
    /// Name of the configuration file inside the target folder.
    pub file_name: String,
    #[facet(default = vec![
        "appSettings".to_string(),
        "connectionStrings".to_string(),
        "dbSettings".to_string(),
        "crmSettings".to_string(),
        "system.net/mailSettings/smtp".to_string(),
    ])]
    /// Section paths to manage, in reporting order.
    pub sections: Vec<String>,
    #[facet(default = DEFAULT_PROVIDER.to_string())]
    /// Provider used to protect plain sections.
    pub provider: String,
    #[facet(default)]
    /// File holding the hex-encoded protection key.
    pub key_file: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from confseal.toml in the working directory.
    ///
    /// A missing confseal.toml falls back to defaults; an explicitly requested file must
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is unreadable or any file fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let contents = match path {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?,
            None => fs::read_to_string(CONFIG_FILE).unwrap_or_default(),
        };
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text, applying defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        facet_toml::from_str::<Self>(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Builds the provider registry from the configured key material.
    ///
    /// The key comes from `CONFSEAL_KEY` if set, otherwise from `key_file`. Without
    /// either, the registry is empty and any run that needs a provider fails with an
    /// unavailable-provider error.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider name is not a valid XML name or key material is
    /// present but invalid.
    pub fn providers(&self) -> Result<ProviderRegistry> {
        if !is_xml_name(&self.provider) {
            return Err(Error::Config(format!(
                "provider name '{}' is not a valid XML name",
                self.provider
            )));
        }
        let mut registry = ProviderRegistry::new();
        let provider = match (env::var(KEY_ENV).ok(), self.key_file.as_deref()) {
            (Some(hex), _) => Some(LocalKeyProvider::from_hex(&self.provider, &hex)),
            (None, Some(file)) => Some(LocalKeyProvider::from_key_file(
                &self.provider,
                Path::new(file),
            )),
            (None, None) => None,
        };

        match provider {
            Some(Ok(provider)) => registry.register(Box::new(provider)),
            Some(Err(e)) => return Err(Error::Config(e.to_string())),
            None => debug!("no key material configured"),
        }
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "tests/config.rs"]
mod tests;
