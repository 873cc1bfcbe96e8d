//! The protection state machine applied to a single resolved section.
//!
//! ```text
//! Plain     --Encrypt--> Protected   (changed)
//! Protected --Encrypt--> Protected   (already in state)
//! Protected --Decrypt--> Plain       (changed)
//! Plain     --Decrypt--> Plain       (already in state)
//! ```
//!
//! Every transition that changes a section also marks it for force-save so the
//! document layer cannot drop the rewrite as a no-op.

use crate::document::{ConfigDocument, SectionId};
use crate::error::{Error, Result};
use crate::orchestrator::SectionOutcome;
use crate::providers::{ProviderError, ProviderRegistry};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Protection state of one section.
pub enum ProtectionState {
    /// Section content is stored in the clear.
    Plain,
    /// Section content is stored as a provider payload.
    Protected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The operation applied to every managed section in a run.
pub enum OperationMode {
    /// Bring sections into the protected state.
    Encrypt,
    /// Bring sections into the plain state.
    Decrypt,
}

impl OperationMode {
    #[must_use]
    /// The state every section should end up in.
    pub fn target(self) -> ProtectionState {
        match self {
            Self::Encrypt => ProtectionState::Protected,
            Self::Decrypt => ProtectionState::Plain,
        }
    }
}

impl FromStr for OperationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "-e" | "--encrypt" => Ok(Self::Encrypt),
            "-d" | "--decrypt" => Ok(Self::Decrypt),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Result of running one section through the state machine.
pub struct Processed {
    /// State after processing.
    pub state: ProtectionState,
    /// Whether the section was transformed.
    pub changed: bool,
    /// Outcome to report for the section.
    pub outcome: SectionOutcome,
}

/// Applies the requested mode to sections using providers from a registry.
pub struct SectionProcessor<'a> {
    providers: &'a ProviderRegistry,
}

impl<'a> SectionProcessor<'a> {
    #[must_use]
    /// Creates a processor that looks providers up in `providers`.
    pub fn new(providers: &'a ProviderRegistry) -> Self {
        Self { providers }
    }

    /// Moves `section` into the state requested by `mode`.
    ///
    /// Protection uses the provider registered as `provider`; unprotection uses the
    /// provider recorded on the section itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] if the provider is unavailable or the transform
    /// fails. The section is left unchanged in that case.
    pub fn process<D: ConfigDocument + ?Sized>(
        &self,
        document: &mut D,
        section: SectionId,
        mode: OperationMode,
        provider: &str,
    ) -> Result<Processed> {
        let name = document.section_name(section).to_string();
        let current = if document.is_protected(section) {
            ProtectionState::Protected
        } else {
            ProtectionState::Plain
        };

        if current == mode.target() {
            debug!(section = %name, ?current, "section already in requested state");
            return Ok(Processed {
                state: current,
                changed: false,
                outcome: SectionOutcome::AlreadyInState,
            });
        }

        let wrap = |source: ProviderError| Error::Provider {
            section: name.clone(),
            source,
        };
        match mode {
            OperationMode::Encrypt => {
                let provider = self.providers.get(provider).map_err(wrap)?;
                document.protect(section, provider).map_err(wrap)?;
            }
            OperationMode::Decrypt => {
                let recorded = document.protection_provider(section).ok_or_else(|| {
                    wrap(ProviderError::Malformed(
                        "protected section names no provider".to_string(),
                    ))
                })?;
                let provider = self.providers.get(&recorded).map_err(wrap)?;
                document.unprotect(section, provider).map_err(wrap)?;
            }
        }
        document.mark_force_save(section);
        debug!(section = %name, from = ?current, to = ?mode.target(), "section transitioned");

        Ok(Processed {
            state: mode.target(),
            changed: true,
            outcome: SectionOutcome::Changed,
        })
    }
}

#[cfg(test)]
#[path = "tests/processor.rs"]
mod tests;
