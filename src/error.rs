//! Error types for a protection run.
//!
//! Section-level soft outcomes (missing sections, sections already in the requested
//! state) are not errors and live in [`crate::orchestrator::SectionOutcome`]. Everything
//! here aborts the run before anything is written.

use crate::providers::ProviderError;
use std::io;
use std::path::PathBuf;

/// Structural failures that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file is absent from the target folder.
    #[error("{file_name} not found at: {}", path.display())]
    FileNotFound {
        /// Conventional name of the file that was looked for.
        file_name: String,
        /// Full path that was checked.
        path: PathBuf,
    },

    /// The document could not be parsed into a section hierarchy.
    #[error("failed to parse {}: {reason}", path.display())]
    Parse {
        /// Document that failed to parse.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The requested operation is neither encrypt nor decrypt.
    #[error("unknown operation '{0}', use -e or -d")]
    InvalidMode(String),

    /// A protection provider failed to transform a section.
    #[error("section '{section}': {source}")]
    Provider {
        /// Name of the section being transformed.
        section: String,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// Writing the document back to disk failed.
    #[error("failed to save {}: {source}", path.display())]
    Persistence {
        /// Document that could not be written.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },

    /// Tool configuration or key material could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for protection runs.
pub type Result<T> = std::result::Result<T, Error>;
