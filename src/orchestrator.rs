//! A single protection run over one configuration document.
//!
//! The run resolves each configured section path, hands resolved sections to the
//! [`SectionProcessor`], folds the per-section outcomes into one `modified` flag and
//! saves the document once at the end if anything changed. Any structural failure
//! returns before the save, so the file on disk is never partially updated.

use crate::document::{ConfigDocument, SaveMode, XmlDocument};
use crate::error::Result;
use crate::processor::{OperationMode, SectionProcessor};
use crate::providers::ProviderRegistry;
use crate::resolver::{self, SectionPath};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
/// What happened to one configured section.
pub enum SectionOutcome {
    /// The path did not resolve to a section.
    NotFound,
    /// The section already matched the requested state.
    AlreadyInState,
    /// The section was transformed.
    Changed,
    /// The requested mode was not a valid operation.
    InvalidMode,
}

impl SectionOutcome {
    #[must_use]
    /// Whether this outcome altered the document.
    pub fn changed(self) -> bool {
        self == Self::Changed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// Outcome of one configured section path.
pub struct SectionReport {
    /// The configured path, normalised.
    pub path: String,
    /// Section name as reported by the document, when the path resolved.
    pub name: Option<String>,
    /// What happened to the section.
    pub outcome: SectionOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// Aggregate outcome of a run.
pub struct RunResult {
    /// The validated mode, or `None` if the requested mode was invalid.
    #[serde(skip)]
    pub mode: Option<OperationMode>,
    /// Per-section outcomes in configured order.
    pub sections: Vec<SectionReport>,
    /// Whether any section changed.
    pub modified: bool,
    /// Whether the document was written.
    pub persisted: bool,
}

impl RunResult {
    #[must_use]
    /// Builds a result, folding the per-section outcomes into `modified`.
    pub fn new(mode: Option<OperationMode>, sections: Vec<SectionReport>) -> Self {
        let modified = sections
            .iter()
            .fold(false, |acc, report| acc || report.outcome.changed());
        Self {
            mode,
            sections,
            modified,
            persisted: false,
        }
    }
}

/// Drives resolution, processing and the final commit for a fixed set of paths.
pub struct Orchestrator {
    sections: Vec<SectionPath>,
    provider: String,
    providers: ProviderRegistry,
    dry_run: bool,
}

impl Orchestrator {
    #[must_use]
    /// Creates an orchestrator managing `sections`, protecting with `provider`.
    pub fn new(
        sections: Vec<SectionPath>,
        provider: impl Into<String>,
        providers: ProviderRegistry,
    ) -> Self {
        Self {
            sections,
            provider: provider.into(),
            providers,
            dry_run: false,
        }
    }

    #[must_use]
    /// Computes outcomes without ever saving the document.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Opens the document at `document_path` and runs every managed section through
    /// the requested `mode`.
    ///
    /// Returns the loaded document alongside the result so callers can inspect the
    /// pending edits of a dry run.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be loaded, a provider fails or the save
    /// fails.
    pub fn run(&self, document_path: &Path, mode: &str) -> Result<(RunResult, XmlDocument)> {
        let mut document = XmlDocument::open(document_path)?;
        let result = self.run_document(&mut document, mode)?;
        Ok((result, document))
    }

    /// Runs every managed section of an already loaded document.
    ///
    /// The mode is validated once; if it is invalid every resolved section reports
    /// [`SectionOutcome::InvalidMode`] and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if a provider fails or the save fails.
    pub fn run_document<D: ConfigDocument + ?Sized>(
        &self,
        document: &mut D,
        mode: &str,
    ) -> Result<RunResult> {
        let mode = match mode.parse::<OperationMode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                debug!("{e}");
                None
            }
        };
        let processor = SectionProcessor::new(&self.providers);

        let reports = self
            .sections
            .iter()
            .map(|path| {
                let Some(section) = resolver::resolve(&*document, path) else {
                    debug!(%path, "section not found");
                    return Ok(SectionReport {
                        path: path.to_string(),
                        name: None,
                        outcome: SectionOutcome::NotFound,
                    });
                };
                let name = document.section_name(section).to_string();
                let outcome = match mode {
                    Some(mode) => {
                        processor
                            .process(document, section, mode, &self.provider)?
                            .outcome
                    }
                    None => SectionOutcome::InvalidMode,
                };
                debug!(%path, ?outcome, "section processed");
                Ok(SectionReport {
                    path: path.to_string(),
                    name: Some(name),
                    outcome,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = RunResult::new(mode, reports);
        if result.modified && !self.dry_run {
            document.save(SaveMode::Full)?;
            result.persisted = true;
        } else if result.modified {
            info!("dry run, leaving document untouched");
        }

        Ok(result)
    }
}

#[cfg(test)]
#[path = "tests/orchestrator.rs"]
mod tests;
