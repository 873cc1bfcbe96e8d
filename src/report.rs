//! The report renders a run result into something a human operator can read.
//!
//! One line per configured section, in configured order, followed by a summary line.

use crate::edit_plan::EditPlan;
use crate::orchestrator::{RunResult, SectionOutcome, SectionReport};
use crate::processor::OperationMode;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a RunResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a EditPlan>,
}

/// Renders one line per section plus a summary line.
#[must_use]
pub fn render(result: &RunResult) -> Vec<String> {
    let mut lines: Vec<String> = result
        .sections
        .iter()
        .map(|report| section_line(report, result.mode))
        .collect();
    lines.push(summary_line(result).to_string());
    lines
}

/// Renders the result as a single JSON document, embedding the pending edits of a
/// dry run under `plan`.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn render_json(result: &RunResult, plan: Option<&EditPlan>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport { result, plan })
}

fn section_line(report: &SectionReport, mode: Option<OperationMode>) -> String {
    let name = report.name.as_deref().unwrap_or(&report.path);
    match (report.outcome, mode) {
        (SectionOutcome::NotFound, _) => format!("Section '{}' not found.", report.path),
        (SectionOutcome::InvalidMode, _) | (_, None) => {
            "Unknown operation. Use -e or -d.".to_string()
        }
        (SectionOutcome::Changed, Some(OperationMode::Encrypt)) => {
            format!("Encrypting section: {name}")
        }
        (SectionOutcome::Changed, Some(OperationMode::Decrypt)) => {
            format!("Decrypting section: {name}")
        }
        (SectionOutcome::AlreadyInState, Some(OperationMode::Encrypt)) => {
            format!("Section already encrypted: {name}")
        }
        (SectionOutcome::AlreadyInState, Some(OperationMode::Decrypt)) => {
            format!("Section is not encrypted: {name}")
        }
    }
}

fn summary_line(result: &RunResult) -> &'static str {
    match (result.modified, result.persisted) {
        (true, true) => "Configuration updated successfully.",
        (true, false) => "Dry run: changes were not written.",
        (false, _) => "No changes were necessary.",
    }
}

#[cfg(test)]
#[path = "tests/report.rs"]
mod tests;
