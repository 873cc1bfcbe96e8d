//! The edit plan turns in-memory section rewrites into bytes on disk.
//!
//! Each edit replaces one element's byte range with new text. Everything outside the
//! edited ranges is copied through untouched, and the result replaces the target file
//! in a single rename so a failed write never leaves a truncated document behind.

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
/// Serialisable collection of section replacements for one document.
pub struct EditPlan {
    /// Target file path for this plan.
    pub file_name: String,
    /// Individual section replacements.
    pub edits: Vec<Edit>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
/// Byte range and replacement text for one section.
pub struct Edit {
    /// Byte offset where the replaced element begins (inclusive).
    pub byte_start: usize,
    /// Byte offset where the replaced element ends (exclusive).
    pub byte_end: usize,
    /// New element text.
    pub replacement: String,
    /// Section name for tracking and debugging edits.
    pub item_name: String,
}

impl EditPlan {
    #[must_use]
    /// Whether the plan contains no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Splices every edit into `source`.
    ///
    /// Edits may be listed in any order but must not overlap.
    ///
    /// # Errors
    ///
    /// Returns an error if an edit falls outside `source`, splits a UTF-8 character or
    /// overlaps another edit.
    pub fn apply_to(&self, source: &str) -> io::Result<String> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| edit.byte_start);

        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for edit in edits {
            if edit.byte_start < cursor || edit.byte_end < edit.byte_start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("edit for '{}' overlaps a previous edit", edit.item_name),
                ));
            }
            let (Some(kept), Some(_)) = (
                source.get(cursor..edit.byte_start),
                source.get(edit.byte_start..edit.byte_end),
            ) else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("edit for '{}' is out of bounds", edit.item_name),
                ));
            };
            out.push_str(kept);
            out.push_str(&edit.replacement);
            cursor = edit.byte_end;
        }
        out.push_str(&source[cursor..]);

        Ok(out)
    }
}

/// Writes `contents` to a temporary sibling of `path`, then renames it into place.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, written or persisted.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/edit_plan.rs"]
mod tests;
