//! Mapping slash-delimited section paths onto sections of a loaded document.

use crate::document::{ConfigDocument, SectionId};
use std::fmt;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A logical section identifier split into its group and section names.
///
/// `system.net/mailSettings/smtp` names the `smtp` section inside the `mailSettings`
/// group of the `system.net` group. Empty segments are dropped, so `a//b/` and `a/b`
/// are the same path.
pub struct SectionPath {
    segments: Vec<String>,
}

impl SectionPath {
    #[must_use]
    /// Splits `path` on `/`, discarding empty segments.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    #[must_use]
    /// The non-empty segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    /// Whether the path has no segments at all.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for SectionPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Locates the section named by `path`, or `None` if any step of the lookup fails.
///
/// A single segment names a top-level section. Longer paths descend through section
/// groups (the first segment at the document root, each middle segment nested in the
/// previous group) and look the final segment up as a section of the last group.
pub fn resolve<D: ConfigDocument + ?Sized>(document: &D, path: &SectionPath) -> Option<SectionId> {
    let found = match path.segments() {
        [] => None,
        [name] => document.top_level_section(name),
        [first, groups @ .., name] => document
            .section_group(first)
            .and_then(|root| {
                groups
                    .iter()
                    .try_fold(root, |group, segment| document.nested_group(group, segment))
            })
            .and_then(|group| document.group_section(group, name)),
    };
    debug!(%path, found = found.is_some(), "resolved section path");
    found
}

#[cfg(test)]
#[path = "tests/resolver.rs"]
mod tests;
