//! The document API the protection run is written against, and its XML implementation.
//!
//! `XmlDocument` keeps the file text exactly as loaded. Protecting or unprotecting a
//! section records a rewrite against that section's byte range; nothing is rendered
//! until the document is saved, at which point the rewrites become an [`EditPlan`] and
//! the whole file is replaced in one step.
//!
//! Once a section has been rewritten, the elements nested inside it are no longer
//! addressable until the document is saved and reloaded.

use crate::edit_plan::{write_atomic, Edit, EditPlan};
use crate::error::{Error, Result};
use crate::formats::xml::XmlFormat;
use crate::input;
use crate::providers::{ProtectionProvider, ProviderError};
use crate::section::{
    is_xml_name, Section, CONFIG_SECTIONS, ENCRYPTED_DATA, PROTECTION_ATTRIBUTE,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Handle to a section inside a loaded document.
pub struct SectionId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Handle to a section group inside a loaded document.
pub struct GroupId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How much of the document a save writes.
pub enum SaveMode {
    /// Write only when at least one section rewrite survives change detection.
    Modified,
    /// Always rewrite the whole file.
    Full,
}

/// Lookup, protection and persistence operations on a loaded configuration document.
pub trait ConfigDocument {
    /// Finds a section directly below the document root.
    fn top_level_section(&self, name: &str) -> Option<SectionId>;
    /// Finds a section group directly below the document root.
    fn section_group(&self, name: &str) -> Option<GroupId>;
    /// Finds a group nested directly inside `group`.
    fn nested_group(&self, group: GroupId, name: &str) -> Option<GroupId>;
    /// Finds a section directly inside `group`.
    fn group_section(&self, group: GroupId, name: &str) -> Option<SectionId>;
    /// Human-readable name of a section.
    fn section_name(&self, section: SectionId) -> &str;
    /// Whether the section is currently protected.
    fn is_protected(&self, section: SectionId) -> bool;
    /// Provider recorded on a protected section.
    fn protection_provider(&self, section: SectionId) -> Option<String>;

    /// Protects the section's raw content with `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is already protected, the provider's name cannot
    /// be written as an attribute value or the provider fails.
    fn protect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError>;

    /// Restores the section's raw content using `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is not protected, its payload is malformed or
    /// the provider rejects it.
    fn unprotect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError>;

    /// Ensures the section is written on save even if it appears unchanged.
    fn mark_force_save(&mut self, section: SectionId);

    /// Persists the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewritten text does not parse or cannot be written. The
    /// file on disk is left untouched in either case.
    fn save(&mut self, mode: SaveMode) -> Result<()>;
}

#[derive(Clone, Debug)]
enum Rewrite {
    Protected { provider: String, payload: Vec<u8> },
    Plain { outer: String },
}

/// An XML configuration file loaded into memory.
#[derive(Debug)]
pub struct XmlDocument {
    path: PathBuf,
    source: String,
    sections: Vec<Section>,
    rewrites: BTreeMap<usize, Rewrite>,
    force_save: BTreeSet<usize>,
}

impl XmlDocument {
    /// Reads and parses the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not well-formed XML.
    pub fn open(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::parse(path, source)
    }

    /// Parses `source` as the contents of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not well-formed XML or has no root element.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let source = source.into();
        let sections = input::extract_sections(&path, &source, &XmlFormat)?;
        debug!(path = %path.display(), elements = sections.len(), "document loaded");
        Ok(Self {
            path,
            source,
            sections,
            rewrites: BTreeMap::new(),
            force_save: BTreeSet::new(),
        })
    }

    #[must_use]
    /// Builds the edits a save would apply.
    ///
    /// A rewrite whose rendered text matches the stored text is dropped unless its
    /// section was marked for force-save.
    pub fn edit_plan(&self) -> EditPlan {
        let edits = self
            .rewrites
            .iter()
            .filter_map(|(&index, rewrite)| {
                let section = &self.sections[index];
                let replacement = self.render(index, rewrite);
                if replacement == section.outer(&self.source) && !self.force_save.contains(&index)
                {
                    debug!(section = %section.name, "rewrite matches stored text, skipping");
                    return None;
                }
                Some(Edit {
                    byte_start: section.byte_start,
                    byte_end: section.byte_end,
                    replacement,
                    item_name: section.name.clone(),
                })
            })
            .collect();

        EditPlan {
            file_name: self.path.display().to_string(),
            edits,
        }
    }

    fn child_named(&self, parent: usize, name: &str) -> Option<usize> {
        if self.is_rewritten(parent) {
            return None;
        }
        self.sections[parent]
            .children_indices
            .iter()
            .copied()
            .find(|&i| self.sections[i].name == name)
    }

    fn top_level(&self, name: &str) -> Option<usize> {
        if name == CONFIG_SECTIONS {
            return None;
        }
        self.child_named(0, name)
    }

    /// Whether the section or one of its ancestors has a pending rewrite.
    fn is_rewritten(&self, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if self.rewrites.contains_key(&i) {
                return true;
            }
            current = self.sections[i].parent_index;
        }
        false
    }

    fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        let mut current = self.sections[index].parent_index;
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.sections[i].parent_index;
        }
        false
    }

    fn protected_at(&self, index: usize) -> bool {
        match self.rewrites.get(&index) {
            Some(Rewrite::Protected { .. }) => true,
            Some(Rewrite::Plain { .. }) => false,
            None => self.sections[index].is_protected(),
        }
    }

    /// Element text with pending rewrites of nested sections spliced in.
    fn current_text(&self, index: usize) -> String {
        let section = &self.sections[index];
        let mut out = String::new();
        let mut cursor = section.byte_start;
        for (&i, rewrite) in self.rewrites.range(index + 1..) {
            let nested = &self.sections[i];
            if nested.byte_start >= section.byte_end {
                break;
            }
            if nested.byte_start < cursor {
                continue;
            }
            out.push_str(&self.source[cursor..nested.byte_start]);
            out.push_str(&self.render(i, rewrite));
            cursor = nested.byte_end;
        }
        out.push_str(&self.source[cursor..section.byte_end]);
        out
    }

    /// Decodes the payload stored in a protected element on disk.
    fn stored_payload(&self, index: usize) -> std::result::Result<Vec<u8>, ProviderError> {
        let section = &self.sections[index];
        let data = section
            .children_indices
            .iter()
            .map(|&i| &self.sections[i])
            .find(|s| s.name == ENCRYPTED_DATA)
            .ok_or_else(|| ProviderError::Malformed(format!("missing {ENCRYPTED_DATA} element")))?;
        let encoded: String = data.inner(&self.source).split_whitespace().collect();
        STANDARD
            .decode(encoded)
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    fn indent(&self, index: usize) -> &str {
        let start = self.sections[index].byte_start;
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.source[line_start..start];
        if prefix.chars().all(char::is_whitespace) {
            prefix
        } else {
            ""
        }
    }

    fn line_ending(&self) -> &'static str {
        if self.source.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn render(&self, index: usize, rewrite: &Rewrite) -> String {
        match rewrite {
            Rewrite::Plain { outer } => outer.clone(),
            Rewrite::Protected { provider, payload } => {
                let name = &self.sections[index].name;
                let indent = self.indent(index);
                let nl = self.line_ending();
                format!(
                    "<{name} {PROTECTION_ATTRIBUTE}=\"{provider}\">{nl}{indent}  <{ENCRYPTED_DATA}>{}</{ENCRYPTED_DATA}>{nl}{indent}</{name}>",
                    STANDARD.encode(payload)
                )
            }
        }
    }

    fn set_rewrite(&mut self, index: usize, rewrite: Rewrite) {
        let nested: Vec<usize> = self
            .rewrites
            .keys()
            .copied()
            .filter(|&i| self.is_descendant(i, index))
            .collect();
        for i in nested {
            self.rewrites.remove(&i);
            self.force_save.remove(&i);
        }
        self.rewrites.insert(index, rewrite);
    }
}

impl ConfigDocument for XmlDocument {
    fn top_level_section(&self, name: &str) -> Option<SectionId> {
        self.top_level(name).map(SectionId)
    }

    fn section_group(&self, name: &str) -> Option<GroupId> {
        self.top_level(name)
            .filter(|&i| !self.protected_at(i))
            .map(GroupId)
    }

    fn nested_group(&self, group: GroupId, name: &str) -> Option<GroupId> {
        self.child_named(group.0, name)
            .filter(|&i| !self.protected_at(i))
            .map(GroupId)
    }

    fn group_section(&self, group: GroupId, name: &str) -> Option<SectionId> {
        self.child_named(group.0, name).map(SectionId)
    }

    fn section_name(&self, section: SectionId) -> &str {
        &self.sections[section.0].name
    }

    fn is_protected(&self, section: SectionId) -> bool {
        self.protected_at(section.0)
    }

    fn protection_provider(&self, section: SectionId) -> Option<String> {
        match self.rewrites.get(&section.0) {
            Some(Rewrite::Protected { provider, .. }) => Some(provider.clone()),
            Some(Rewrite::Plain { .. }) => None,
            None => self.sections[section.0].protection_provider.clone(),
        }
    }

    fn protect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError> {
        let index = section.0;
        if !is_xml_name(provider.name()) {
            return Err(ProviderError::InvalidName(provider.name().to_string()));
        }
        let plain = match self.rewrites.get(&index) {
            Some(Rewrite::Protected { .. }) => {
                return Err(ProviderError::InvalidState("section is already protected"))
            }
            Some(Rewrite::Plain { outer }) => outer.clone(),
            None if self.sections[index].is_protected() => {
                return Err(ProviderError::InvalidState("section is already protected"))
            }
            None => self.current_text(index),
        };

        let payload = provider.protect(plain.as_bytes())?;
        debug!(
            section = %self.sections[index].name,
            line = self.sections[index].line,
            provider = provider.name(),
            "section protected in memory"
        );
        self.set_rewrite(
            index,
            Rewrite::Protected {
                provider: provider.name().to_string(),
                payload,
            },
        );
        Ok(())
    }

    fn unprotect(
        &mut self,
        section: SectionId,
        provider: &dyn ProtectionProvider,
    ) -> std::result::Result<(), ProviderError> {
        let index = section.0;
        let payload = match self.rewrites.get(&index) {
            Some(Rewrite::Protected { payload, .. }) => payload.clone(),
            Some(Rewrite::Plain { .. }) => {
                return Err(ProviderError::InvalidState("section is not protected"))
            }
            None if !self.sections[index].is_protected() => {
                return Err(ProviderError::InvalidState("section is not protected"))
            }
            None => self.stored_payload(index)?,
        };

        let plain = provider.unprotect(&payload)?;
        let outer = String::from_utf8(plain)
            .map_err(|_| ProviderError::Malformed("recovered section is not UTF-8".to_string()))?;
        debug!(
            section = %self.sections[index].name,
            line = self.sections[index].line,
            provider = provider.name(),
            "section unprotected in memory"
        );
        self.set_rewrite(index, Rewrite::Plain { outer });
        Ok(())
    }

    fn mark_force_save(&mut self, section: SectionId) {
        self.force_save.insert(section.0);
    }

    fn save(&mut self, mode: SaveMode) -> Result<()> {
        let plan = self.edit_plan();
        if plan.is_empty() && mode == SaveMode::Modified {
            debug!(path = %self.path.display(), "nothing to save");
            return Ok(());
        }

        let persistence = |source: std::io::Error| Error::Persistence {
            path: self.path.clone(),
            source,
        };
        let contents = plan.apply_to(&self.source).map_err(persistence)?;
        // Text that does not parse back never reaches disk.
        let sections = input::extract_sections(&self.path, &contents, &XmlFormat)?;
        write_atomic(&self.path, &contents).map_err(persistence)?;
        info!(path = %self.path.display(), edits = plan.edits.len(), "configuration saved");

        self.sections = sections;
        self.source = contents;
        self.rewrites.clear();
        self.force_save.clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/document.rs"]
mod tests;
