//! Section representation for tree-sitter parsed configuration documents.
//!
//! A section is one element of the document. Sections track their position in the
//! element tree through parent/child indices into a flat arena and keep precise byte
//! coordinates so a single element can be replaced without touching its neighbours.

/// Attribute naming the provider that protected a section.
pub const PROTECTION_ATTRIBUTE: &str = "configProtectionProvider";
/// Child element holding a protected section's payload.
pub const ENCRYPTED_DATA: &str = "EncryptedData";
/// Declaration block that is never addressable as a section.
pub const CONFIG_SECTIONS: &str = "configSections";

/// Whether `name` is a well-formed XML name, safe to write unescaped into a tag or
/// attribute value.
#[must_use]
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
}

#[derive(Clone, Debug)]
/// One element of the document with coordinates for extraction and replacement.
pub struct Section {
    /// Element name as written in the start tag.
    pub name: String,
    /// Line of the start tag (1-indexed), for diagnostics.
    pub line: usize,
    /// Byte offset where the element begins (the `<` of its start tag).
    pub byte_start: usize,
    /// Byte offset just past the element's end tag.
    pub byte_end: usize,
    /// Byte offset where the element content begins.
    pub content_start: usize,
    /// Byte offset where the element content ends.
    pub content_end: usize,
    /// Provider named by the protection attribute, if the element carries one.
    pub protection_provider: Option<String>,
    /// Index of the containing element in the arena.
    pub parent_index: Option<usize>,
    /// Indices of directly nested elements.
    pub children_indices: Vec<usize>,
}

impl Section {
    #[must_use]
    /// Whether the element is marked as protected on disk.
    pub fn is_protected(&self) -> bool {
        self.protection_provider.is_some()
    }

    #[must_use]
    /// The full element text, start tag through end tag.
    pub fn outer<'a>(&self, source: &'a str) -> &'a str {
        &source[self.byte_start..self.byte_end]
    }

    #[must_use]
    /// The text between the start and end tags.
    pub fn inner<'a>(&self, source: &'a str) -> &'a str {
        &source[self.content_start..self.content_end]
    }
}
