//! Format trait and implementations for different document types.
//!
//! This module defines the `Format` trait which abstracts over markup grammars by
//! providing the tree-sitter language, the query that captures elements and the node
//! kinds needed to read an element's name, attributes and content boundaries.

pub mod xml;

/// Grammar-specific knowledge needed to turn a syntax tree into sections.
pub trait Format {
    /// Tree-sitter language used to parse documents.
    fn language(&self) -> tree_sitter::Language;
    /// Query capturing every element node as `@section`.
    fn section_query(&self) -> &str;
    /// Node kinds of tags that open an element (including self-closing tags).
    fn start_tag_kinds(&self) -> &[&str];
    /// Node kind of the tag that closes an element.
    fn end_tag_kind(&self) -> &str;
    /// Node kind of an element or attribute name.
    fn name_kind(&self) -> &str;
    /// Node kind of an attribute.
    fn attribute_kind(&self) -> &str;
    /// Node kind of a quoted attribute value.
    fn attribute_value_kind(&self) -> &str;
}
