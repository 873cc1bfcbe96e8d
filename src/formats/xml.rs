//! XML format implementation using tree-sitter-xml.
//!
//! Node kinds follow the W3C XML production names as exposed by the
//! grammar (`element`, `STag`, `ETag`, `EmptyElemTag`, `Attribute`, `AttValue`).

use crate::formats::Format;

/// Tree-sitter queries and node kinds for XML configuration files.
pub struct XmlFormat;

impl Format for XmlFormat {
    fn language(&self) -> tree_sitter::Language {
        tree_sitter_xml::LANGUAGE_XML.into()
    }

    fn section_query(&self) -> &'static str {
        "(element) @section"
    }

    fn start_tag_kinds(&self) -> &[&str] {
        &["STag", "EmptyElemTag"]
    }

    fn end_tag_kind(&self) -> &'static str {
        "ETag"
    }

    fn name_kind(&self) -> &'static str {
        "Name"
    }

    fn attribute_kind(&self) -> &'static str {
        "Attribute"
    }

    fn attribute_value_kind(&self) -> &'static str {
        "AttValue"
    }
}
