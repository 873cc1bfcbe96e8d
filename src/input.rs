//! Locating the configuration file and extracting its section hierarchy.

use crate::error::{Error, Result};
use crate::formats::Format;
use crate::section::{Section, PROTECTION_ATTRIBUTE};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

/// Resolves the conventionally-named configuration file inside `folder`.
///
/// # Errors
///
/// Returns [`Error::FileNotFound`] if no such file exists.
pub fn find_document(folder: &Path, file_name: &str) -> Result<PathBuf> {
    let path = folder.join(file_name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::FileNotFound {
            file_name: file_name.to_string(),
            path,
        })
    }
}

/// Parses `source` and returns every element as a [`Section`] in document order.
///
/// The first entry is the root element. Parent/child indices refer to positions in the
/// returned vector.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the grammar cannot be loaded, the document contains
/// syntax errors or there is no root element.
pub fn extract_sections(path: &Path, source: &str, format: &impl Format) -> Result<Vec<Section>> {
    let parse_error = |reason: String| Error::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let language = format.language();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| parse_error(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| parse_error("parser produced no tree".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error(root).map_or(0, |n| n.start_position().row + 1);
        return Err(parse_error(format!("syntax error near line {line}")));
    }

    let query =
        Query::new(&language, format.section_query()).map_err(|e| parse_error(e.to_string()))?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source.as_bytes());

    let mut sections: Vec<Section> = Vec::new();
    let mut index_by_node: HashMap<usize, usize> = HashMap::new();

    while let Some(m) = matches.next() {
        for capture in m.captures {
            let node = capture.node;
            let section = read_element(node, source, format, &index_by_node)
                .ok_or_else(|| {
                    parse_error(format!(
                        "unreadable element at line {}",
                        node.start_position().row + 1
                    ))
                })?;

            let index = sections.len();
            if let Some(parent) = section.parent_index {
                sections[parent].children_indices.push(index);
            }
            index_by_node.insert(node.id(), index);
            sections.push(section);
        }
    }

    if sections.is_empty() {
        return Err(parse_error("no root element".to_string()));
    }

    Ok(sections)
}

fn read_element(
    node: Node<'_>,
    source: &str,
    format: &impl Format,
    index_by_node: &HashMap<usize, usize>,
) -> Option<Section> {
    let start_tag = find_child(node, format.start_tag_kinds())?;
    let name = text(find_child(start_tag, &[format.name_kind()])?, source)?.to_string();

    let mut protection_provider = None;
    let mut cursor = start_tag.walk();
    for attribute in start_tag
        .children(&mut cursor)
        .filter(|child| child.kind() == format.attribute_kind())
    {
        let key = find_child(attribute, &[format.name_kind()]).and_then(|n| text(n, source));
        if key == Some(PROTECTION_ATTRIBUTE) {
            protection_provider = find_child(attribute, &[format.attribute_value_kind()])
                .and_then(|n| text(n, source))
                .map(|v| v.trim_matches(|c| c == '"' || c == '\'').to_string());
        }
    }

    let (content_start, content_end) = match find_child(node, &[format.end_tag_kind()]) {
        Some(end_tag) => (start_tag.end_byte(), end_tag.start_byte()),
        None => (node.end_byte(), node.end_byte()),
    };

    let parent_index = enclosing_element(node).and_then(|p| index_by_node.get(&p.id()).copied());

    Some(Section {
        name,
        line: node.start_position().row + 1,
        byte_start: node.start_byte(),
        byte_end: node.end_byte(),
        content_start,
        content_end,
        protection_provider,
        parent_index,
        children_indices: Vec::new(),
    })
}

fn find_child<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()));
    found
}

fn enclosing_element(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        if candidate.kind() == node.kind() {
            return Some(candidate);
        }
        current = candidate.parent();
    }
    None
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

fn text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    source.get(node.start_byte()..node.end_byte())
}

#[cfg(test)]
#[path = "tests/input.rs"]
mod tests;
