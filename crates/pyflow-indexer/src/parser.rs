//! Tree-sitter parser setup for supported source files

use std::path::Path;

use pyflow_core::digest_bytes;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::extractor::ExtractError;

/// Supported file types for parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Python,
}

impl FileType {
    /// Determine file type from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" | "pyi" => Some(FileType::Python),
            _ => None,
        }
    }

    /// Get the tree-sitter language for this file type
    pub fn language(self) -> Language {
        match self {
            FileType::Python => tree_sitter_python::LANGUAGE.into(),
        }
    }
}

/// A parser bound to one grammar. Not shareable across threads.
pub struct SourceParser {
    parser: Parser,
}

impl SourceParser {
    pub fn new(file_type: FileType) -> Result<Self, ExtractError> {
        let mut parser = Parser::new();
        parser.set_language(&file_type.language())?;
        Ok(Self { parser })
    }

    /// Parse `source`, rejecting trees that contain syntax errors.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree, ExtractError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::Aborted { path: path.to_path_buf() })?;

        if tree.root_node().has_error() {
            let line = first_error_line(tree.root_node()).unwrap_or(1);
            return Err(ExtractError::Syntax { path: path.to_path_buf(), line });
        }
        Ok(tree)
    }
}

/// 1-based line of the first error or missing node, in document order.
fn first_error_line(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error_line);
    found
}

/// Digest of the canonical form of `nodes`, taken in order.
///
/// The form is `(kind "leaf text" children...)` in pre-order with comments
/// dropped, so layout and comment edits never change the digest.
pub fn structural_hash(nodes: &[Node<'_>], source: &[u8]) -> String {
    let mut canonical = String::new();
    for node in nodes {
        write_canonical(*node, source, &mut canonical);
    }
    digest_bytes(canonical.as_bytes())
}

fn write_canonical(node: Node<'_>, source: &[u8], out: &mut String) {
    if node.kind() == "comment" {
        return;
    }
    out.push('(');
    out.push_str(node.kind());
    if node.child_count() == 0 {
        let text = node.utf8_text(source).unwrap_or_default();
        out.push_str(&format!(" {text:?}"));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        out.push(' ');
        write_canonical(child, source, out);
    }
    out.push(')');
}
