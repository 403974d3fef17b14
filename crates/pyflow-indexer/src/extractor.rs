//! Language extractor trait definition

use std::path::{Component, Path, PathBuf};

use pyflow_core::{GraphEdge, GraphNode};
use thiserror::Error;

/// Failure to turn one source file into entities.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8: {source}", path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("syntax error in {} at line {line}", path.display())]
    Syntax { path: PathBuf, line: usize },

    #[error("parser returned no tree for {}", path.display())]
    Aborted { path: PathBuf },

    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

/// One import statement. Plain imports produce one record per imported module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    /// Dotted module path without the leading dots of a relative import.
    pub module: String,
    /// Number of leading dots; 0 for absolute imports.
    pub level: usize,
    /// `import a.b as c` alias.
    pub alias: Option<String>,
    /// Names of a `from` import. Empty for plain imports.
    pub objects: Vec<ImportedName>,
    pub is_from: bool,
    pub wildcard: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// The local name this import binds.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Entities, candidate use edges and imports of a single file.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub file_id: String,
    pub nodes: Vec<GraphNode>,
    pub usages: Vec<GraphEdge>,
    pub imports: Vec<ImportRecord>,
    /// References that matched neither a sibling nor an import.
    pub unresolved: usize,
}

/// A source file handed to an extractor.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub project_root: &'a Path,
    pub relative_path: &'a Path,
    pub content: &'a [u8],
}

impl SourceFile<'_> {
    pub fn file_id(&self) -> String {
        file_id(self.relative_path)
    }

    pub fn absolute_path(&self) -> PathBuf {
        self.project_root.join(self.relative_path)
    }
}

pub trait LanguageExtractor {
    fn extract(&mut self, file: &SourceFile<'_>) -> Result<ExtractionResult, ExtractError>;
}

/// Project-relative path joined with `/`, independent of the host separator.
pub fn file_id(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
