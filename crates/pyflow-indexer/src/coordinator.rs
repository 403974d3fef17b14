//! Walks a project and assembles its dependency graph

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;
use ignore::WalkBuilder;
use pyflow_core::{
    EdgeKind, Graph, GraphEdge, GraphNode, NodeKind, ROOT_NODE_ID, recalculate_hashes,
};

use crate::config::IndexConfig;
use crate::extractor::{ExtractError, ExtractionResult, LanguageExtractor, SourceFile, file_id};
use crate::languages::extractor_for;
use crate::parser::FileType;

/// Counters for one full index run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub entities: usize,
    pub usage_edges: usize,
    /// Candidate use edges whose target is not an entity of the project.
    pub dropped_candidates: usize,
    /// Names that matched neither a sibling declaration nor an import.
    pub unresolved_references: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files parsed, {} skipped, {} entities, {} use edges ({} candidates dropped, {} names unresolved)",
            self.files_parsed,
            self.files_skipped,
            self.entities,
            self.usage_edges,
            self.dropped_candidates,
            self.unresolved_references
        )
    }
}

pub struct Coordinator {
    root: PathBuf,
    config: IndexConfig,
}

impl Coordinator {
    pub fn new(root: impl Into<PathBuf>, config: IndexConfig) -> Self {
        Self { root: root.into(), config }
    }

    /// Coordinator configured from the project's own `pyflow.toml`, if any.
    pub fn for_project(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = IndexConfig::for_project(&root)
            .with_context(|| format!("failed to load config for {}", root.display()))?;
        Ok(Self::new(root, config))
    }

    /// Build the hashed graph of every indexed file under the root.
    ///
    /// Use edges are only materialised once every file has been extracted,
    /// and only between entities that exist.
    pub fn run_full_index(&self) -> Result<(Graph, IndexStats)> {
        if !self.root.is_dir() {
            anyhow::bail!("project root {} is not a directory", self.root.display());
        }
        let excluded = self.config.exclude_set().context("invalid exclude patterns")?;
        let files = self.source_files(&excluded);
        tracing::info!("Indexing {} files under {}", files.len(), self.root.display());

        let mut graph = Graph::new();
        graph.add_node(GraphNode::code(ROOT_NODE_ID, ROOT_NODE_ID, NodeKind::Directory));

        let mut extractors: HashMap<FileType, Box<dyn LanguageExtractor>> = HashMap::new();
        let mut candidates: Vec<GraphEdge> = Vec::new();
        let mut stats = IndexStats::default();

        for relative in &files {
            let file_node = add_file_node(&mut graph, relative);
            let Some(file_type) = FileType::from_path(relative) else {
                tracing::debug!("No extractor for {}, keeping an empty file node", file_node);
                continue;
            };
            let extractor = match extractors.entry(file_type) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(
                    extractor_for(file_type).context("failed to load tree-sitter grammar")?,
                ),
            };

            let result = match self.extract_file(extractor.as_mut(), relative) {
                Ok(result) => result,
                Err(err) if !self.config.strict => {
                    tracing::warn!("Skipping {}: {:#}", file_node, err);
                    stats.files_skipped += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            stats.files_parsed += 1;
            stats.unresolved_references += result.unresolved;
            for node in result.nodes {
                let id = node.id.clone();
                if graph.add_node(node) {
                    graph.add_edge(GraphEdge::code(file_node.as_str(), id, EdgeKind::Contain));
                    stats.entities += 1;
                }
            }
            candidates.extend(result.usages);
        }

        for edge in candidates {
            if graph.contains(&edge.source) && graph.contains(&edge.target) {
                graph.add_edge(edge);
                stats.usage_edges += 1;
            } else {
                tracing::debug!("Dropping use edge {} -> {}", edge.source, edge.target);
                stats.dropped_candidates += 1;
            }
        }

        recalculate_hashes(&mut graph);
        tracing::info!("Index complete: {}", stats);
        Ok((graph, stats))
    }

    /// Project-relative paths of indexed files, in walk order.
    fn source_files(&self, excluded: &GlobSet) -> Vec<PathBuf> {
        let ignored = self.config.ignored_dirs.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_ignore(self.config.respect_gitignore)
            .git_exclude(self.config.respect_gitignore)
            .git_global(false)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            entry.depth() == 0
                || !is_dir
                || !ignored.iter().any(|dir| entry.file_name() == dir.as_str())
        });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Walk error: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.config.has_indexed_extension(relative) {
                continue;
            }
            if excluded.is_match(file_id(relative)) {
                tracing::debug!("Excluded {}", relative.display());
                continue;
            }
            files.push(relative.to_path_buf());
        }
        files
    }

    fn extract_file(
        &self,
        extractor: &mut dyn LanguageExtractor,
        relative: &Path,
    ) -> Result<ExtractionResult> {
        let path = self.root.join(relative);
        let content =
            std::fs::read(&path).map_err(|source| ExtractError::Io { path: path.clone(), source })?;
        let file = SourceFile {
            project_root: &self.root,
            relative_path: relative,
            content: &content,
        };
        let result = extractor.extract(&file)?;
        Ok(result)
    }
}

/// Add the file node and any missing ancestor directories; returns its id.
fn add_file_node(graph: &mut Graph, relative: &Path) -> String {
    let mut parent = ROOT_NODE_ID.to_string();
    let dir_id = relative.parent().map(file_id).unwrap_or_default();
    let mut prefix = String::new();
    for segment in dir_id.split('/').filter(|s| !s.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);
        if graph.add_node(GraphNode::code(prefix.as_str(), segment, NodeKind::Directory)) {
            graph.add_edge(GraphEdge::code(parent.as_str(), prefix.as_str(), EdgeKind::Contain));
        }
        parent = prefix.clone();
    }

    let id = file_id(relative);
    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.clone());
    if graph.add_node(GraphNode::code(id.as_str(), name, NodeKind::File)) {
        graph.add_edge(GraphEdge::code(parent, id.as_str(), EdgeKind::Contain));
    }
    id
}
