//! Test utilities for pyflow-indexer

use std::fs;

use pyflow_core::Graph;
use tempfile::TempDir;

/// Write `files` (project-relative path, contents) into a fresh temp dir.
pub fn create_python_project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

/// One `kind src -> dest` line per edge, sorted.
pub fn edge_lines(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .edges()
        .map(|e| format!("{} {} -> {}", e.kind, e.source, e.target))
        .collect();
    lines.sort();
    lines
}

/// `id (kind)` per node, sorted.
pub fn node_lines(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph.nodes().map(|n| format!("{} ({})", n.id, n.kind)).collect();
    lines.sort();
    lines
}
