//! Structural diff between two graph snapshots

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::*;

/// Compare two snapshots that share the same id scheme.
///
/// The result holds the union of both node sets. Every node and edge carries
/// its [`DiffStatus`] under [`DIFF_STATUS_KEY`]. Common nodes take their new
/// version. Neither input is modified.
pub fn diff(old: &Graph, new: &Graph) -> Graph {
    let mut result = Graph::new();

    for node in new.nodes() {
        let status = match old.node(&node.id) {
            None => DiffStatus::New,
            Some(previous) if previous.hash != node.hash => DiffStatus::Changed,
            Some(_) => DiffStatus::Unchanged,
        };
        result.add_node(node.clone().with_diff_status(status));
    }
    for node in old.nodes().filter(|n| !new.contains(&n.id)) {
        result.add_node(node.clone().with_diff_status(DiffStatus::Deleted));
    }

    for node in new.nodes() {
        if !old.contains(&node.id) {
            for edge in new.edges_out(&node.id) {
                result.add_edge(edge.clone().with_diff_status(DiffStatus::New));
            }
            continue;
        }

        let before: HashSet<EdgeKey> = old.edges_out(&node.id).map(GraphEdge::key).collect();
        for edge in new.edges_out(&node.id) {
            let status = if before.contains(&edge.key()) {
                DiffStatus::Unchanged
            } else {
                DiffStatus::New
            };
            result.add_edge(edge.clone().with_diff_status(status));
        }
        for edge in old.edges_out(&node.id) {
            if !new.has_edge(&edge.key()) {
                result.add_edge(edge.clone().with_diff_status(DiffStatus::Deleted));
            }
        }
    }

    for node in old.nodes().filter(|n| !new.contains(&n.id)) {
        for edge in old.edges_out(&node.id) {
            result.add_edge(edge.clone().with_diff_status(DiffStatus::Deleted));
        }
    }

    tracing::debug!("Diff: {}", DiffSummary::from_graph(&result));
    result
}

/// Per-status counts over a diff graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub new_nodes: usize,
    pub deleted_nodes: usize,
    pub changed_nodes: usize,
    pub unchanged_nodes: usize,
    pub new_edges: usize,
    pub deleted_edges: usize,
    pub unchanged_edges: usize,
}

impl DiffSummary {
    /// Count statuses in a graph produced by [`diff`]. Unlabelled items are ignored.
    pub fn from_graph(graph: &Graph) -> Self {
        let mut summary = DiffSummary::default();
        for node in graph.nodes() {
            match node.diff_status() {
                Some(DiffStatus::New) => summary.new_nodes += 1,
                Some(DiffStatus::Deleted) => summary.deleted_nodes += 1,
                Some(DiffStatus::Changed) => summary.changed_nodes += 1,
                Some(DiffStatus::Unchanged) => summary.unchanged_nodes += 1,
                None => {}
            }
        }
        for edge in graph.edges() {
            match edge.diff_status() {
                Some(DiffStatus::New) => summary.new_edges += 1,
                Some(DiffStatus::Deleted) => summary.deleted_edges += 1,
                Some(DiffStatus::Unchanged) => summary.unchanged_edges += 1,
                // Edges are never classified as changed
                Some(DiffStatus::Changed) | None => {}
            }
        }
        summary
    }

    /// True when nothing was added, removed or changed.
    pub fn is_unchanged(&self) -> bool {
        self.new_nodes == 0
            && self.deleted_nodes == 0
            && self.changed_nodes == 0
            && self.new_edges == 0
            && self.deleted_edges == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes +{} -{} ~{} ={}, edges +{} -{} ={}",
            self.new_nodes,
            self.deleted_nodes,
            self.changed_nodes,
            self.unchanged_nodes,
            self.new_edges,
            self.deleted_edges,
            self.unchanged_edges
        )
    }
}
