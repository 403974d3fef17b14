//! Graph wrapper using petgraph::StableDiGraph keyed by string node ids

use crate::model::*;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// The dependency graph: a directed graph whose nodes are addressed by id.
///
/// petgraph keeps outgoing and incoming adjacency in one structure, so every
/// edge insertion or removal updates both directions at once. Edges are
/// deduplicated by [`EdgeKey`] and self-loops are never stored.
#[derive(Clone)]
pub struct Graph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    /// Edges inserted unchecked, keyed by the endpoint they are waiting for.
    pending: HashMap<String, Vec<GraphEdge>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .field("pending_edges", &self.pending_edge_count())
            .finish()
    }
}

/// Outcome of [`Graph::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub nodes_skipped: usize,
    pub edges_rejected: usize,
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Add a node. Returns false if a node with the same id already exists.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(id.clone(), idx);

        if let Some(parked) = self.pending.remove(&id) {
            for edge in parked {
                self.add_edge_unchecked(edge);
            }
        }
        true
    }

    /// Add an edge whose endpoints must already exist.
    ///
    /// Returns false if either endpoint is missing. Self-loops and edges whose
    /// identity is already present are accepted without being stored.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let (Some(&source), Some(&target)) =
            (self.index.get(&edge.source), self.index.get(&edge.target))
        else {
            tracing::debug!(
                "Rejected {} edge {} -> {}: missing endpoint",
                edge.kind,
                edge.source,
                edge.target
            );
            return false;
        };
        self.insert_between(source, target, edge);
        true
    }

    /// Add an edge without requiring its endpoints to exist yet.
    ///
    /// An edge with a missing endpoint is parked and materialized once that
    /// endpoint is added, so the graph never exposes a dangling edge.
    pub fn add_edge_unchecked(&mut self, edge: GraphEdge) -> bool {
        if edge.is_self_loop() {
            return true;
        }
        let source = self.index.get(&edge.source).copied();
        let target = self.index.get(&edge.target).copied();
        match (source, target) {
            (Some(source), Some(target)) => self.insert_between(source, target, edge),
            (None, _) => self
                .pending
                .entry(edge.source.clone())
                .or_default()
                .push(edge),
            (_, None) => self
                .pending
                .entry(edge.target.clone())
                .or_default()
                .push(edge),
        }
        true
    }

    fn insert_between(&mut self, source: NodeIndex, target: NodeIndex, edge: GraphEdge) {
        if source == target {
            return;
        }
        let duplicate = self
            .inner
            .edges_directed(source, Direction::Outgoing)
            .any(|e| e.target() == target && e.weight().same_identity(&edge));
        if !duplicate {
            self.inner.add_edge(source, target, edge);
        }
    }

    /// Number of unchecked edges still waiting for an endpoint.
    pub fn pending_edge_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Remove a node and all its incident edges.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(idx) => {
                self.inner.remove_node(idx);
                true
            }
            None => false,
        }
    }

    /// Remove an edge by identity.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> bool {
        match self.find_edge(key) {
            Some(idx) => self.inner.remove_edge(idx).is_some(),
            None => false,
        }
    }

    fn find_edge(&self, key: &EdgeKey) -> Option<EdgeIndex> {
        let source = *self.index.get(&key.source)?;
        self.inner
            .edges_directed(source, Direction::Outgoing)
            .find(|e| {
                let w = e.weight();
                w.target == key.target && w.kind == key.kind && w.provenance == key.provenance
            })
            .map(|e| e.id())
    }

    pub fn has_edge(&self, key: &EdgeKey) -> bool {
        self.find_edge(key).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index
            .get(id)
            .and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Replace an existing node, keeping its edges. False if the id is unknown.
    pub fn update_node(&mut self, node: GraphNode) -> bool {
        match self.index.get(&node.id) {
            Some(&idx) => match self.inner.node_weight_mut(idx) {
                Some(slot) => {
                    *slot = node;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn set_hash(&mut self, id: &str, hash: impl Into<String>) -> bool {
        match self.node_weight_mut(id) {
            Some(node) => {
                node.hash = hash.into();
                true
            }
            None => false,
        }
    }

    pub fn set_node_meta(&mut self, id: &str, key: &str, value: impl Into<String>) -> bool {
        match self.node_weight_mut(id) {
            Some(node) => {
                node.metadata.insert(key.to_string(), value.into());
                true
            }
            None => false,
        }
    }

    // Ids are never handed out mutably, so the index cannot drift.
    fn node_weight_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        let idx = *self.index.get(id)?;
        self.inner.node_weight_mut(idx)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Iterate over all edges.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// Get all outgoing edges from a node. Empty for unknown ids.
    pub fn edges_out<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphEdge> + use<'a> {
        self.edges_directed(id, Direction::Outgoing)
    }

    /// Get all incoming edges to a node. Empty for unknown ids.
    pub fn edges_in<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a GraphEdge> + use<'a> {
        self.edges_directed(id, Direction::Incoming)
    }

    fn edges_directed<'a>(
        &'a self,
        id: &str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a GraphEdge> + use<'a> {
        let idx = self.index.get(id).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, direction)
                .map(|edge_ref| edge_ref.weight())
        })
    }

    /// Ids of the nodes `id` directly contains.
    pub fn children<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.edges_out(id)
            .filter(|e| e.kind == EdgeKind::Contain)
            .map(|e| e.target.as_str())
    }

    /// Get all nodes of a specific kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes().filter(move |n| n.kind == kind)
    }

    /// Overlay another graph onto this one.
    ///
    /// Existing nodes win over incoming nodes with the same id; incoming edges
    /// are inserted checked after all incoming nodes are in place.
    pub fn merge(&mut self, other: &Graph) -> MergeReport {
        let mut report = MergeReport::default();
        for node in other.nodes() {
            if self.add_node(node.clone()) {
                report.nodes_added += 1;
            } else {
                report.nodes_skipped += 1;
            }
        }
        for edge in other.edges() {
            if !self.add_edge(edge.clone()) {
                report.edges_rejected += 1;
            }
        }
        report
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
