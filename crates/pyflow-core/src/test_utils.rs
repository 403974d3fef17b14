//! Test utilities for pyflow-core

use crate::graph::Graph;
use crate::hasher::digest_bytes;
use crate::model::*;

/// Build a code graph from node and edge lists. Panics on a rejected edge.
pub fn graph_from(nodes: &[(&str, NodeKind)], edges: &[(&str, &str, EdgeKind)]) -> Graph {
    let mut graph = Graph::new();
    for (id, kind) in nodes {
        let name = id.rsplit(['/', ENTITY_SEPARATOR]).next().unwrap_or(*id);
        let mut node = GraphNode::code(*id, name, *kind);
        if kind.is_code_entity() {
            node.hash = digest_bytes(id.as_bytes());
        }
        assert!(graph.add_node(node), "duplicate fixture node {id}");
    }
    for (src, dest, kind) in edges {
        assert!(
            graph.add_edge(GraphEdge::code(*src, *dest, *kind)),
            "fixture edge {src} -> {dest} has a missing endpoint"
        );
    }
    graph
}

/// Directory `d` with file `d/f.py` declaring `a` and `b`, where `b` calls `a`.
pub fn scenario_graph() -> Graph {
    graph_from(
        &[
            (ROOT_NODE_ID, NodeKind::Directory),
            ("d", NodeKind::Directory),
            ("d/f.py", NodeKind::File),
            ("d/f.py#a", NodeKind::Function),
            ("d/f.py#b", NodeKind::Function),
        ],
        &[
            (ROOT_NODE_ID, "d", EdgeKind::Contain),
            ("d", "d/f.py", EdgeKind::Contain),
            ("d/f.py", "d/f.py#a", EdgeKind::Contain),
            ("d/f.py", "d/f.py#b", EdgeKind::Contain),
            ("d/f.py#b", "d/f.py#a", EdgeKind::Use),
        ],
    )
}

/// One `kind src -> dest (provenance)` line per edge, sorted.
pub fn edge_lines(graph: &Graph) -> Vec<String> {
    let mut lines: Vec<String> = graph
        .edges()
        .map(|e| format!("{} {} -> {} ({})", e.kind, e.source, e.target, e.provenance))
        .collect();
    lines.sort();
    lines
}

/// Node ids, sorted.
pub fn node_ids(graph: &Graph) -> Vec<String> {
    let mut ids: Vec<String> = graph.nodes().map(|n| n.id.clone()).collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_graph_shape() {
        let graph = scenario_graph();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.node("d/f.py#a").map(|n| n.name.as_str()), Some("a"));
        assert_eq!(graph.node("d/f.py").map(|n| n.name.as_str()), Some("f.py"));
        assert!(graph.node("d/f.py#b").is_some_and(|n| !n.hash.is_empty()));
    }
}
