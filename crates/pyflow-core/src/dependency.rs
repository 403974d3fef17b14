//! Bounded breadth-first reachability over the graph

use std::collections::{HashSet, VecDeque};

use petgraph::Direction;

use crate::graph::Graph;
use crate::model::GraphEdge;

/// Everything reachable from `start_ids` along outgoing edges.
///
/// `max_depth` bounds the number of hops; 0 means unlimited. Unknown start
/// ids are skipped with a warning.
pub fn get_used_nodes<S: AsRef<str>>(graph: &Graph, start_ids: &[S], max_depth: usize) -> Graph {
    walk(graph, start_ids, max_depth, Direction::Outgoing)
}

/// Everything from which one of `start_ids` is reachable, following incoming
/// edges. Same depth and skipping rules as [`get_used_nodes`].
pub fn get_dependent_nodes<S: AsRef<str>>(
    graph: &Graph,
    start_ids: &[S],
    max_depth: usize,
) -> Graph {
    walk(graph, start_ids, max_depth, Direction::Incoming)
}

fn walk<S: AsRef<str>>(
    graph: &Graph,
    start_ids: &[S],
    max_depth: usize,
    direction: Direction,
) -> Graph {
    let mut result = Graph::new();
    let mut visited: HashSet<&str> = HashSet::new();

    for start in start_ids.iter().map(AsRef::as_ref) {
        let Some(start_node) = graph.node(start) else {
            tracing::warn!("Start node {} not found, skipping", start);
            continue;
        };
        if !visited.insert(start_node.id.as_str()) {
            continue;
        }
        result.add_node(start_node.clone());

        let mut queue: VecDeque<(usize, &str)> = VecDeque::from([(0, start_node.id.as_str())]);
        while let Some((depth, current)) = queue.pop_front() {
            let edges: Box<dyn Iterator<Item = &GraphEdge> + '_> = match direction {
                Direction::Outgoing => Box::new(graph.edges_out(current)),
                Direction::Incoming => Box::new(graph.edges_in(current)),
            };
            for edge in edges {
                let next = match direction {
                    Direction::Outgoing => edge.target.as_str(),
                    Direction::Incoming => edge.source.as_str(),
                };
                let Some(next_node) = graph.node(next) else {
                    continue;
                };

                if visited.insert(next_node.id.as_str()) {
                    result.add_node(next_node.clone());
                    if max_depth == 0 || depth + 1 < max_depth {
                        queue.push_back((depth + 1, next_node.id.as_str()));
                    }
                }
                result.add_edge(edge.clone());
            }
        }
    }

    tracing::debug!(
        "Walked {:?} from {} start ids: {} nodes, {} edges",
        direction,
        start_ids.len(),
        result.node_count(),
        result.edge_count()
    );
    result
}
