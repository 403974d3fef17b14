//! Contraction of code entities into architecture elements
//!
//! Each requested element absorbs the nodes it directly contains: the element
//! takes over their inbound and outbound edges and the absorbed nodes are
//! dropped from the result. A node contained by two elements couples them.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::Graph;
use crate::model::{EdgeKind, GraphEdge, GraphNode, NodeKind};

/// Id of the element that absorbs everything left over in combine mode.
pub const CATCH_ALL_ELEMENT_ID: &str = "other_unknown";

/// Contract `element_ids` in a copy of `graph`.
///
/// Ids that are unknown, not architecture elements, or repeated are skipped
/// with a warning. With `combine_remaining`, every node not covered by a
/// contracted element is absorbed into [`CATCH_ALL_ELEMENT_ID`].
pub fn contract<S: AsRef<str>>(graph: &Graph, element_ids: &[S], combine_remaining: bool) -> Graph {
    let mut contractor = Contractor::new(graph);
    for id in element_ids {
        contractor.contract_element(id.as_ref());
    }
    if combine_remaining {
        contractor.combine_remaining();
    }
    contractor.finish()
}

struct Contractor<'g> {
    source: &'g Graph,
    work: Graph,
    /// Absorbed node id -> elements that absorbed it.
    absorbed_in: HashMap<String, BTreeSet<String>>,
    contracted: HashSet<String>,
}

impl<'g> Contractor<'g> {
    fn new(source: &'g Graph) -> Self {
        Contractor {
            source,
            work: source.clone(),
            absorbed_in: HashMap::new(),
            contracted: HashSet::new(),
        }
    }

    fn contract_element(&mut self, element: &str) {
        if self.contracted.contains(element) {
            tracing::warn!("Element {} was already contracted, skipping", element);
            return;
        }
        match self.source.node(element) {
            Some(node) if node.kind == NodeKind::ArchElement => {}
            Some(node) => {
                tracing::warn!(
                    "Cannot contract {}: type is {}, expected {}",
                    element,
                    node.kind,
                    NodeKind::ArchElement
                );
                return;
            }
            None => {
                tracing::warn!("Cannot contract {}: no such node", element);
                return;
            }
        }

        let mut seen = HashSet::new();
        let members: Vec<String> = self
            .source
            .children(element)
            .filter(|child| seen.insert(*child))
            .map(str::to_string)
            .collect();
        tracing::debug!("Contracting {} into {} members", element, members.len());

        self.absorb(element, &members);
        self.contracted.insert(element.to_string());
    }

    fn combine_remaining(&mut self) {
        let remaining: Vec<String> = self
            .source
            .nodes()
            .map(|n| n.id.as_str())
            .filter(|id| {
                !self.absorbed_in.contains_key(*id)
                    && !self.contracted.contains(*id)
                    && *id != CATCH_ALL_ELEMENT_ID
            })
            .map(str::to_string)
            .collect();
        if remaining.is_empty() {
            return;
        }

        self.work.add_node(GraphNode::hand(
            CATCH_ALL_ELEMENT_ID,
            CATCH_ALL_ELEMENT_ID,
            NodeKind::ArchElement,
        ));
        tracing::debug!(
            "Combining {} remaining nodes into {}",
            remaining.len(),
            CATCH_ALL_ELEMENT_ID
        );
        self.absorb(CATCH_ALL_ELEMENT_ID, &remaining);
        self.contracted.insert(CATCH_ALL_ELEMENT_ID.to_string());
    }

    /// Rewire every member onto `element`, then record the absorption.
    ///
    /// Members are recorded only after all of them are rewired, so edges
    /// between two members of the same element are never redirected onto the
    /// element itself.
    fn absorb(&mut self, element: &str, members: &[String]) {
        for member in members {
            self.rewire(element, member);
        }
        for member in members {
            self.absorbed_in
                .entry(member.clone())
                .or_default()
                .insert(element.to_string());
        }
    }

    fn rewire(&mut self, element: &str, member: &str) {
        let source = self.source;

        let owners: Vec<String> = self
            .absorbed_in
            .get(member)
            .map(|owners| owners.iter().cloned().collect())
            .unwrap_or_default();
        for owner in owners.iter().filter(|owner| owner.as_str() != element) {
            self.work
                .add_edge(GraphEdge::hand(element, owner.as_str(), EdgeKind::Coupling));
            self.work
                .add_edge(GraphEdge::hand(owner.as_str(), element, EdgeKind::Coupling));
        }

        let mut outgoing: Vec<GraphEdge> = source.edges_out(member).cloned().collect();
        let mut incoming: Vec<GraphEdge> = source.edges_in(member).cloned().collect();
        if self.contracted.contains(member) {
            // Edges rewired onto an element before it was itself absorbed
            outgoing.extend(self.work.edges_out(member).cloned());
            incoming.extend(self.work.edges_in(member).cloned());
        }

        for edge in &outgoing {
            for target in self.resolve(&edge.target) {
                self.work.add_edge(GraphEdge::hand(element, target, edge.kind));
            }
        }

        for edge in &incoming {
            // The containing element's own Contain edge goes away with the member
            let from_element = self
                .work
                .node(&edge.source)
                .is_some_and(|n| n.kind == NodeKind::ArchElement);
            if from_element {
                continue;
            }
            for origin in self.resolve(&edge.source) {
                self.work.add_edge(GraphEdge::hand(origin, element, edge.kind));
            }
        }
    }

    /// Follow the absorber chain of `id` to the ids that still stand for it.
    fn resolve(&self, id: &str) -> Vec<String> {
        let mut resolved = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            match self.absorbed_in.get(&current) {
                Some(owners) => stack.extend(owners.iter().cloned()),
                None => {
                    resolved.insert(current);
                }
            }
        }
        resolved.into_iter().collect()
    }

    fn finish(mut self) -> Graph {
        for id in self.absorbed_in.keys() {
            self.work.remove_node(id);
        }
        tracing::info!(
            "Contracted {} elements, absorbed {} nodes ({} nodes, {} edges remain)",
            self.contracted.len(),
            self.absorbed_in.len(),
            self.work.node_count(),
            self.work.edge_count()
        );
        self.work
    }
}
