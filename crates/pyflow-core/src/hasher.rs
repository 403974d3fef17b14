//! Content hashing over the containment structure
//!
//! Code entities (classes, functions, module bodies) carry a leaf hash
//! computed from their syntax at extraction time. Every other node hashes the
//! sorted list of its Contain children's hashes, so the result does not depend
//! on the order children were inserted.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::graph::Graph;
use crate::model::{EdgeKind, Provenance, ROOT_NODE_ID};

/// Number of hex characters kept from a SHA-256 digest.
pub const HASH_LEN: usize = 8;

/// Digest arbitrary bytes into a short lowercase hex hash.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hash = hex::encode(Sha256::digest(bytes));
    hash.truncate(HASH_LEN);
    hash
}

/// Digest a set of hashes independently of their order.
pub fn stable_hash_from_hashes(hashes: &[String]) -> String {
    let mut sorted: Vec<&str> = hashes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    digest_bytes(sorted.join("\n").as_bytes())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Directories and files, starting at the root.
    Structural,
    /// Hand-authored nodes that still have no hash.
    Architecture,
}

enum Visit {
    InProgress,
    Done(String),
}

struct HashPass {
    pass: Pass,
    visits: HashMap<String, Visit>,
}

impl HashPass {
    fn new(pass: Pass) -> Self {
        HashPass {
            pass,
            visits: HashMap::new(),
        }
    }

    fn hash(&mut self, graph: &mut Graph, id: &str) -> String {
        match self.visits.get(id) {
            Some(Visit::Done(hash)) => return hash.clone(),
            // Contain cycle through hand-authored edges
            Some(Visit::InProgress) => return String::new(),
            None => {}
        }

        let Some(node) = graph.node(id) else {
            return String::new();
        };
        let keep_existing = match self.pass {
            Pass::Structural => node.kind.is_code_entity(),
            Pass::Architecture => node.provenance != Provenance::Hand || !node.hash.is_empty(),
        };
        if keep_existing {
            let hash = node.hash.clone();
            self.visits.insert(id.to_string(), Visit::Done(hash.clone()));
            return hash;
        }

        self.visits.insert(id.to_string(), Visit::InProgress);
        let children: Vec<String> = graph
            .edges_out(id)
            .filter(|e| e.kind == EdgeKind::Contain)
            .map(|e| e.target.clone())
            .collect();
        let child_hashes: Vec<String> = children
            .iter()
            .map(|child| self.hash(graph, child))
            .collect();

        let hash = stable_hash_from_hashes(&child_hashes);
        graph.set_hash(id, hash.clone());
        self.visits.insert(id.to_string(), Visit::Done(hash.clone()));
        hash
    }
}

/// Recompute every non-code-entity hash in place.
///
/// Re-running on an already hashed graph reproduces the same hashes.
pub fn recalculate_hashes(graph: &mut Graph) {
    let derived: Vec<String> = graph
        .nodes()
        .filter(|n| !n.kind.is_code_entity())
        .map(|n| n.id.clone())
        .collect();
    for id in &derived {
        graph.set_hash(id, String::new());
    }

    if graph.contains(ROOT_NODE_ID) {
        let root_hash = HashPass::new(Pass::Structural).hash(graph, ROOT_NODE_ID);
        tracing::debug!("Structural pass done, root hash {}", root_hash);
    } else {
        tracing::warn!("No {} node, skipping structural hash pass", ROOT_NODE_ID);
    }

    let hand: Vec<String> = graph
        .nodes()
        .filter(|n| n.provenance == Provenance::Hand)
        .map(|n| n.id.clone())
        .collect();
    let mut pass = HashPass::new(Pass::Architecture);
    for id in &hand {
        pass.hash(graph, id);
    }
    tracing::debug!("Architecture pass hashed {} hand-authored nodes", hand.len());
}
