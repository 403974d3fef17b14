//! Graph data model, hashing, contraction, diff and queries

pub mod error;
pub mod graph;
pub mod model;
pub mod hasher;
pub mod contract;
pub mod diff;
pub mod dependency;
pub mod filter;
pub mod store;


#[cfg(test)]
pub mod test_utils;

pub use error::{FilterError, ModelError, StoreError};
pub use model::{
    DiffStatus, EdgeKey, EdgeKind, GraphEdge, GraphNode, NodeKind, Provenance,
    BODY_ENTITY_NAME, DIFF_STATUS_KEY, ENTITY_SEPARATOR, ROOT_NODE_ID, entity_id,
};
pub use graph::{Graph, MergeReport};
pub use hasher::{digest_bytes, recalculate_hashes, stable_hash_from_hashes};
pub use contract::{CATCH_ALL_ELEMENT_ID, contract};
pub use diff::{DiffSummary, diff};
pub use dependency::{get_dependent_nodes, get_used_nodes};
pub use filter::{FilterSpec, apply_edges_filter, apply_nodes_filter, file_links, filter};
pub use store::{
    ADDITIONAL_SECTION, CODE_SECTION, UNION_SECTION, build, build_diff, export, export_diff,
    init_overlay, union,
};
