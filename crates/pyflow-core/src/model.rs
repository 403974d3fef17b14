//! Core data structures for the dependency graph

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Id of the sentinel node every code containment path starts from.
pub const ROOT_NODE_ID: &str = "root";

/// Separator between a file id and the entity declared in it.
pub const ENTITY_SEPARATOR: char = '#';

/// Name of the synthetic entity holding a file's module-level statements.
pub const BODY_ENTITY_NAME: &str = "body";

/// Metadata key carrying a [`DiffStatus`] on diff graphs.
pub const DIFF_STATUS_KEY: &str = "diff_status";

/// Join a file id and a declared name into an entity id.
pub fn entity_id(file_id: &str, name: &str) -> String {
    format!("{file_id}{ENTITY_SEPARATOR}{name}")
}

/// Discriminates what kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    // ── Structural ──────────────────────────────────────────
    #[serde(rename = "directory")]
    Directory,
    #[serde(rename = "file")]
    File,

    // ── Code entities (tree-sitter extracted) ───────────────
    #[serde(rename = "class")]
    Class,
    #[serde(rename = "func")]
    Function,
    #[serde(rename = "body")]
    Body,

    // ── Hand-authored architecture ──────────────────────────
    #[serde(rename = "arc_elem")]
    ArchElement,
    #[serde(rename = "use_case")]
    UseCase,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Directory,
        NodeKind::File,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Body,
        NodeKind::ArchElement,
        NodeKind::UseCase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Function => "func",
            NodeKind::Body => "body",
            NodeKind::ArchElement => "arc_elem",
            NodeKind::UseCase => "use_case",
        }
    }

    /// Directories and files.
    pub fn is_structural(self) -> bool {
        matches!(self, NodeKind::Directory | NodeKind::File)
    }

    /// Entities whose hash comes straight from their syntax subtree.
    pub fn is_code_entity(self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Function | NodeKind::Body)
    }

    pub fn is_architecture(self) -> bool {
        matches!(self, NodeKind::ArchElement | NodeKind::UseCase)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownNodeKind(s.to_string()))
    }
}

/// What kind of relationship this edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Structural ownership: parent owns child.
    #[serde(rename = "contain")]
    Contain,
    /// A reference from one code entity to another.
    #[serde(rename = "use")]
    Use,
    /// Two architecture elements sharing an absorbed node.
    #[serde(rename = "coupling")]
    Coupling,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 3] = [EdgeKind::Contain, EdgeKind::Use, EdgeKind::Coupling];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Contain => "contain",
            EdgeKind::Use => "use",
            EdgeKind::Coupling => "coupling",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownEdgeKind(s.to_string()))
    }
}

/// Where a node or edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Provenance {
    /// Derived from parsed source.
    #[default]
    #[serde(rename = "code")]
    Code,
    /// Authored by hand in an overlay.
    #[serde(rename = "hand")]
    Hand,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Code => "code",
            Provenance::Hand => "hand",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Provenance::Code),
            "hand" => Ok(Provenance::Hand),
            other => Err(ModelError::UnknownProvenance(other.to_string())),
        }
    }
}

/// Classification assigned by the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiffStatus {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "deleted")]
    Deleted,
    #[serde(rename = "changed")]
    Changed,
    #[serde(rename = "unchanged")]
    Unchanged,
}

impl DiffStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffStatus::New => "new",
            DiffStatus::Deleted => "deleted",
            DiffStatus::Changed => "changed",
            DiffStatus::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(DiffStatus::New),
            "deleted" => Ok(DiffStatus::Deleted),
            "changed" => Ok(DiffStatus::Changed),
            "unchanged" => Ok(DiffStatus::Unchanged),
            other => Err(ModelError::UnknownDiffStatus(other.to_string())),
        }
    }
}

/// A single node in the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Path-like, hierarchical, unique within a graph.
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Empty until computed.
    pub hash: String,
    pub provenance: Provenance,
    /// Ephemeral annotations such as the diff status.
    pub metadata: HashMap<String, String>,
}

impl GraphNode {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: NodeKind,
        provenance: Provenance,
    ) -> Self {
        GraphNode {
            id: id.into(),
            name: name.into(),
            kind,
            hash: String::new(),
            provenance,
            metadata: HashMap::new(),
        }
    }

    /// A node derived from source.
    pub fn code(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self::new(id, name, kind, Provenance::Code)
    }

    /// A hand-authored node.
    pub fn hand(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self::new(id, name, kind, Provenance::Hand)
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn with_diff_status(mut self, status: DiffStatus) -> Self {
        self.metadata
            .insert(DIFF_STATUS_KEY.to_string(), status.as_str().to_string());
        self
    }

    pub fn diff_status(&self) -> Option<DiffStatus> {
        self.metadata.get(DIFF_STATUS_KEY)?.parse().ok()
    }
}

/// Identity of an edge. Two edges with equal keys are the same edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub provenance: Provenance,
}

/// A directed edge in the dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub provenance: Provenance,
    pub metadata: HashMap<String, String>,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
        provenance: Provenance,
    ) -> Self {
        GraphEdge {
            source: source.into(),
            target: target.into(),
            kind,
            provenance,
            metadata: HashMap::new(),
        }
    }

    pub fn code(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self::new(source, target, kind, Provenance::Code)
    }

    pub fn hand(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self::new(source, target, kind, Provenance::Hand)
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind,
            provenance: self.provenance,
        }
    }

    /// Whether `other` has the same identity, ignoring metadata.
    pub fn same_identity(&self, other: &GraphEdge) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.kind == other.kind
            && self.provenance == other.provenance
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn with_diff_status(mut self, status: DiffStatus) -> Self {
        self.metadata
            .insert(DIFF_STATUS_KEY.to_string(), status.as_str().to_string());
        self
    }

    pub fn diff_status(&self) -> Option<DiffStatus> {
        self.metadata.get(DIFF_STATUS_KEY)?.parse().ok()
    }
}

impl From<&GraphEdge> for EdgeKey {
    fn from(edge: &GraphEdge) -> Self {
        edge.key()
    }
}
