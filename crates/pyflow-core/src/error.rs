//! Error types for the graph core

use std::path::PathBuf;

use thiserror::Error;

/// A token that does not name any known kind, provenance or status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown node type: {0:?}")]
    UnknownNodeKind(String),

    #[error("unknown edge type: {0:?}")]
    UnknownEdgeKind(String),

    #[error("unknown provenance: {0:?}")]
    UnknownProvenance(String),

    #[error("unknown diff status: {0:?}")]
    UnknownDiffStatus(String),
}

/// Errors raised while persisting or loading graph tables.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write row to {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the filter engine.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid id pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
