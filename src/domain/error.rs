//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::entities::NodeId;

/// Domain errors represent violations of the tree's structural invariants
/// and malformed load input. They are independent of storage concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot attach node {child} to {parent}: node already has parent {existing_parent}")]
    AlreadyHasParent {
        child: NodeId,
        parent: NodeId,
        existing_parent: NodeId,
    },

    #[error("cannot attach node {child} to {parent}: node would become its own ancestor")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("node {0} is not part of this tree")]
    NotInTree(NodeId),

    #[error("no records found in {0}")]
    EmptySource(String),

    #[error("unknown node {id} referenced on line {line}")]
    UnknownNode { id: NodeId, line: u64 },

    #[error("tree has multiple roots: {}", join_ids(.0))]
    MultipleRoots(Vec<NodeId>),

    #[error("tree root is not loaded yet")]
    NotLoaded,

    #[error("invalid record on line {line}: {message}")]
    InvalidRecord { line: u64, message: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read {source_name}: {message}")]
    Read {
        source_name: String,
        message: String,
    },
}

fn join_ids(ids: &[NodeId]) -> String {
    use itertools::Itertools;
    ids.iter().join(", ")
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
