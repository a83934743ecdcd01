//! Application-level errors (wraps domain and infrastructure errors)

use thiserror::Error;

use crate::application::consistency::ConsistencyReport;
use crate::domain::{DomainError, NodeId};
use crate::infrastructure::InfraError;

/// Application errors wrap lower-layer errors and add tree-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("node {0} not found")]
    NotFound(NodeId),

    #[error("node {0} already exists")]
    AlreadyExists(NodeId),

    #[error(
        "cannot move node {id} under {new_parent_id}: target is the node itself or one of its descendants"
    )]
    InvalidMove { id: NodeId, new_parent_id: NodeId },

    #[error("{0}")]
    Consistency(ConsistencyReport),

    #[error("tree is empty")]
    EmptyTree,

    #[error("corrupt tree data at node {node_id}: {message}")]
    CorruptData { node_id: NodeId, message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl From<rusqlite::Error> for ApplicationError {
    fn from(e: rusqlite::Error) -> Self {
        ApplicationError::Infra(InfraError::Sqlite(e))
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_duplicate_id_when_displaying_already_exists_then_names_the_id() {
        assert_eq!(
            ApplicationError::AlreadyExists(5).to_string(),
            "node 5 already exists"
        );
    }

    #[test]
    fn given_invalid_move_when_displaying_then_names_both_ids() {
        let err = ApplicationError::InvalidMove {
            id: 6,
            new_parent_id: 10,
        };
        assert!(err.to_string().starts_with("cannot move node 6 under 10"));
    }
}
