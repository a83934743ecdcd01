//! Tree storage engines
//!
//! Two interchangeable encodings of the same tree behind [`TreeService`]:
//! an adjacency list (one parent pointer per node) and a nested set
//! (precomputed left/right/depth ranges).

mod adjacency;
mod nested_set;
pub(crate) mod rows;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::application::ApplicationResult;
use crate::domain::{NodeData, NodeId, TreeArena};

pub use adjacency::AdjacencyListTreeService;
pub use nested_set::NestedSetTreeService;

/// Rows per multi-row `INSERT` statement when saving a tree.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Physical encoding used to persist the tree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StorageEngine {
    #[default]
    AdjacencyList,
    NestedSet,
}

impl StorageEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageEngine::AdjacencyList => "adjacency-list",
            StorageEngine::NestedSet => "nested-set",
        }
    }
}

impl fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query, mutation and persistence contract shared by both engines.
///
/// Unknown ids yield [`ApplicationError::NotFound`](crate::application::ApplicationError::NotFound)
/// except for [`TreeService::get_node`], which returns `None`.
pub trait TreeService {
    fn engine(&self) -> StorageEngine;

    fn get_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>>;

    /// Whole persisted tree; empty arena when nothing is stored.
    fn get_tree(&self) -> ApplicationResult<TreeArena>;

    /// Tree rooted at `id` (which may be the root).
    fn get_sub_tree(&self, id: NodeId) -> ApplicationResult<TreeArena>;

    /// `id` first, then its ancestors, ending with the root.
    fn get_node_path(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>>;

    /// `None` for the root.
    fn get_parent_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>>;

    /// Direct children in stored order.
    fn get_children(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>>;

    /// Persists a complete tree into an empty store.
    fn save_tree(&self, tree: &TreeArena) -> ApplicationResult<()>;

    /// Inserts `node` as the last child of `parent_id`.
    fn add_node(&self, node: &NodeData, parent_id: NodeId) -> ApplicationResult<()>;

    /// Re-parents `id` (with its subtree) as the last child of `new_parent_id`.
    fn move_sub_tree(&self, id: NodeId, new_parent_id: NodeId) -> ApplicationResult<()>;

    /// Deletes `id` and all of its descendants.
    fn delete_sub_tree(&self, id: NodeId) -> ApplicationResult<()>;
}
