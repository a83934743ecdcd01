//! Domain layer: tree model, flat-file builder and nested-set numbering
//!
//! This layer is independent of storage concerns (no SQL, no config loading).

pub mod arena;
pub mod builder;
pub mod display;
pub mod entities;
pub mod error;
pub mod nested_set;

pub use arena::{TreeArena, TreeIterator, TreeNode};
pub use builder::TreeBuilder;
pub use display::TreeDisplay;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use nested_set::{assign_ranges, NestedSetRow, ROOT_DEPTH};
