//! Application layer: storage engines and consistency checks
//!
//! This layer turns domain trees into persisted rows and back.

pub mod consistency;
pub mod error;
pub mod services;

pub use consistency::{ConsistencyReport, Mismatch};
pub use error::{ApplicationError, ApplicationResult};
pub use services::{
    AdjacencyListTreeService, NestedSetTreeService, StorageEngine, TreeService,
    DEFAULT_BATCH_SIZE,
};
