//! Domain entities: core data structures

use std::fmt;

/// Globally unique identifier of a tree of life node.
pub type NodeId = i64;

/// Attributes of one tree of life node, detached from any tree structure.
///
/// Returned by point queries and used as the transfer object for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    /// Taxon name; many inner nodes are simply called "none"
    pub name: String,
    /// Whether the taxon is extinct
    pub extinct: bool,
    /// Confidence in the placement of the node at its position in the tree
    pub confidence: i32,
}

impl NodeData {
    pub fn new(id: NodeId, name: impl Into<String>, extinct: bool, confidence: i32) -> Self {
        Self {
            id,
            name: name.into(),
            extinct,
            confidence,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.id, self.name)?;
        if self.extinct {
            write!(f, " (extinct)")?;
        }
        Ok(())
    }
}
