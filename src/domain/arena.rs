//! Arena-based tree of life model.
//!
//! The arena owns every node. A node's children are an ordered list of arena
//! indices and its parent is a non-owning index, so the ownership direction
//! (parent owns children) is explicit and the graph has no reference cycles.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{NodeData, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Attributes of this node
    pub data: NodeData,
    parent: Option<Index>,
    children: Vec<Index>,
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        self.data.id
    }

    /// Index of parent node in the arena, None for the root or detached nodes
    pub fn parent(&self) -> Option<Index> {
        self.parent
    }

    /// Indices of child nodes in insertion order
    pub fn children(&self) -> &[Index] {
        &self.children
    }
}

/// Arena-based tree of life.
///
/// Nodes are first inserted detached and then linked with [`TreeArena::attach_child`],
/// which enforces the single-parent and no-cycle invariants.
#[derive(Debug, Default)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    by_id: HashMap<NodeId, Index>,
    root: Option<Index>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a detached node (no parent, no children).
    #[instrument(level = "trace", skip(self), fields(id = data.id))]
    pub fn insert_node(&mut self, data: NodeData) -> DomainResult<Index> {
        if self.by_id.contains_key(&data.id) {
            return Err(DomainError::DuplicateNode(data.id));
        }
        let id = data.id;
        let idx = self.arena.insert(TreeNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.by_id.insert(id, idx);
        Ok(idx)
    }

    /// Attaches `child` as the last child of `parent`.
    ///
    /// Re-attaching a node to its current parent is a no-op. Fails if the
    /// child already has another parent, or if `parent` is `child` itself or
    /// one of its descendants.
    #[instrument(level = "trace", skip(self))]
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        let parent_idx = self.index_of(parent).ok_or(DomainError::NotInTree(parent))?;
        let child_idx = self.index_of(child).ok_or(DomainError::NotInTree(child))?;

        if let Some(existing) = self.arena[child_idx].parent {
            if existing == parent_idx {
                return Ok(());
            }
            return Err(DomainError::AlreadyHasParent {
                child,
                parent,
                existing_parent: self.arena[existing].id(),
            });
        }

        let mut ancestor = Some(parent_idx);
        while let Some(idx) = ancestor {
            if idx == child_idx {
                return Err(DomainError::Cycle { parent, child });
            }
            ancestor = self.arena[idx].parent;
        }

        self.attach_child_unchecked(parent_idx, child_idx);
        Ok(())
    }

    /// Links `child` under `parent` without any invariant checks.
    ///
    /// Only for hydration code whose query shape already guarantees a single
    /// parent per node and no cycles.
    pub(crate) fn attach_child_unchecked(&mut self, parent: Index, child: Index) {
        self.arena[parent].children.push(child);
        self.arena[child].parent = Some(parent);
    }

    pub(crate) fn set_root(&mut self, root: Index) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn root_node(&self) -> Option<&TreeNode> {
        self.root.and_then(|idx| self.arena.get(idx))
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn index_of(&self, id: NodeId) -> Option<Index> {
        self.by_id.get(&id).copied()
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&TreeNode> {
        self.index_of(id).and_then(|idx| self.arena.get(idx))
    }

    pub fn parent_of(&self, idx: Index) -> Option<&TreeNode> {
        self.get_node(idx)
            .and_then(|node| node.parent)
            .and_then(|parent| self.arena.get(parent))
    }

    /// The `n`-th child of the node at `idx`, in insertion order.
    pub fn child(&self, idx: Index, n: usize) -> Option<&TreeNode> {
        self.get_node(idx)
            .and_then(|node| node.children.get(n))
            .and_then(|&child| self.arena.get(child))
    }

    /// Iterates over every node without a parent, in no particular order.
    pub fn parentless(&self) -> impl Iterator<Item = (Index, &TreeNode)> {
        self.arena.iter().filter(|(_, node)| node.parent.is_none())
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Depth-first pre-order traversal starting at the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Depth-first pre-order traversal of the subtree rooted at `idx`.
    pub fn iter_from(&self, idx: Index) -> TreeIterator<'_> {
        TreeIterator::new(self, Some(idx))
    }

    /// All nodes of the tree in depth-first pre-order, for bulk export.
    pub fn depth_first_list(&self) -> Vec<&TreeNode> {
        self.iter().map(|(_, node)| node).collect()
    }

    /// Number of levels in the tree (1 for a lone root, 0 when empty).
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max_depth = 0;
        let mut stack = vec![(root, 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get_node(idx) {
                stack.extend(node.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        max_depth
    }
}

/// Depth-first pre-order iterator; visits children left to right.
pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena, start: Option<Index>) -> Self {
        Self {
            arena,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev().copied());
                return Some((current_idx, node));
            }
        }
        None
    }
}
