//! Nested-set range assignment (modified pre-order numbering).

use generational_arena::Index;

use crate::domain::arena::TreeArena;
use crate::domain::entities::NodeId;

/// Depth assigned to the root of a nested set.
pub const ROOT_DEPTH: i64 = 1;

/// Position of one node in the nested-set encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedSetRow {
    pub node_id: NodeId,
    pub left: i64,
    pub right: i64,
    pub depth: i64,
}

impl NestedSetRow {
    /// True if `other` lies strictly inside this range.
    pub fn contains(&self, other: &NestedSetRow) -> bool {
        self.left < other.left && other.right < self.right
    }

    /// True if the two ranges do not overlap at all.
    pub fn is_disjoint(&self, other: &NestedSetRow) -> bool {
        self.right < other.left || other.right < self.left
    }

    /// Number of boundary values the range occupies.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }
}

/// Assigns `(left, right, depth)` to every node of `tree`.
///
/// One monotonic counter: `left` is taken on entering a node, `right` after
/// all of its children. The root gets depth [`ROOT_DEPTH`]. Rows come out in
/// ascending `left` order, i.e. pre-order.
pub fn assign_ranges(tree: &TreeArena) -> Vec<NestedSetRow> {
    let mut rows = Vec::with_capacity(tree.len());
    let Some(root) = tree.root() else {
        return rows;
    };
    let mut counter = 0;
    let mut stack = vec![Visit::Enter(root, ROOT_DEPTH)];
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(idx, depth) => {
                let Some(node) = tree.get_node(idx) else {
                    continue;
                };
                counter += 1;
                stack.push(Visit::Exit(rows.len()));
                rows.push(NestedSetRow {
                    node_id: node.id(),
                    left: counter,
                    right: 0,
                    depth,
                });
                stack.extend(
                    node.children()
                        .iter()
                        .rev()
                        .map(|&child| Visit::Enter(child, depth + 1)),
                );
            }
            Visit::Exit(slot) => {
                counter += 1;
                rows[slot].right = counter;
            }
        }
    }
    rows
}

/// Work item of the range walk; `Exit` carries the row slot to close.
enum Visit {
    Enter(Index, i64),
    Exit(usize),
}
