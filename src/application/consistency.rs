//! Comparison of persisted nested-set rows against recomputed ones.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use crate::domain::{NestedSetRow, NodeId};

/// One disagreement between expected and persisted range data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Node is in the tree but has no range row.
    Missing { node_id: NodeId },
    /// Range row exists for a node that is not part of the tree.
    Unexpected { node_id: NodeId },
    Left { node_id: NodeId, expected: i64, actual: i64 },
    Right { node_id: NodeId, expected: i64, actual: i64 },
    Depth { node_id: NodeId, expected: i64, actual: i64 },
}

impl Mismatch {
    pub fn node_id(&self) -> NodeId {
        match self {
            Mismatch::Missing { node_id }
            | Mismatch::Unexpected { node_id }
            | Mismatch::Left { node_id, .. }
            | Mismatch::Right { node_id, .. }
            | Mismatch::Depth { node_id, .. } => *node_id,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Missing { node_id } => write!(f, "node {node_id}: missing range row"),
            Mismatch::Unexpected { node_id } => {
                write!(f, "node {node_id}: range row for node outside the tree")
            }
            Mismatch::Left {
                node_id,
                expected,
                actual,
            } => write!(f, "node {node_id}: left is {actual}, expected {expected}"),
            Mismatch::Right {
                node_id,
                expected,
                actual,
            } => write!(f, "node {node_id}: right is {actual}, expected {expected}"),
            Mismatch::Depth {
                node_id,
                expected,
                actual,
            } => write!(f, "node {node_id}: depth is {actual}, expected {expected}"),
        }
    }
}

/// All mismatches found by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub mismatches: Vec<Mismatch>,
}

impl ConsistencyReport {
    /// Diffs `actual` against `expected` per node id, ordered by node id.
    pub fn compare(expected: &[NestedSetRow], actual: &[NestedSetRow]) -> Self {
        let expected: BTreeMap<NodeId, &NestedSetRow> =
            expected.iter().map(|row| (row.node_id, row)).collect();
        let actual: BTreeMap<NodeId, &NestedSetRow> =
            actual.iter().map(|row| (row.node_id, row)).collect();

        let mut mismatches = Vec::new();
        for (&node_id, want) in &expected {
            let Some(got) = actual.get(&node_id) else {
                mismatches.push(Mismatch::Missing { node_id });
                continue;
            };
            if want.left != got.left {
                mismatches.push(Mismatch::Left {
                    node_id,
                    expected: want.left,
                    actual: got.left,
                });
            }
            if want.right != got.right {
                mismatches.push(Mismatch::Right {
                    node_id,
                    expected: want.right,
                    actual: got.right,
                });
            }
            if want.depth != got.depth {
                mismatches.push(Mismatch::Depth {
                    node_id,
                    expected: want.depth,
                    actual: got.depth,
                });
            }
        }
        mismatches.extend(
            actual
                .keys()
                .filter(|id| !expected.contains_key(id))
                .map(|&node_id| Mismatch::Unexpected { node_id }),
        );

        Self { mismatches }
    }

    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mismatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nested-set mismatch(es): {}",
            self.mismatches.len(),
            self.mismatches.iter().join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(node_id: NodeId, left: i64, right: i64, depth: i64) -> NestedSetRow {
        NestedSetRow {
            node_id,
            left,
            right,
            depth,
        }
    }

    #[test]
    fn test_identical_rows_are_consistent() {
        let rows = vec![row(1, 1, 4, 1), row(2, 2, 3, 2)];
        assert!(ConsistencyReport::compare(&rows, &rows).is_consistent());
    }

    #[test]
    fn test_every_kind_of_mismatch_is_collected() {
        let expected = vec![row(1, 1, 6, 1), row(2, 2, 3, 2), row(3, 4, 5, 2)];
        let actual = vec![row(1, 1, 6, 1), row(2, 2, 9, 3), row(4, 7, 8, 2)];

        let report = ConsistencyReport::compare(&expected, &actual);
        assert_eq!(
            report.mismatches,
            vec![
                Mismatch::Right {
                    node_id: 2,
                    expected: 3,
                    actual: 9
                },
                Mismatch::Depth {
                    node_id: 2,
                    expected: 2,
                    actual: 3
                },
                Mismatch::Missing { node_id: 3 },
                Mismatch::Unexpected { node_id: 4 },
            ]
        );
        assert!(report.to_string().starts_with("4 nested-set mismatch(es)"));
    }
}
