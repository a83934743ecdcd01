mod common;

use common::{fixture_tree, memory_db};
use lifetree::application::{
    ApplicationError, ConsistencyReport, Mismatch, NestedSetTreeService, TreeService,
};
use lifetree::domain::{NestedSetRow, NodeData, NodeId};

fn row(node_id: NodeId, left: i64, right: i64, depth: i64) -> NestedSetRow {
    NestedSetRow {
        node_id,
        left,
        right,
        depth,
    }
}

/// Every pair of ranges is either nested or disjoint, and no boundary value
/// is used twice.
fn assert_well_formed(rows: &[NestedSetRow]) {
    let mut bounds: Vec<i64> = rows.iter().flat_map(|r| [r.left, r.right]).collect();
    bounds.sort_unstable();
    let expected: Vec<i64> = (1..=bounds.len() as i64).collect();
    assert_eq!(bounds, expected, "boundaries must be 1..=2n without gaps");

    for a in rows {
        assert!(a.left < a.right, "{a:?}");
        for b in rows.iter().filter(|b| b.node_id != a.node_id) {
            assert!(
                a.contains(b) || b.contains(a) || a.is_disjoint(b),
                "ranges overlap: {a:?} {b:?}"
            );
        }
    }
}

enum Step {
    Add(NodeId, &'static str, NodeId),
    Move(NodeId, NodeId),
    Delete(NodeId),
}

#[test]
fn given_fixture_when_saved_then_ranges_follow_preorder_numbering() {
    // Arrange
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);

    // Act
    service.save_tree(&fixture_tree()).unwrap();

    // Assert
    let rows = service.nested_set_rows().unwrap();
    assert_eq!(
        rows,
        vec![
            row(1, 1, 22, 1),
            row(2, 2, 3, 2),
            row(3, 4, 19, 2),
            row(5, 5, 6, 3),
            row(6, 7, 16, 3),
            row(8, 8, 13, 4),
            row(10, 9, 10, 5),
            row(11, 11, 12, 5),
            row(9, 14, 15, 4),
            row(7, 17, 18, 3),
            row(4, 20, 21, 2),
        ]
    );
    assert!(service.validate_nested_set_data().is_ok());
}

#[test]
fn given_sequence_of_mutations_when_validating_after_each_then_always_consistent() {
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    let steps = [
        Step::Add(12, "Birds", 8),
        Step::Move(6, 4),
        Step::Move(8, 2),
        Step::Add(13, "Mosses", 5),
        Step::Move(3, 10),
        Step::Delete(9),
        Step::Move(4, 1),
        Step::Delete(8),
    ];

    for (n, step) in steps.iter().enumerate() {
        match *step {
            Step::Add(id, name, parent) => {
                service.add_node(&NodeData::new(id, name, false, 0), parent)
            }
            Step::Move(id, parent) => service.move_sub_tree(id, parent),
            Step::Delete(id) => service.delete_sub_tree(id),
        }
        .unwrap();
        let rows = service.nested_set_rows().unwrap();
        assert_well_formed(&rows);
        if let Err(e) = service.validate_nested_set_data() {
            panic!("step {n}: {e}");
        }
    }
    assert_eq!(
        service.nested_set_rows().unwrap(),
        vec![row(1, 1, 8, 1), row(2, 2, 3, 2), row(4, 4, 7, 2), row(6, 5, 6, 3)]
    );
}

#[test]
fn given_moved_subtree_when_reading_ranges_then_depths_are_shifted() {
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    service.move_sub_tree(8, 4).unwrap();

    let rows = service.nested_set_rows().unwrap();
    let depth_of = |id: NodeId| rows.iter().find(|r| r.node_id == id).map(|r| r.depth);
    assert_eq!(depth_of(8), Some(3));
    assert_eq!(depth_of(10), Some(4));
    assert_eq!(depth_of(9), Some(4));
    assert_eq!(service.get_parent_node(10).unwrap().map(|n| n.id), Some(8));
    assert_eq!(service.get_parent_node(8).unwrap().map(|n| n.id), Some(4));
}

#[test]
fn given_corrupted_rows_when_validating_then_every_mismatch_is_reported() {
    // Arrange
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();
    let conn = db.connection();
    conn.execute("UPDATE tree_nested_set SET depth = 9 WHERE node_id = 10", [])
        .unwrap();
    conn.execute("DELETE FROM tree_nested_set WHERE node_id = 4", [])
        .unwrap();

    // Act
    let result = service.validate_nested_set_data();

    // Assert
    let report = match result {
        Err(ApplicationError::Consistency(report)) => report,
        other => panic!("expected a consistency error, got {other:?}"),
    };
    assert_eq!(
        report,
        ConsistencyReport {
            mismatches: vec![
                Mismatch::Right {
                    node_id: 1,
                    expected: 20,
                    actual: 22
                },
                Mismatch::Depth {
                    node_id: 10,
                    expected: 5,
                    actual: 9
                },
                Mismatch::Missing { node_id: 4 },
            ]
        }
    );
    assert_eq!(
        report.to_string(),
        "3 nested-set mismatch(es): node 1: right is 22, expected 20; \
         node 10: depth is 9, expected 5; node 4: missing range row"
    );
}

#[test]
fn given_empty_store_when_validating_then_consistent() {
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);

    assert!(service.validate_nested_set_data().is_ok());
    assert!(service.nested_set_rows().unwrap().is_empty());
}

#[test]
fn given_two_disjoint_top_ranges_when_reading_tree_then_corrupt_data() {
    let db = memory_db();
    let service = NestedSetTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();
    db.connection()
        .execute(
            "UPDATE tree_nested_set SET lft = 23, rgt = 24, depth = 1 WHERE node_id = 4",
            [],
        )
        .unwrap();

    let result = service.get_tree();

    assert!(matches!(
        result,
        Err(ApplicationError::CorruptData { node_id: 4, .. })
    ));
}

#[test]
fn given_small_batch_size_when_saving_then_all_rows_are_written() {
    let db = memory_db();
    let service = NestedSetTreeService::with_batch_size(&db, 2);

    service.save_tree(&fixture_tree()).unwrap();

    assert_eq!(service.nested_set_rows().unwrap().len(), 11);
    assert!(service.validate_nested_set_data().is_ok());
}
