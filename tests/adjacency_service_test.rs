mod common;

use common::{fixture_tree, ids, memory_db, shape};
use lifetree::application::{AdjacencyListTreeService, ApplicationError, TreeService};
use lifetree::domain::NodeData;
use lifetree::infrastructure::Database;

fn count(db: &Database, table: &str) -> i64 {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn given_batch_size_smaller_than_tree_when_saving_then_every_chunk_is_written() {
    // Arrange
    let db = memory_db();
    let service = AdjacencyListTreeService::with_batch_size(&db, 3);
    let tree = fixture_tree();

    // Act
    service.save_tree(&tree).unwrap();

    // Assert
    assert_eq!(count(&db, "tree_node"), 11);
    assert_eq!(count(&db, "tree_adjacency"), 10);
    assert!(!db.in_transaction());
    assert_eq!(shape(&service.get_tree().unwrap()), shape(&tree));
}

#[test]
fn given_saved_tree_when_deleting_subtree_then_edge_rows_cascade() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    service.delete_sub_tree(6).unwrap();

    assert_eq!(count(&db, "tree_node"), 6);
    assert_eq!(count(&db, "tree_adjacency"), 5);
}

#[test]
fn given_saved_tree_when_deleting_root_then_store_is_empty() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    service.delete_sub_tree(1).unwrap();

    assert_eq!(count(&db, "tree_node"), 0);
    assert_eq!(count(&db, "tree_adjacency"), 0);
    assert!(service.get_tree().unwrap().is_empty());
}

#[test]
fn given_second_parentless_node_when_reading_tree_then_corrupt_data() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();
    db.connection()
        .execute("DELETE FROM tree_adjacency WHERE node_id = 4", [])
        .unwrap();

    let result = service.get_tree();

    // Either parentless row may be read first.
    assert!(matches!(
        result,
        Err(ApplicationError::CorruptData { node_id: 1 | 4, .. })
    ));
}

#[test]
fn given_root_when_moving_under_other_root_child_then_invalid_move_and_no_change() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    let result = service.move_sub_tree(1, 3);

    assert!(matches!(
        result,
        Err(ApplicationError::InvalidMove {
            id: 1,
            new_parent_id: 3
        })
    ));
    assert_eq!(ids(&service.get_children(1).unwrap()), vec![2, 3, 4]);
    assert!(!db.in_transaction());
}

#[test]
fn given_node_without_edge_when_moving_then_corrupt_data() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();
    db.connection()
        .execute(
            "INSERT INTO tree_node (id, name, extinct, confidence) VALUES (99, 'Stray', 0, 0)",
            [],
        )
        .unwrap();

    let result = service.move_sub_tree(99, 4);

    assert!(matches!(
        result,
        Err(ApplicationError::CorruptData { node_id: 99, .. })
    ));
}

#[test]
fn given_failed_add_when_checking_store_then_transaction_was_rolled_back() {
    let db = memory_db();
    let service = AdjacencyListTreeService::new(&db);
    service.save_tree(&fixture_tree()).unwrap();

    let result = service.add_node(&NodeData::new(2, "Eubacteria again", false, 0), 4);

    assert!(matches!(result, Err(ApplicationError::AlreadyExists(2))));
    assert!(!db.in_transaction());
    assert_eq!(count(&db, "tree_node"), 11);
}
