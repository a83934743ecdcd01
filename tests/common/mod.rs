//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use lifetree::application::{
    AdjacencyListTreeService, NestedSetTreeService, StorageEngine, TreeService,
};
use lifetree::domain::{NodeData, NodeId, TreeArena, TreeBuilder};
use lifetree::infrastructure::Database;
use lifetree::util::testing::init_test_setup;

/// Resource directory with the small tree of life fixture.
pub fn resource_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources/tree")
}

/// ```text
/// 1 Life on Earth
/// ├── 2 Eubacteria
/// ├── 3 Eukaryotes
/// │   ├── 5 Green plants
/// │   ├── 6 Animals
/// │   │   ├── 8 Vertebrates
/// │   │   │   ├── 10 Mammals
/// │   │   │   └── 11 Dinosaurs (extinct)
/// │   │   └── 9 Arthropods
/// │   └── 7 Fungi
/// └── 4 Archaea
/// ```
pub fn fixture_tree() -> TreeArena {
    init_test_setup();
    let dir = resource_dir();
    let mut builder = TreeBuilder::new();
    builder.load_nodes_file(&dir.join("nodes.csv")).unwrap();
    builder.load_links_file(&dir.join("links.csv")).unwrap();
    builder.into_tree().unwrap()
}

pub fn memory_db() -> Database {
    init_test_setup();
    Database::open_in_memory().unwrap()
}

pub fn service_for(db: &Database, engine: StorageEngine) -> Box<dyn TreeService + '_> {
    match engine {
        StorageEngine::AdjacencyList => Box::new(AdjacencyListTreeService::new(db)),
        StorageEngine::NestedSet => Box::new(NestedSetTreeService::new(db)),
    }
}

pub fn ids(nodes: &[NodeData]) -> Vec<NodeId> {
    nodes.iter().map(|n| n.id).collect()
}

/// Pre-order ids of a tree.
pub fn preorder_ids(tree: &TreeArena) -> Vec<NodeId> {
    tree.iter().map(|(_, node)| node.id()).collect()
}

/// Pre-order `(node, parent id, child ids)` triples; equal shapes mean equal
/// trees including attributes and child order.
pub fn shape(tree: &TreeArena) -> Vec<(NodeData, Option<NodeId>, Vec<NodeId>)> {
    tree.iter()
        .map(|(idx, node)| {
            let parent = tree.parent_of(idx).map(|p| p.id());
            let children = node
                .children()
                .iter()
                .filter_map(|&child| tree.get_node(child))
                .map(|child| child.id())
                .collect();
            (node.data.clone(), parent, children)
        })
        .collect()
}
