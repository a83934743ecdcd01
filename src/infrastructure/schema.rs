//! SQLite schema for the tree of life tables.

use rusqlite::Connection;
use tracing::debug;

use crate::infrastructure::error::InfraResult;

pub const NODE_TABLE: &str = "tree_node";
pub const ADJACENCY_TABLE: &str = "tree_adjacency";
pub const NESTED_SET_TABLE: &str = "tree_nested_set";

/// Idempotent DDL. `tree_adjacency.seq` records edge insertion order.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tree_node (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    extinct INTEGER NOT NULL DEFAULT 0,
    confidence INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tree_adjacency (
    seq INTEGER PRIMARY KEY,
    node_id INTEGER NOT NULL UNIQUE REFERENCES tree_node (id) ON DELETE CASCADE,
    parent_id INTEGER NOT NULL REFERENCES tree_node (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tree_adjacency_parent ON tree_adjacency (parent_id);

CREATE TABLE IF NOT EXISTS tree_nested_set (
    node_id INTEGER PRIMARY KEY REFERENCES tree_node (id) ON DELETE CASCADE,
    lft INTEGER NOT NULL,
    rgt INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    CHECK (lft < rgt)
);

CREATE INDEX IF NOT EXISTS idx_tree_nested_set_lft ON tree_nested_set (lft);
CREATE INDEX IF NOT EXISTS idx_tree_nested_set_rgt ON tree_nested_set (rgt);
";

pub fn ensure_schema(conn: &Connection) -> InfraResult<()> {
    debug!("ensuring tree schema");
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
