//! Row mapping and batched inserts shared by both storage engines.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::trace;

use crate::application::ApplicationResult;
use crate::domain::{NodeData, NodeId};

/// Column list matching [`node_from_row`].
pub(crate) const NODE_COLUMNS: &str = "n.id, n.name, n.extinct, n.confidence";

/// SQLite's default host-parameter limit for the bundled library.
const MAX_BIND_PARAMS: usize = 32766;

/// Maps the first four columns (`id, name, extinct, confidence`).
pub(crate) fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeData> {
    Ok(NodeData {
        id: row.get(0)?,
        name: row.get(1)?,
        extinct: row.get(2)?,
        confidence: row.get(3)?,
    })
}

pub(crate) fn fetch_node(conn: &Connection, id: NodeId) -> ApplicationResult<Option<NodeData>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM tree_node n WHERE n.id = ?1");
    Ok(conn.query_row(&sql, [id], node_from_row).optional()?)
}

pub(crate) fn node_exists(conn: &Connection, id: NodeId) -> ApplicationResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM tree_node WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn node_values(node: &NodeData) -> Vec<Value> {
    vec![
        Value::Integer(node.id),
        Value::Text(node.name.clone()),
        Value::Integer(i64::from(node.extinct)),
        Value::Integer(i64::from(node.confidence)),
    ]
}

pub(crate) fn insert_nodes<'a, I>(
    conn: &Connection,
    nodes: I,
    batch_size: usize,
) -> ApplicationResult<usize>
where
    I: IntoIterator<Item = &'a NodeData>,
{
    let rows: Vec<Vec<Value>> = nodes.into_iter().map(node_values).collect();
    insert_rows(
        conn,
        "tree_node",
        &["id", "name", "extinct", "confidence"],
        &rows,
        batch_size,
    )
}

/// Multi-row `INSERT` of `rows`, at most `batch_size` rows per statement.
pub(crate) fn insert_rows(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    rows: &[Vec<Value>],
    batch_size: usize,
) -> ApplicationResult<usize> {
    if rows.is_empty() || columns.is_empty() {
        return Ok(0);
    }
    let per_statement = batch_size.clamp(1, MAX_BIND_PARAMS / columns.len());
    let placeholder = format!("({})", vec!["?"; columns.len()].join(", "));
    let column_list = columns.join(", ");

    let mut inserted = 0;
    for chunk in rows.chunks(per_statement) {
        let sql = format!(
            "INSERT INTO {table} ({column_list}) VALUES {}",
            vec![placeholder.as_str(); chunk.len()].join(", ")
        );
        inserted += conn.execute(&sql, params_from_iter(chunk.iter().flatten()))?;
    }
    trace!("inserted {} rows into {}", inserted, table);
    Ok(inserted)
}
