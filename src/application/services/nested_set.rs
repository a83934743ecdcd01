//! Nested-set engine: every node stores a `(lft, rgt, depth)` range.
//!
//! Ancestors strictly contain their descendants' ranges, so subtree, path and
//! child queries are range comparisons. Structural mutations shift the
//! ranges of the rows to their right inside one transaction.

use generational_arena::Index;
use rusqlite::types::Value;
use rusqlite::{named_params, params, Connection, OptionalExtension, Params, Row};
use tracing::{debug, info, instrument};

use crate::application::consistency::{ConsistencyReport, Mismatch};
use crate::application::services::rows::{self, NODE_COLUMNS};
use crate::application::services::{StorageEngine, TreeService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{assign_ranges, NestedSetRow, NodeData, NodeId, TreeArena};
use crate::infrastructure::Database;

const RANGE_COLUMNS: [&str; 4] = ["node_id", "lft", "rgt", "depth"];

pub struct NestedSetTreeService<'db> {
    db: &'db Database,
    batch_size: usize,
}

fn range_from_row(row: &Row<'_>) -> rusqlite::Result<NestedSetRow> {
    Ok(NestedSetRow {
        node_id: row.get(0)?,
        left: row.get(1)?,
        right: row.get(2)?,
        depth: row.get(3)?,
    })
}

impl<'db> NestedSetTreeService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self::with_batch_size(db, super::DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(db: &'db Database, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    /// Persisted range of `id`, `NotFound` if the node has none.
    fn range_of(&self, id: NodeId) -> ApplicationResult<NestedSetRow> {
        self.conn()
            .query_row(
                "SELECT node_id, lft, rgt, depth FROM tree_nested_set WHERE node_id = ?1",
                [id],
                range_from_row,
            )
            .optional()?
            .ok_or(ApplicationError::NotFound(id))
    }

    fn query_nodes<P: Params>(&self, sql: &str, params: P) -> ApplicationResult<Vec<NodeData>> {
        let mut stmt = self.conn().prepare(sql)?;
        let nodes = stmt
            .query_map(params, rows::node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    /// Node columns plus `rgt`, ordered by `lft`.
    fn query_with_right<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> ApplicationResult<Vec<(NodeData, i64)>> {
        let mut stmt = self.conn().prepare(sql)?;
        let result = stmt
            .query_map(params, |row| Ok((rows::node_from_row(row)?, row.get(4)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    }

    fn insert_ranges(&self, ranges: &[NestedSetRow]) -> ApplicationResult<usize> {
        let values: Vec<Vec<Value>> = ranges
            .iter()
            .map(|r| {
                vec![
                    Value::Integer(r.node_id),
                    Value::Integer(r.left),
                    Value::Integer(r.right),
                    Value::Integer(r.depth),
                ]
            })
            .collect();
        rows::insert_rows(
            self.conn(),
            "tree_nested_set",
            &RANGE_COLUMNS,
            &values,
            self.batch_size,
        )
    }

    /// All persisted range rows ordered by `lft`.
    pub fn nested_set_rows(&self) -> ApplicationResult<Vec<NestedSetRow>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT node_id, lft, rgt, depth FROM tree_nested_set ORDER BY lft")?;
        let ranges = stmt
            .query_map([], range_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranges)
    }

    /// Recomputes ranges from the persisted tree and compares them per node
    /// with the stored rows. Every mismatch is collected into one report.
    #[instrument(level = "debug", skip(self))]
    pub fn validate_nested_set_data(&self) -> ApplicationResult<()> {
        let tree = self.get_tree()?;
        let expected = assign_ranges(&tree);
        let actual = self.nested_set_rows()?;
        let mut report = ConsistencyReport::compare(&expected, &actual);

        let mut stmt = self.conn().prepare(
            "SELECT n.id
             FROM tree_node n
               LEFT JOIN tree_nested_set t ON t.node_id = n.id
             WHERE t.node_id IS NULL
             ORDER BY n.id",
        )?;
        let unranged = stmt
            .query_map([], |row| row.get::<_, NodeId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        report.mismatches.extend(
            unranged
                .into_iter()
                .map(|node_id| Mismatch::Missing { node_id }),
        );

        if report.is_consistent() {
            info!("nested set is consistent ({} rows)", actual.len());
            Ok(())
        } else {
            Err(ApplicationError::Consistency(report))
        }
    }
}

/// Rebuilds a tree from rows ordered by `lft` using a stack of open ranges.
///
/// Each row closes every open range that ends before it, then becomes the
/// last child of the innermost range still open. `depth` is not consulted.
fn hydrate(rows: Vec<(NodeData, i64)>) -> ApplicationResult<TreeArena> {
    let mut tree = TreeArena::new();
    let mut stack: Vec<(Index, i64)> = Vec::new();

    for (data, right) in rows {
        let id = data.id;
        let idx = tree.insert_node(data)?;
        while stack.last().is_some_and(|&(_, open_right)| right > open_right) {
            stack.pop();
        }
        match stack.last() {
            Some(&(parent, _)) => tree.attach_child_unchecked(parent, idx),
            None => {
                if let Some(existing) = tree.root_node() {
                    return Err(ApplicationError::CorruptData {
                        node_id: id,
                        message: format!("range lies outside the range of root {}", existing.id()),
                    });
                }
                tree.set_root(idx);
            }
        }
        stack.push((idx, right));
    }
    Ok(tree)
}

impl TreeService for NestedSetTreeService<'_> {
    fn engine(&self) -> StorageEngine {
        StorageEngine::NestedSet
    }

    #[instrument(level = "debug", skip(self))]
    fn get_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>> {
        rows::fetch_node(self.conn(), id)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_tree(&self) -> ApplicationResult<TreeArena> {
        let sql = format!(
            "SELECT {NODE_COLUMNS}, t.rgt
             FROM tree_nested_set t
               INNER JOIN tree_node n ON n.id = t.node_id
             ORDER BY t.lft"
        );
        hydrate(self.query_with_right(&sql, [])?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_sub_tree(&self, id: NodeId) -> ApplicationResult<TreeArena> {
        let range = self.range_of(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}, t.rgt
             FROM tree_nested_set t
               INNER JOIN tree_node n ON n.id = t.node_id
             WHERE t.lft BETWEEN ?1 AND ?2
             ORDER BY t.lft"
        );
        hydrate(self.query_with_right(&sql, [range.left, range.right])?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_node_path(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>> {
        let range = self.range_of(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}
             FROM tree_nested_set t
               INNER JOIN tree_node n ON n.id = t.node_id
             WHERE t.lft <= ?1 AND t.rgt >= ?2
             ORDER BY t.lft DESC"
        );
        self.query_nodes(&sql, [range.left, range.right])
    }

    #[instrument(level = "debug", skip(self))]
    fn get_parent_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>> {
        let range = self.range_of(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}
             FROM tree_nested_set t
               INNER JOIN tree_node n ON n.id = t.node_id
             WHERE t.lft < ?1 AND t.rgt > ?2 AND t.depth = ?3"
        );
        Ok(self
            .conn()
            .query_row(
                &sql,
                [range.left, range.right, range.depth - 1],
                rows::node_from_row,
            )
            .optional()?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_children(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>> {
        let range = self.range_of(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}
             FROM tree_nested_set t
               INNER JOIN tree_node n ON n.id = t.node_id
             WHERE t.lft > ?1 AND t.rgt < ?2 AND t.depth = ?3
             ORDER BY t.lft"
        );
        self.query_nodes(&sql, [range.left, range.right, range.depth + 1])
    }

    /// Writes nodes and computed ranges in one transaction.
    #[instrument(level = "debug", skip(self, tree), fields(nodes = tree.len()))]
    fn save_tree(&self, tree: &TreeArena) -> ApplicationResult<()> {
        if tree.root().is_none() {
            return Err(ApplicationError::EmptyTree);
        }
        let tx = self.db.transaction()?;
        let nodes = tree.depth_first_list();
        rows::insert_nodes(
            self.conn(),
            nodes.iter().map(|node| &node.data),
            self.batch_size,
        )?;
        let ranges = assign_ranges(tree);
        self.insert_ranges(&ranges)?;
        tx.commit()?;
        debug!("saved {} nodes", nodes.len());
        Ok(())
    }

    /// Opens a gap of two at the parent's right boundary and puts the new
    /// leaf there.
    #[instrument(level = "debug", skip(self, node), fields(id = node.id))]
    fn add_node(&self, node: &NodeData, parent_id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        if rows::node_exists(self.conn(), node.id)? {
            return Err(ApplicationError::AlreadyExists(node.id));
        }
        let parent = self.range_of(parent_id)?;

        self.conn().execute(
            "UPDATE tree_nested_set SET rgt = rgt + 2 WHERE rgt >= ?1",
            [parent.right],
        )?;
        self.conn().execute(
            "UPDATE tree_nested_set SET lft = lft + 2 WHERE lft > ?1",
            [parent.right],
        )?;
        rows::insert_nodes(self.conn(), [node], self.batch_size)?;
        self.insert_ranges(&[NestedSetRow {
            node_id: node.id,
            left: parent.right,
            right: parent.right + 1,
            depth: parent.depth + 1,
        }])?;
        tx.commit()?;
        Ok(())
    }

    /// Relocates the subtree to the end of the new parent's children with a
    /// single `UPDATE`: the subtree shifts by the distance to the parent's
    /// right boundary, the rows in between shift by the subtree width.
    #[instrument(level = "debug", skip(self))]
    fn move_sub_tree(&self, id: NodeId, new_parent_id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        let node = self.range_of(id)?;
        let parent = self.range_of(new_parent_id)?;
        if parent.left >= node.left && parent.right <= node.right {
            return Err(ApplicationError::InvalidMove { id, new_parent_id });
        }

        let width = node.width();
        let target = parent.right;
        let (subtree_shift, between_low, between_high, between_shift) = if target > node.right {
            (target - node.right - 1, node.right + 1, target - 1, -width)
        } else {
            (target - node.left, target, node.left - 1, width)
        };
        let depth_shift = parent.depth + 1 - node.depth;

        let changed = self.conn().execute(
            "UPDATE tree_nested_set
             SET depth = CASE
                   WHEN lft BETWEEN :left AND :right THEN depth + :depth_shift
                   ELSE depth END,
                 lft = CASE
                   WHEN lft BETWEEN :left AND :right THEN lft + :subtree_shift
                   WHEN lft BETWEEN :low AND :high THEN lft + :between_shift
                   ELSE lft END,
                 rgt = CASE
                   WHEN lft BETWEEN :left AND :right THEN rgt + :subtree_shift
                   WHEN rgt BETWEEN :low AND :high THEN rgt + :between_shift
                   ELSE rgt END
             WHERE rgt >= :span_low AND lft <= :span_high",
            named_params! {
                ":left": node.left,
                ":right": node.right,
                ":depth_shift": depth_shift,
                ":subtree_shift": subtree_shift,
                ":low": between_low,
                ":high": between_high,
                ":between_shift": between_shift,
                ":span_low": node.left.min(between_low),
                ":span_high": node.right.max(between_high),
            },
        )?;
        tx.commit()?;
        debug!("moved {} under {} ({} rows touched)", id, new_parent_id, changed);
        Ok(())
    }

    /// Deletes every node inside the range (range rows cascade) and closes
    /// the gap.
    #[instrument(level = "debug", skip(self))]
    fn delete_sub_tree(&self, id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        let range = self.range_of(id)?;
        let deleted = self.conn().execute(
            "DELETE FROM tree_node
             WHERE id IN (
               SELECT node_id FROM tree_nested_set WHERE lft >= ?1 AND rgt <= ?2
             )",
            [range.left, range.right],
        )?;
        self.conn().execute(
            "UPDATE tree_nested_set SET lft = lft - ?1 WHERE lft > ?2",
            params![range.width(), range.right],
        )?;
        self.conn().execute(
            "UPDATE tree_nested_set SET rgt = rgt - ?1 WHERE rgt > ?2",
            params![range.width(), range.right],
        )?;
        tx.commit()?;
        debug!("deleted {} nodes", deleted);
        Ok(())
    }
}
