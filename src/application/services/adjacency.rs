//! Adjacency-list engine: one `(node_id, parent_id)` edge row per non-root node.

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Params};
use tracing::{debug, instrument};

use crate::application::services::rows::{self, NODE_COLUMNS};
use crate::application::services::{StorageEngine, TreeService};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{NodeData, NodeId, TreeArena};
use crate::infrastructure::Database;

const EDGE_COLUMNS: [&str; 2] = ["node_id", "parent_id"];

pub struct AdjacencyListTreeService<'db> {
    db: &'db Database,
    batch_size: usize,
}

impl<'db> AdjacencyListTreeService<'db> {
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

    fn require_node(&self, id: NodeId) -> ApplicationResult<()> {
        if rows::node_exists(self.conn(), id)? {
            Ok(())
        } else {
            Err(ApplicationError::NotFound(id))
        }
    }

    /// Runs a query returning node columns followed by a nullable parent id.
    fn query_with_parents<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> ApplicationResult<Vec<(NodeData, Option<NodeId>)>> {
        let mut stmt = self.conn().prepare(sql)?;
        let result = stmt
            .query_map(params, |row| Ok((rows::node_from_row(row)?, row.get(4)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(result)
    }

    fn query_nodes<P: Params>(&self, sql: &str, params: P) -> ApplicationResult<Vec<NodeData>> {
        let mut stmt = self.conn().prepare(sql)?;
        let nodes = stmt
            .query_map(params, rows::node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn insert_edges(&self, edges: &[(NodeId, NodeId)]) -> ApplicationResult<usize> {
        let rows: Vec<Vec<Value>> = edges
            .iter()
            .map(|&(node_id, parent_id)| vec![Value::Integer(node_id), Value::Integer(parent_id)])
            .collect();
        rows::insert_rows(
            self.conn(),
            "tree_adjacency",
            &EDGE_COLUMNS,
            &rows,
            self.batch_size,
        )
    }
}

/// Rebuilds a tree from `(node, parent_id)` rows; the row without a parent is
/// the root. Children are attached in row order.
fn hydrate(rows: Vec<(NodeData, Option<NodeId>)>) -> ApplicationResult<TreeArena> {
    let mut tree = TreeArena::new();
    let mut links = Vec::with_capacity(rows.len());
    for (data, parent_id) in rows {
        let id = data.id;
        let idx = tree.insert_node(data)?;
        links.push((idx, id, parent_id));
    }

    for (idx, id, parent_id) in links {
        match parent_id {
            Some(parent_id) => {
                let parent_idx = tree.index_of(parent_id).ok_or_else(|| {
                    ApplicationError::CorruptData {
                        node_id: id,
                        message: format!("parent {parent_id} is not part of the tree"),
                    }
                })?;
                tree.attach_child_unchecked(parent_idx, idx);
            }
            None => {
                if let Some(existing) = tree.root_node() {
                    return Err(ApplicationError::CorruptData {
                        node_id: id,
                        message: format!("second parentless node next to {}", existing.id()),
                    });
                }
                tree.set_root(idx);
            }
        }
    }
    Ok(tree)
}

impl TreeService for AdjacencyListTreeService<'_> {
    fn engine(&self) -> StorageEngine {
        StorageEngine::AdjacencyList
    }

    #[instrument(level = "debug", skip(self))]
    fn get_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>> {
        rows::fetch_node(self.conn(), id)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_tree(&self) -> ApplicationResult<TreeArena> {
        let sql = format!(
            "SELECT {NODE_COLUMNS}, e.parent_id
             FROM tree_node n
               LEFT JOIN tree_adjacency e ON e.node_id = n.id
             ORDER BY e.seq"
        );
        hydrate(self.query_with_parents(&sql, [])?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_sub_tree(&self, id: NodeId) -> ApplicationResult<TreeArena> {
        self.require_node(id)?;
        let sql = format!(
            "WITH RECURSIVE sub_tree (node_id, parent_id, seq) AS (
               SELECT n.id, NULL, 0 FROM tree_node n WHERE n.id = ?1
               UNION ALL
               SELECT e.node_id, e.parent_id, e.seq
               FROM tree_adjacency e
                 INNER JOIN sub_tree s ON e.parent_id = s.node_id
             )
             SELECT {NODE_COLUMNS}, s.parent_id
             FROM sub_tree s
               INNER JOIN tree_node n ON n.id = s.node_id
             ORDER BY s.seq"
        );
        hydrate(self.query_with_parents(&sql, [id])?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_node_path(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>> {
        let sql = format!(
            "WITH RECURSIVE ancestry (node_id, level) AS (
               SELECT n.id, 0 FROM tree_node n WHERE n.id = ?1
               UNION ALL
               SELECT e.parent_id, a.level + 1
               FROM tree_adjacency e
                 INNER JOIN ancestry a ON e.node_id = a.node_id
             )
             SELECT {NODE_COLUMNS}
             FROM ancestry a
               INNER JOIN tree_node n ON n.id = a.node_id
             ORDER BY a.level"
        );
        let path = self.query_nodes(&sql, [id])?;
        if path.is_empty() {
            return Err(ApplicationError::NotFound(id));
        }
        Ok(path)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_parent_node(&self, id: NodeId) -> ApplicationResult<Option<NodeData>> {
        self.require_node(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}
             FROM tree_adjacency e
               INNER JOIN tree_node n ON n.id = e.parent_id
             WHERE e.node_id = ?1"
        );
        Ok(self
            .conn()
            .query_row(&sql, [id], rows::node_from_row)
            .optional()?)
    }

    #[instrument(level = "debug", skip(self))]
    fn get_children(&self, id: NodeId) -> ApplicationResult<Vec<NodeData>> {
        self.require_node(id)?;
        let sql = format!(
            "SELECT {NODE_COLUMNS}
             FROM tree_adjacency e
               INNER JOIN tree_node n ON n.id = e.node_id
             WHERE e.parent_id = ?1
             ORDER BY e.seq"
        );
        self.query_nodes(&sql, [id])
    }

    /// Writes nodes and edges chunk by chunk, committing each chunk on its own.
    #[instrument(level = "debug", skip(self, tree), fields(nodes = tree.len()))]
    fn save_tree(&self, tree: &TreeArena) -> ApplicationResult<()> {
        if tree.root().is_none() {
            return Err(ApplicationError::EmptyTree);
        }
        let nodes = tree.depth_first_list();
        for (n, chunk) in nodes.chunks(self.batch_size).enumerate() {
            let tx = self.db.transaction()?;
            rows::insert_nodes(self.conn(), chunk.iter().map(|node| &node.data), self.batch_size)?;
            let edges: Vec<(NodeId, NodeId)> = chunk
                .iter()
                .filter_map(|node| {
                    node.parent()
                        .and_then(|parent| tree.get_node(parent))
                        .map(|parent| (node.id(), parent.id()))
                })
                .collect();
            self.insert_edges(&edges)?;
            tx.commit()?;
            debug!("saved chunk {} ({} nodes)", n, chunk.len());
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, node), fields(id = node.id))]
    fn add_node(&self, node: &NodeData, parent_id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        if rows::node_exists(self.conn(), node.id)? {
            return Err(ApplicationError::AlreadyExists(node.id));
        }
        self.require_node(parent_id)?;
        rows::insert_nodes(self.conn(), [node], self.batch_size)?;
        self.insert_edges(&[(node.id, parent_id)])?;
        tx.commit()?;
        Ok(())
    }

    /// Re-points the edge row; the edge also moves to the end of the
    /// insertion sequence so the node becomes the last child.
    #[instrument(level = "debug", skip(self))]
    fn move_sub_tree(&self, id: NodeId, new_parent_id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        self.require_node(id)?;
        let target_path = self.get_node_path(new_parent_id)?;
        if target_path.iter().any(|ancestor| ancestor.id == id) {
            return Err(ApplicationError::InvalidMove { id, new_parent_id });
        }

        let changed = self.conn().execute(
            "UPDATE tree_adjacency
             SET parent_id = ?2,
                 seq = (SELECT MAX(seq) + 1 FROM tree_adjacency)
             WHERE node_id = ?1",
            params![id, new_parent_id],
        )?;
        if changed == 0 {
            return Err(ApplicationError::CorruptData {
                node_id: id,
                message: "node has no parent edge".to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    /// Deletes the node rows of the descendant closure; edge rows cascade.
    #[instrument(level = "debug", skip(self))]
    fn delete_sub_tree(&self, id: NodeId) -> ApplicationResult<()> {
        let tx = self.db.transaction()?;
        self.require_node(id)?;
        let deleted = self.conn().execute(
            "WITH RECURSIVE sub_tree (node_id) AS (
               SELECT ?1
               UNION ALL
               SELECT e.node_id
               FROM tree_adjacency e
                 INNER JOIN sub_tree s ON e.parent_id = s.node_id
             )
             DELETE FROM tree_node WHERE id IN (SELECT node_id FROM sub_tree)",
            [id],
        )?;
        tx.commit()?;
        debug!("deleted {} nodes", deleted);
        Ok(())
    }
}
