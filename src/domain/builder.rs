//! Tree builder for loading the tree of life from flat CSV files.
//!
//! Two record streams are read: a node stream
//! (`node_id,node_name,...,extinct,confidence,...`) and a link stream
//! (`source_node_id,target_node_id`), where the source is the parent.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, instrument};

use crate::domain::arena::{TreeArena, TreeNode};
use crate::domain::entities::{NodeData, NodeId};
use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Deserialize)]
struct NodeRecord {
    #[serde(alias = "id")]
    node_id: NodeId,
    #[serde(alias = "name")]
    node_name: String,
    #[serde(default, deserialize_with = "bool_like")]
    extinct: bool,
    #[serde(default, deserialize_with = "int_like")]
    confidence: i32,
}

#[derive(Debug, Deserialize)]
struct LinkRecord {
    #[serde(alias = "parent_id")]
    source_node_id: NodeId,
    #[serde(alias = "child_id")]
    target_node_id: NodeId,
}

/// Accepts `0/1`, `true/false`, `yes/no`; an empty field is false.
fn bool_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, got '{other}'"
        ))),
    }
}

/// Integer field where an empty value means 0.
fn int_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|_| serde::de::Error::custom(format!("expected an integer, got '{raw}'")))
}

/// Constructs a tree of life from node and link record streams.
///
/// Nodes must be loaded before links. After links are loaded the builder
/// holds a single-rooted tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: TreeArena,
    links_loaded: bool,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_nodes_file(&mut self, path: &Path) -> DomainResult<usize> {
        let file = open_source(path)?;
        self.load_nodes_from(&path.display().to_string(), file)
    }

    pub fn load_nodes<R: Read>(&mut self, input: R) -> DomainResult<usize> {
        self.load_nodes_from("node records", input)
    }

    #[instrument(level = "debug", skip(self, input))]
    fn load_nodes_from<R: Read>(&mut self, source_name: &str, input: R) -> DomainResult<usize> {
        let mut count = 0;
        for_each_record(source_name, input, |_line, record: NodeRecord| {
            let data = NodeData::new(
                record.node_id,
                record.node_name,
                record.extinct,
                record.confidence,
            );
            self.tree.insert_node(data)?;
            count += 1;
            Ok(())
        })?;

        if count == 0 {
            return Err(DomainError::EmptySource(source_name.to_string()));
        }
        info!("loaded {} nodes from {}", count, source_name);
        Ok(count)
    }

    pub fn load_links_file(&mut self, path: &Path) -> DomainResult<usize> {
        let file = open_source(path)?;
        self.load_links_from(&path.display().to_string(), file)
    }

    pub fn load_links<R: Read>(&mut self, input: R) -> DomainResult<usize> {
        self.load_links_from("link records", input)
    }

    #[instrument(level = "debug", skip(self, input))]
    fn load_links_from<R: Read>(&mut self, source_name: &str, input: R) -> DomainResult<usize> {
        let mut count = 0;
        for_each_record(source_name, input, |line, record: LinkRecord| {
            let parent = record.source_node_id;
            let child = record.target_node_id;
            for id in [parent, child] {
                if self.tree.index_of(id).is_none() {
                    return Err(DomainError::UnknownNode { id, line });
                }
            }
            self.tree.attach_child(parent, child)?;
            count += 1;
            Ok(())
        })?;

        let mut roots: Vec<NodeId> = self.tree.parentless().map(|(_, node)| node.id()).collect();
        roots.sort_unstable();
        // Zero roots cannot happen: every node starts parentless and cycles are rejected on attach.
        match roots.as_slice() {
            [] => return Err(DomainError::NotLoaded),
            [root] => {
                let root_idx = self.tree.index_of(*root).ok_or(DomainError::NotInTree(*root))?;
                self.tree.set_root(root_idx);
                debug!("tree root: {}", root);
            }
            _ => return Err(DomainError::MultipleRoots(roots)),
        }

        self.links_loaded = true;
        info!("loaded {} links from {}", count, source_name);
        Ok(count)
    }

    /// Root of the loaded tree.
    pub fn root(&self) -> DomainResult<&TreeNode> {
        if !self.links_loaded {
            return Err(DomainError::NotLoaded);
        }
        self.tree.root_node().ok_or(DomainError::NotLoaded)
    }

    /// Consumes the builder and returns the loaded tree.
    pub fn into_tree(self) -> DomainResult<TreeArena> {
        if !self.links_loaded {
            return Err(DomainError::NotLoaded);
        }
        Ok(self.tree)
    }
}

fn open_source(path: &Path) -> DomainResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DomainError::FileNotFound(path.to_path_buf()),
        _ => DomainError::Read {
            source_name: path.display().to_string(),
            message: e.to_string(),
        },
    })
}

/// Reads every record after the header row, deserializing by column name.
fn for_each_record<R, T, F>(source_name: &str, input: R, mut handle: F) -> DomainResult<()>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
    F: FnMut(u64, T) -> DomainResult<()>,
{
    let read_error = |e: csv::Error| DomainError::Read {
        source_name: source_name.to_string(),
        message: e.to_string(),
    };

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);
    let headers = reader.headers().map_err(read_error)?.clone();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(read_error)? {
        let line = record.position().map_or(0, |p| p.line());
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| DomainError::InvalidRecord {
                line,
                message: e.to_string(),
            })?;
        handle(line, row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = "\
node_id,node_name,child_nodes,leaf_node,tolorg_link,extinct,confidence,phylesis
1,Life on Earth,1,0,1,0,0,0
2,Eukaryotes,1,0,1,0,0,0
3,Animals,0,1,1,1,2,0
";

    #[test]
    fn test_bool_and_int_like_fields() {
        let mut builder = TreeBuilder::new();
        builder.load_nodes(NODES.as_bytes()).unwrap();
        builder
            .load_links("source_node_id,target_node_id\n1,2\n2,3\n".as_bytes())
            .unwrap();
        let tree = builder.into_tree().unwrap();
        let animals = tree.node_by_id(3).unwrap();
        assert!(animals.data.extinct);
        assert_eq!(animals.data.confidence, 2);
    }

    #[test]
    fn test_invalid_confidence_reports_line() {
        let mut builder = TreeBuilder::new();
        let err = builder
            .load_nodes("node_id,node_name,extinct,confidence\n1,Life,0,high\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRecord { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn test_root_before_links_is_not_loaded() {
        let mut builder = TreeBuilder::new();
        builder.load_nodes(NODES.as_bytes()).unwrap();
        assert_eq!(builder.root().unwrap_err(), DomainError::NotLoaded);
    }
}
