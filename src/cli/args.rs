//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::application::StorageEngine;
use crate::domain::NodeId;

/// Tree of life storage: load, query and restructure a taxonomy stored as an
/// adjacency list or a nested set
#[derive(Parser, Debug)]
#[command(name = "lifetree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level, repeat for more output (-d -d -d)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Storage engine (default from settings)
    #[arg(short, long, value_enum, global = true)]
    pub engine: Option<StorageEngine>,

    /// SQLite database file (default from settings)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub database: Option<PathBuf>,

    /// Local config file (default: ./.lifetree.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a tree from node and link CSV files
    Load {
        /// Nodes CSV: node_id, node_name, extinct, confidence
        #[arg(long, value_hint = ValueHint::FilePath)]
        nodes: PathBuf,
        /// Links CSV: source_node_id (parent), target_node_id (child)
        #[arg(long, value_hint = ValueHint::FilePath)]
        links: PathBuf,
        /// Remove existing tree data first
        #[arg(long)]
        replace: bool,
    },

    /// Show one node
    Show {
        id: NodeId,
    },

    /// Print the tree, or the subtree rooted at a node
    Tree {
        id: Option<NodeId>,
        /// Limit the printed depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Path from a node up to the root
    Path {
        id: NodeId,
    },

    /// Parent of a node
    Parent {
        id: NodeId,
    },

    /// Children of a node
    Children {
        id: NodeId,
    },

    /// Add a leaf node
    Add {
        id: NodeId,
        name: String,
        /// Parent node id
        #[arg(long)]
        parent: NodeId,
        #[arg(long)]
        extinct: bool,
        #[arg(long, default_value_t = 0)]
        confidence: i32,
    },

    /// Move a node with its subtree under a new parent
    Move {
        id: NodeId,
        new_parent: NodeId,
    },

    /// Delete a node with its subtree
    Delete {
        id: NodeId,
    },

    /// Check persisted nested-set ranges against a recomputation
    Validate,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings as TOML
    Show,
    /// Show config file locations
    Path,
}
