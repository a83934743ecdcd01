//! Tree of life storage engine.
//!
//! A taxonomy tree is built in memory from CSV files ([`domain::TreeBuilder`])
//! and persisted in SQLite with one of two interchangeable encodings behind
//! [`application::TreeService`]: an adjacency list or a nested set.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
