//! Shared setup for unit and integration tests.

use std::env;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{NodeData, NodeId, TreeArena};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let noisy_modules = ["rusqlite"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Builds a tree from `(id, name, parent)` triples; the entry without a parent
/// becomes the root. Panics on invalid input.
pub fn tree_from_triples(triples: &[(NodeId, &str, Option<NodeId>)]) -> TreeArena {
    let mut tree = TreeArena::new();
    for &(id, name, _) in triples {
        tree.insert_node(NodeData::new(id, name, false, 0))
            .expect("insert test node");
    }
    for &(id, _, parent) in triples {
        match parent {
            Some(parent) => tree.attach_child(parent, id).expect("attach test node"),
            None => tree.set_root(tree.index_of(id).expect("root index")),
        }
    }
    tree
}
