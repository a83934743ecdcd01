//! Command dispatch: each subcommand resolves settings, opens the database
//! through the service container and calls one tree service operation.

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, StorageEngine};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{self, Settings};
use crate::domain::{NodeData, TreeArena, TreeBuilder, TreeDisplay};
use crate::infrastructure::di::ServiceContainer;

/// Named lock serializing structural mutations across processes.
pub const TREE_LOCK: &str = "lifetree-structure";

pub fn execute(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => {
            let settings = load_settings(cli)?;
            return config_command(command, &settings, cli);
        }
        _ => {}
    }

    let settings = load_settings(cli)?;
    let engine = settings.engine;
    let container = ServiceContainer::new(settings)?;
    debug!("engine: {}", engine);

    match &cli.command {
        Commands::Load {
            nodes,
            links,
            replace,
        } => {
            let mut builder = TreeBuilder::new();
            let node_count = builder.load_nodes_file(nodes)?;
            let link_count = builder.load_links_file(links)?;
            let tree = builder.into_tree()?;
            debug!("parsed {} nodes, {} links", node_count, link_count);

            load_tree(&container, engine, &tree, *replace)?;
            output::success(&format!(
                "Loaded {} nodes (depth {}) as {}",
                tree.len(),
                tree.depth(),
                engine
            ));
            if *replace {
                output::detail(&"existing tree data was replaced");
            }
        }

        Commands::Show { id } => {
            let node = container
                .tree_service(engine)
                .get_node(*id)?
                .ok_or(ApplicationError::NotFound(*id))?;
            output::node(&node);
        }

        Commands::Tree { id, max_depth } => {
            if *max_depth == Some(0) {
                return Err(CliError::InvalidArgs(
                    "max depth must be at least 1".to_string(),
                ));
            }
            let service = container.tree_service(engine);
            let tree = match id {
                Some(id) => service.get_sub_tree(*id)?,
                None => service.get_tree()?,
            };
            if tree.is_empty() {
                return Err(ApplicationError::EmptyTree.into());
            }
            output::info(&tree.to_display_tree(*max_depth));
        }

        Commands::Path { id } => {
            let path = container.tree_service(engine).get_node_path(*id)?;
            output::header(&format!("Path from {} to the root", id));
            output::node_list(&path, "no path");
        }

        Commands::Parent { id } => match container.tree_service(engine).get_parent_node(*id)? {
            Some(parent) => output::node(&parent),
            None => output::info(&format!("{} is the root", id)),
        },

        Commands::Children { id } => {
            let children = container.tree_service(engine).get_children(*id)?;
            output::node_list(&children, "no children");
        }

        Commands::Add {
            id,
            name,
            parent,
            extinct,
            confidence,
        } => {
            let node = NodeData::new(*id, name.clone(), *extinct, *confidence);
            with_tree_lock(&container, || {
                container.tree_service(engine).add_node(&node, *parent)
            })?;
            output::action("Added", &format!("{} under {}", node, parent));
        }

        Commands::Move { id, new_parent } => {
            with_tree_lock(&container, || {
                container.tree_service(engine).move_sub_tree(*id, *new_parent)
            })?;
            output::action("Moved", &format!("{} under {}", id, new_parent));
        }

        Commands::Delete { id } => {
            with_tree_lock(&container, || {
                container.tree_service(engine).delete_sub_tree(*id)
            })?;
            output::action("Deleted", &format!("subtree of {}", id));
        }

        Commands::Validate => validate(&container, engine)?,

        Commands::Config { .. } | Commands::Completion { .. } => {}
    }
    Ok(())
}

/// Settings with command line overrides applied on top.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        settings.database_path = database.clone();
    }
    if let Some(engine) = cli.engine {
        settings.engine = engine;
    }
    Ok(settings)
}

/// Stores `tree` with `engine`, first clearing every table when `replace` is set.
///
/// Clearing and saving share one transaction under [`TREE_LOCK`], so a failed
/// save leaves the previous tree in place.
pub fn load_tree(
    container: &ServiceContainer,
    engine: StorageEngine,
    tree: &TreeArena,
    replace: bool,
) -> ApplicationResult<()> {
    container
        .executor()
        .run_in_transaction_with_lock(TREE_LOCK, || {
            if replace {
                container.database().clear_tree_data()?;
            }
            container.tree_service(engine).save_tree(tree)
        })
}

fn with_tree_lock<T>(
    container: &ServiceContainer,
    action: impl FnOnce() -> ApplicationResult<T>,
) -> ApplicationResult<T> {
    let executor = container.executor();
    executor.run_under_named_lock(TREE_LOCK, executor.lock_timeout(), action)
}

#[instrument(level = "debug", skip(container))]
fn validate(container: &ServiceContainer, engine: StorageEngine) -> CliResult<()> {
    if engine != StorageEngine::NestedSet {
        output::warning(&format!(
            "validation checks the nested-set encoding, not {}",
            engine
        ));
    }
    match container.nested_set_service().validate_nested_set_data() {
        Ok(()) => {
            output::success(&"nested set is consistent");
            Ok(())
        }
        Err(ApplicationError::Consistency(report)) => {
            output::header(&format!("{} mismatch(es)", report.len()));
            for mismatch in &report.mismatches {
                output::failure(mismatch);
            }
            Err(CliError::Application(ApplicationError::Consistency(report)))
        }
        Err(e) => Err(e.into()),
    }
}

fn config_command(command: &ConfigCommands, settings: &Settings, cli: &Cli) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Path => {
            match config::global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", &"<unavailable>"),
            }
            let local = config::local_config_path(cli.config.as_deref());
            output::action("local", &local.display());
            output::action("database", &settings.database_path.display());
        }
    }
    Ok(())
}
