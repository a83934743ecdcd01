//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/lifetree/lifetree.toml`
//! 3. Local config: explicit `--config` path or `./.lifetree.toml`
//! 4. Environment variables: `LIFETREE_*` prefix

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, StorageEngine, DEFAULT_BATCH_SIZE};

pub const ENV_PREFIX: &str = "LIFETREE";
pub const LOCAL_CONFIG_FILE: &str = ".lifetree.toml";

/// Effective application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Engine used when the command line does not pick one
    pub engine: StorageEngine,
    /// Rows per multi-row INSERT when saving a tree
    pub batch_size: usize,
    /// Directory holding named lock files
    pub lock_dir: PathBuf,
    /// How long to wait for a named lock
    pub lock_timeout_secs: u64,
}

/// Raw settings for intermediate parsing; `None` means "not specified".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database_path: Option<PathBuf>,
    pub engine: Option<StorageEngine>,
    pub batch_size: Option<usize>,
    pub lock_dir: Option<PathBuf>,
    pub lock_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_path: data_dir.join("lifetree.db"),
            engine: StorageEngine::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            lock_dir: data_dir.join("locks"),
            lock_timeout_secs: 10,
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "lifetree")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".lifetree"))
}

/// Get the XDG config directory for lifetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lifetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("lifetree.toml"))
}

/// Local config file: the explicit path if given, else `./.lifetree.toml`.
pub fn local_config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand_path(path: &Path) -> Result<PathBuf, ApplicationError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(raw.as_ref()).map_err(|e| ApplicationError::Config {
        message: format!("expand {}: {}", raw, e),
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn parse_engine(value: &str) -> Result<StorageEngine, ApplicationError> {
    StorageEngine::from_str(value, true).map_err(|_| ApplicationError::Config {
        message: format!("unknown engine '{value}', expected adjacency-list or nested-set"),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Scalar overlay: values present in `overlay` win.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database_path: overlay
                .database_path
                .clone()
                .unwrap_or_else(|| self.database_path.clone()),
            engine: overlay.engine.unwrap_or(self.engine),
            batch_size: overlay.batch_size.unwrap_or(self.batch_size),
            lock_dir: overlay
                .lock_dir
                .clone()
                .unwrap_or_else(|| self.lock_dir.clone()),
            lock_timeout_secs: overlay.lock_timeout_secs.unwrap_or(self.lock_timeout_secs),
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path fields.
    fn expand_paths(&mut self) -> Result<(), ApplicationError> {
        self.database_path = expand_path(&self.database_path)?;
        self.lock_dir = expand_path(&self.lock_dir)?;
        Ok(())
    }

    /// Load settings with layered precedence from the process environment.
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_with_env(local_config, None)
    }

    /// Like [`Settings::load`], reading `LIFETREE_*` variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        local_config: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        let local_path = local_config_path(local_config);
        if local_path.exists() {
            debug!("local config: {}", local_path.display());
            current = current.merge_with(&load_raw_settings(&local_path)?);
        } else if local_config.is_some() {
            return Err(ApplicationError::Config {
                message: format!("config file not found: {}", local_path.display()),
            });
        }

        current = Self::apply_env_overrides(current, env)?;
        current.expand_paths()?;
        if current.batch_size == 0 {
            return Err(ApplicationError::Config {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        Ok(current)
    }

    /// Apply LIFETREE_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("database_path") {
            settings.database_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("engine") {
            settings.engine = parse_engine(&val)?;
        }
        if let Ok(val) = config.get_string("batch_size") {
            settings.batch_size = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("invalid batch_size '{val}': {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("lock_dir") {
            settings.lock_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("lock_timeout_secs") {
            settings.lock_timeout_secs = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("invalid lock_timeout_secs '{val}': {e}"),
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_created_then_uses_adjacency_list_and_standard_batch() {
        let settings = Settings::default();
        assert_eq!(settings.engine, StorageEngine::AdjacencyList);
        assert_eq!(settings.batch_size, 1000);
        assert!(settings.database_path.ends_with("lifetree.db"));
    }

    #[test]
    fn given_partial_overlay_when_merging_then_only_given_fields_change() {
        let base = Settings::default();
        let overlay = RawSettings {
            engine: Some(StorageEngine::NestedSet),
            batch_size: Some(50),
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.engine, StorageEngine::NestedSet);
        assert_eq!(merged.batch_size, 50);
        assert_eq!(merged.database_path, base.database_path);
        assert_eq!(merged.lock_timeout_secs, base.lock_timeout_secs);
    }

    #[test]
    fn given_tilde_in_database_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            database_path: PathBuf::from("~/trees/life.db"),
            ..Settings::default()
        };

        settings.expand_paths().unwrap();

        assert!(!settings.database_path.to_string_lossy().starts_with('~'));
        assert!(settings.database_path.ends_with("trees/life.db"));
    }

    #[test]
    fn given_unknown_engine_name_when_parsing_then_config_error() {
        assert!(matches!(
            parse_engine("b-tree"),
            Err(ApplicationError::Config { .. })
        ));
        assert_eq!(parse_engine("nested-set").unwrap(), StorageEngine::NestedSet);
    }
}
