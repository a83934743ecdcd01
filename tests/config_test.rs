use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use rstest::rstest;
use tempfile::TempDir;

use lifetree::application::{ApplicationError, StorageEngine};
use lifetree::config::Settings;

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("lifetree.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn given_local_config_when_loading_then_file_values_override_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
database_path = "/tmp/lifetree-test/tree.db"
engine = "nested-set"
batch_size = 250
"#,
    );

    // Act
    let settings = Settings::load_with_env(Some(path.as_path()), env(&[])).unwrap();

    // Assert
    assert_eq!(settings.database_path, PathBuf::from("/tmp/lifetree-test/tree.db"));
    assert_eq!(settings.engine, StorageEngine::NestedSet);
    assert_eq!(settings.batch_size, 250);
    assert_eq!(settings.lock_timeout_secs, 10);
}

#[test]
fn given_env_overrides_when_loading_then_env_wins_over_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "engine = \"nested-set\"\nbatch_size = 250\n");

    let settings = Settings::load_with_env(
        Some(path.as_path()),
        env(&[
            ("LIFETREE_ENGINE", "adjacency-list"),
            ("LIFETREE_BATCH_SIZE", "7"),
            ("LIFETREE_LOCK_DIR", "/tmp/lifetree-locks"),
            ("LIFETREE_LOCK_TIMEOUT_SECS", "3"),
            ("OTHER_ENGINE", "nested-set"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.engine, StorageEngine::AdjacencyList);
    assert_eq!(settings.batch_size, 7);
    assert_eq!(settings.lock_dir, PathBuf::from("/tmp/lifetree-locks"));
    assert_eq!(settings.lock_timeout().as_secs(), 3);
}

#[test]
fn given_missing_explicit_config_when_loading_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let result = Settings::load_with_env(Some(path.as_path()), env(&[]));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[rstest]
#[case::bad_toml("engine = ", &[])]
#[case::unknown_engine_in_file("engine = \"b-tree\"\n", &[])]
#[case::unknown_engine_in_env("", &[("LIFETREE_ENGINE", "b-tree")])]
#[case::zero_batch("batch_size = 0\n", &[])]
#[case::non_numeric_batch_in_env("", &[("LIFETREE_BATCH_SIZE", "many")])]
fn given_invalid_setting_when_loading_then_config_error(
    #[case] file: &str,
    #[case] vars: &[(&str, &str)],
) {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, file);

    let result = Settings::load_with_env(Some(path.as_path()), env(vars));

    assert!(
        matches!(result, Err(ApplicationError::Config { .. })),
        "{result:?}"
    );
}

#[test]
fn given_settings_when_rendered_as_toml_then_it_loads_back_identically() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "database_path = \"/tmp/lifetree-test/tree.db\"\nlock_dir = \"/tmp/lifetree-test/locks\"\n",
    );
    let settings = Settings::load_with_env(Some(path.as_path()), env(&[])).unwrap();

    let rendered = settings.to_toml().unwrap();
    let rendered_path = write_config(&dir, &rendered);
    let reloaded = Settings::load_with_env(Some(rendered_path.as_path()), env(&[])).unwrap();

    assert!(rendered.contains("engine = \"adjacency-list\""));
    assert_eq!(reloaded, settings);
}
