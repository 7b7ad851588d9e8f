//! Configuration loading and root folder resolution
//!
//! Tests that manipulate STACKS_ROOT_FOLDER or STACKS_CONFIG are marked
//! with #[serial] so they never race on the process environment.

use serial_test::serial;
use stacks_common::config::{
    RootFolderInitializer, RootFolderResolver, TomlConfig, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/stacks-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/stacks-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new(Some(Path::new("/tmp/stacks-cli")), &config).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/stacks-cli"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/stacks-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/stacks-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/stacks-env"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_root_folder_used_without_overrides() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/stacks-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/stacks-toml"));
}

#[test]
#[serial]
fn test_load_reads_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/stacks"

[ops]
port = 6000

[auth]
redirect_url = "https://auth.example.org/?id={0}&d={1}"
domain_name = "LIBRARY"
cache_discriminator = "ops"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/stacks")));
    assert_eq!(config.ops.port, Some(6000));
    assert_eq!(config.auth.domain_name.as_deref(), Some("LIBRARY"));
    assert_eq!(config.auth.cache_discriminator(), "ops");
    assert_eq!(config.auth.timeout_minutes(), 2);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/stacks/config.toml");

    let config = TomlConfig::load(None).unwrap();
    assert!(config.root_folder.is_none());
    assert!(config.auth.redirect_template().is_none());

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_initializer_creates_layout() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("stacks");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();

    assert!(root.exists());
    assert!(initializer.profile_pictures_path().exists());
    assert_eq!(initializer.database_path(), root.join("stacks.db"));
}
