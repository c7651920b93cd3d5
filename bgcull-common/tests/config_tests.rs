//! Unit tests for configuration and graceful degradation
//!
//! Tests cover:
//! - Missing or broken TOML files fall back to defaults
//! - Partial TOML files fill unspecified sections with defaults
//! - Root folder priority order (CLI → ENV → TOML → default)
//! - Cache directory creation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate BGCULL_ROOT_FOLDER are marked with #[serial].

use bgcull_common::config::{
    default_root_folder, CatalogConfig, LoggingConfig, RootFolderInitializer, RootFolderResolver,
    TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = TomlConfig::load_or_default(&temp_dir.path().join("absent.toml"));

    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.catalog.timeout_secs, 30);
}

#[test]
fn test_unparseable_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "root_folder = [this is not toml").unwrap();

    let config = TomlConfig::load_or_default(&path);

    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 6000

        [catalog]
        auth_token = "abc"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, Some(6000));
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(
        config.catalog,
        CatalogConfig {
            base_url: None,
            auth_token: Some("abc".to_string()),
            timeout_secs: 30,
        }
    );
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/bgcull-env-root");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/bgcull-toml-root")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(Some(PathBuf::from("/tmp/bgcull-cli-root")), &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/bgcull-cli-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/bgcull-env-root");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/bgcull-toml-root")),
        ..Default::default()
    };

    let resolver = RootFolderResolver::new(None, &toml);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/bgcull-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/bgcull-toml-root")),
        ..Default::default()
    };
    assert_eq!(
        RootFolderResolver::new(None, &toml).resolve(),
        PathBuf::from("/tmp/bgcull-toml-root")
    );

    assert_eq!(
        RootFolderResolver::new(None, &TomlConfig::default()).resolve(),
        default_root_folder()
    );
}

#[test]
fn test_initializer_creates_cache_dir() {
    let temp_dir = TempDir::new().unwrap();
    let initializer = RootFolderInitializer::new(temp_dir.path().join("root"));

    initializer.ensure_directories_exist().unwrap();
    // Second call is a no-op
    initializer.ensure_directories_exist().unwrap();

    assert!(initializer.cache_dir().is_dir());
    assert!(initializer.cache_dir().ends_with("cache"));
}
