//! Integration tests for application configuration.
//!
//! Tests default values, TOML round-trips, store path resolution,
//! explicitly named config files, and platform detection.

mod common;

use std::path::PathBuf;

use jb_core::config::AppConfig;
use jb_core::error::JbError;
use jb_core::platform::Platform;
use tempfile::TempDir;

// ---- Default values ----

#[test]
fn default_config_has_expected_storage_defaults() {
    let config = AppConfig::default();
    assert!(config.storage.data_dir.is_empty());
    assert!(config.storage.metadata_path.is_empty());
    assert!(config.storage.blob_path.is_empty());
    assert!(config.storage.wal_mode, "WAL mode should be enabled by default");
    assert_eq!(config.storage.pool_size, 4);
    assert!(config.storage.integrity_check_on_startup);
    assert_eq!(config.storage.metadata_quota_bytes, 0, "no quota by default");
}

#[test]
fn default_config_has_expected_logging_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.directory.is_empty());
    assert!(!config.logging.json_output);
}

#[test]
fn default_config_has_expected_backup_and_display_defaults() {
    let config = AppConfig::default();
    assert!(config.backup.export_dir.is_empty());
    assert!(!config.backup.auto_backup_on_first_run);
    assert!(config.recovery.session_dir.is_empty());
    assert_eq!(config.display.currency_symbol, "$");
    assert_eq!(config.display.money_decimals, 2);
}

#[test]
fn format_money_uses_display_settings() {
    let mut config = AppConfig::default();
    assert_eq!(config.display.format_money(259.875), "$259.88");
    config.display.currency_symbol = "€".into();
    config.display.money_decimals = 3;
    assert_eq!(config.display.format_money(12.375), "€12.375");
}

// ---- TOML ----

#[test]
fn config_toml_roundtrip_preserves_fields() {
    let mut config = AppConfig::default();
    config.storage.data_dir = "/srv/jobbook".into();
    config.storage.metadata_quota_bytes = 5 * 1024 * 1024;
    config.logging.level = "debug".into();
    config.backup.auto_backup_on_first_run = true;
    config.display.currency_symbol = "£".into();

    let text = toml::to_string_pretty(&config).unwrap();
    let back: AppConfig = toml::from_str(&text).unwrap();

    assert_eq!(back.storage.data_dir, "/srv/jobbook");
    assert_eq!(back.storage.metadata_quota_bytes, 5 * 1024 * 1024);
    assert_eq!(back.logging.level, "debug");
    assert!(back.backup.auto_backup_on_first_run);
    assert_eq!(back.display.currency_symbol, "£");
}

#[test]
fn config_toml_partial_file_applies_defaults() {
    let config: AppConfig = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.storage.pool_size, 4);
    assert_eq!(config.display.money_decimals, 2);
}

#[test]
fn config_toml_empty_string_deserializes_to_defaults() {
    let config: AppConfig = toml::from_str("").unwrap();
    assert_eq!(config.logging.level, "info");
    assert!(config.storage.wal_mode);
}

#[test]
fn config_save_and_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.backup.export_dir = "/tmp/exports".into();
    config.save_to_file(&path).unwrap();

    let loaded = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.backup.export_dir, "/tmp/exports");
}

#[test]
fn config_load_nonexistent_file_returns_error() {
    let dir = TempDir::new().unwrap();
    assert!(AppConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
}

#[test]
fn config_load_invalid_toml_returns_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[storage\nwal_mode = ").unwrap();
    assert!(AppConfig::load_from_file(&path).is_err());
}

// ---- Path resolution ----

#[test]
fn store_paths_follow_data_dir() {
    let (config, dir) = common::create_test_config();
    assert_eq!(config.effective_data_dir().unwrap(), dir.path());
    assert_eq!(config.effective_metadata_path().unwrap(), dir.path().join("metadata.db"));
    assert_eq!(config.effective_blob_path().unwrap(), dir.path().join("blobs.db"));
    assert_eq!(config.effective_log_dir().unwrap(), dir.path().join("logs"));
    assert_eq!(config.effective_session_dir(), dir.path().join("session"));
}

#[test]
fn explicit_store_paths_win() {
    let mut config = AppConfig::default();
    config.storage.metadata_path = "/data/meta.db".into();
    config.storage.blob_path = "/data/files.db".into();
    assert_eq!(config.effective_metadata_path().unwrap(), PathBuf::from("/data/meta.db"));
    assert_eq!(config.effective_blob_path().unwrap(), PathBuf::from("/data/files.db"));
}

// ---- Named config files ----

#[test]
fn named_config_file_must_exist() {
    let (_config, dir) = common::create_test_config();
    let err = AppConfig::load_named(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, JbError::MissingConfig(_)), "got {err:?}");
}

#[test]
fn named_config_file_is_loaded() {
    let (mut config, dir) = common::create_test_config();
    config.display.money_decimals = 0;
    let path = dir.path().join("jobbook.toml");
    config.save_to_file(&path).unwrap();

    let loaded = AppConfig::load_named(&path).unwrap();
    assert_eq!(loaded.display.format_money(9.6), "$10");
}

// ---- Platform ----

#[test]
fn platform_name_is_human_readable() {
    let name = Platform::current().name();
    assert!(!name.is_empty());
}
