//! Application configuration management.
//!
//! Handles loading, saving, and accessing application configuration:
//! where the metadata and blob stores live, storage quotas, logging,
//! the recovery snapshot location, backup export and display preferences.
//! Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{BLOB_DB_FILE, METADATA_DB_FILE};
use crate::error::{JbError, JbResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage settings for the metadata and blob databases.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Recovery snapshot settings.
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Backup export settings.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Display settings used by the CLI and invoice output.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Storage configuration shared by both SQLite-backed stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for store files. If empty, uses the platform data dir.
    #[serde(default)]
    pub data_dir: String,

    /// Path to the metadata database. If empty, `<data_dir>/metadata.db`.
    #[serde(default)]
    pub metadata_path: String,

    /// Path to the blob database. If empty, `<data_dir>/blobs.db`.
    #[serde(default)]
    pub blob_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Maximum number of connections per pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Run integrity check when a store is opened.
    #[serde(default = "default_true")]
    pub integrity_check_on_startup: bool,

    /// Upper bound on the metadata database size in bytes. Writes past it
    /// fail with a quota error. Zero means unlimited.
    #[serde(default)]
    pub metadata_quota_bytes: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// Recovery snapshot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Directory holding the session-scoped snapshot. If empty, uses the
    /// platform session directory.
    #[serde(default)]
    pub session_dir: String,
}

/// Backup export configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory exported backups are written to. If empty, uses the
    /// user's documents directory.
    #[serde(default)]
    pub export_dir: String,

    /// Enable auto-backup in the state created on first run.
    #[serde(default)]
    pub auto_backup_on_first_run: bool,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Currency symbol prefixed to money amounts.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Number of decimal places shown for money amounts.
    #[serde(default = "default_money_decimals")]
    pub money_decimals: usize,
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_money_decimals() -> usize {
    2
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            metadata_path: String::new(),
            blob_path: String::new(),
            wal_mode: true,
            pool_size: default_pool_size(),
            integrity_check_on_startup: true,
            metadata_quota_bytes: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            money_decimals: default_money_decimals(),
        }
    }
}

impl DisplayConfig {
    /// Format a money amount using the configured symbol and precision.
    pub fn format_money(&self, amount: f64) -> String {
        format!(
            "{}{:.*}",
            self.currency_symbol, self.money_decimals, amount
        )
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> JbResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> JbResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load a configuration file the user named explicitly. Unlike the
    /// default path, a missing file is an error.
    pub fn load_named(path: &Path) -> JbResult<Self> {
        if !path.exists() {
            return Err(JbError::MissingConfig(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        Self::load_from_file(path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> JbResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| JbError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> JbResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective data directory.
    pub fn effective_data_dir(&self) -> JbResult<PathBuf> {
        if self.storage.data_dir.is_empty() {
            Platform::data_dir()
        } else {
            Ok(PathBuf::from(&self.storage.data_dir))
        }
    }

    /// Get the effective metadata database path.
    pub fn effective_metadata_path(&self) -> JbResult<PathBuf> {
        if self.storage.metadata_path.is_empty() {
            Ok(self.effective_data_dir()?.join(METADATA_DB_FILE))
        } else {
            Ok(PathBuf::from(&self.storage.metadata_path))
        }
    }

    /// Get the effective blob database path.
    pub fn effective_blob_path(&self) -> JbResult<PathBuf> {
        if self.storage.blob_path.is_empty() {
            Ok(self.effective_data_dir()?.join(BLOB_DB_FILE))
        } else {
            Ok(PathBuf::from(&self.storage.blob_path))
        }
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> JbResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(self.effective_data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Get the effective recovery snapshot directory.
    pub fn effective_session_dir(&self) -> PathBuf {
        if self.recovery.session_dir.is_empty() {
            Platform::session_dir()
        } else {
            PathBuf::from(&self.recovery.session_dir)
        }
    }

    /// Get the effective backup export directory.
    pub fn effective_export_dir(&self) -> PathBuf {
        if self.backup.export_dir.is_empty() {
            Platform::documents_dir()
        } else {
            PathBuf::from(&self.backup.export_dir)
        }
    }

    /// Point every store path at a single directory. Used by tests and by
    /// the CLI `--data-dir` override.
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.storage.data_dir = dir.to_string_lossy().to_string();
        self.storage.metadata_path.clear();
        self.storage.blob_path.clear();
        self
    }
}
