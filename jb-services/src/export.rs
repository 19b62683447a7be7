//! Destinations for exported backups.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use tracing::info;

use jb_core::constants::BACKUP_FILE_PREFIX;
use jb_core::error::JbResult;

/// File name for a backup taken on `date`: `jobbook-backup-YYYY-MM-DD.json`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("{BACKUP_FILE_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}

/// Receives an exported backup.
pub trait ExportSink: Send + Sync {
    fn save(&self, file_name: &str, bytes: &[u8]) -> JbResult<()>;
}

/// Writes exports into a directory (write to .tmp, fsync, rename).
#[derive(Debug, Clone)]
pub struct DirectoryExportSink {
    dir: PathBuf,
}

impl DirectoryExportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a file with this name lands.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl ExportSink for DirectoryExportSink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> JbResult<()> {
        fs::create_dir_all(&self.dir)?;

        let final_path = self.path_for(file_name);
        let tmp_path = self.dir.join(format!("{file_name}.tmp"));

        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &final_path)?;
        info!("backup written to {}", final_path.display());
        Ok(())
    }
}

/// Keeps exports in memory.
#[derive(Debug, Default)]
pub struct MemoryExportSink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryExportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent export, if any.
    pub fn last(&self) -> Option<(String, Vec<u8>)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.saved.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExportSink for MemoryExportSink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> JbResult<()> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}
