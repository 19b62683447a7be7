//! Session-scoped recovery snapshot.
//!
//! When auto-backup is on, every persist also writes the full state with
//! attachment payloads here. The file lives in the login session's runtime
//! directory, so it survives an application crash but not a logout or a
//! reboot. At startup, a snapshot found while the metadata store is empty
//! is offered to the user instead of being applied.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use jb_core::config::AppConfig;
use jb_core::constants::RECOVERY_FILE_NAME;
use jb_core::error::{JbError, JbResult};
use jb_models::BackupDocument;

/// The most recent automatic backup. `data` is a serialized
/// `BackupDocument` including payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySnapshot {
    pub timestamp: DateTime<Utc>,
    pub data: String,
}

impl RecoverySnapshot {
    pub fn new(data: String) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
        }
    }

    /// Parse the carried backup document.
    pub fn document(&self) -> JbResult<BackupDocument> {
        BackupDocument::parse(&self.data)
    }
}

/// Storage for the single current recovery snapshot.
pub trait RecoveryStore: Send + Sync {
    /// Replace the stored snapshot.
    fn save(&self, snapshot: &RecoverySnapshot) -> JbResult<()>;

    /// The stored snapshot. Unreadable snapshots count as absent.
    fn load(&self) -> Option<RecoverySnapshot>;

    /// Remove the stored snapshot. Clearing an empty store succeeds.
    fn clear(&self) -> JbResult<()>;
}

impl<T: RecoveryStore + ?Sized> RecoveryStore for Arc<T> {
    fn save(&self, snapshot: &RecoverySnapshot) -> JbResult<()> {
        (**self).save(snapshot)
    }

    fn load(&self) -> Option<RecoverySnapshot> {
        (**self).load()
    }

    fn clear(&self) -> JbResult<()> {
        (**self).clear()
    }
}

/// Recovery snapshot kept as a JSON file in the session directory.
#[derive(Debug, Clone)]
pub struct SessionRecoveryStore {
    dir: PathBuf,
}

impl SessionRecoveryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the configured (or platform) session directory.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.effective_session_dir())
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(RECOVERY_FILE_NAME)
    }

    fn write_atomic(&self, json: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.dir.join(format!("{RECOVERY_FILE_NAME}.tmp"));
        let mut file = File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, self.path())
    }

    fn read(path: &Path) -> Option<RecoverySnapshot> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("could not read recovery snapshot {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("recovery snapshot {} is unreadable, ignoring it: {e}", path.display());
                None
            }
        }
    }
}

impl RecoveryStore for SessionRecoveryStore {
    fn save(&self, snapshot: &RecoverySnapshot) -> JbResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.write_atomic(&json).map_err(|e| {
            warn!("failed to write recovery snapshot to {}: {e}", self.dir.display());
            JbError::Recovery(format!("write {}: {e}", self.path().display()))
        })?;
        debug!("recovery snapshot saved ({} bytes)", json.len());
        Ok(())
    }

    fn load(&self) -> Option<RecoverySnapshot> {
        Self::read(&self.path())
    }

    fn clear(&self) -> JbResult<()> {
        match fs::remove_file(self.path()) {
            Ok(()) => {
                info!("recovery snapshot cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("failed to clear recovery snapshot: {e}");
                Err(JbError::Recovery(format!("remove {}: {e}", self.path().display())))
            }
        }
    }
}

/// Recovery store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRecoveryStore {
    slot: Mutex<Option<RecoverySnapshot>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a snapshot already present.
    pub fn with_snapshot(snapshot: RecoverySnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every save fail until turned off.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl RecoveryStore for InMemoryRecoveryStore {
    fn save(&self, snapshot: &RecoverySnapshot) -> JbResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(JbError::Recovery("injected save failure".into()));
        }
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Option<RecoverySnapshot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn clear(&self) -> JbResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SessionRecoveryStore::new(dir.path().join("session"));
        assert!(store.load().is_none());

        let snapshot = RecoverySnapshot::new(r#"{"contacts":[]}"#.into());
        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), Some(snapshot));
        assert!(!dir.path().join("session/recovery.json.tmp").exists());

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_session_store_ignores_garbage() {
        let dir = TempDir::new().unwrap();
        let store = SessionRecoveryStore::new(dir.path());
        fs::write(store.path(), "not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_session_store_save_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let store = SessionRecoveryStore::new(blocker.join("session"));
        let err = store.save(&RecoverySnapshot::new("{}".into())).unwrap_err();
        assert!(matches!(err, JbError::Recovery(_)));
    }

    #[test]
    fn test_timestamp_is_iso8601() {
        let snapshot = RecoverySnapshot::new("{}".into());
        let json = serde_json::to_value(&snapshot).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_snapshot_document() {
        let snapshot = RecoverySnapshot::new(r#"{"contacts":[]}"#.into());
        assert!(snapshot.document().unwrap().contacts.is_empty());
        let bad = RecoverySnapshot::new("{}".into());
        assert!(matches!(bad.document(), Err(JbError::InvalidFormat(_))));
    }

    #[test]
    fn test_memory_store() {
        let store = InMemoryRecoveryStore::new();
        store.save(&RecoverySnapshot::new("{}".into())).unwrap();
        assert_eq!(store.save_count(), 1);
        store.set_fail_saves(true);
        assert!(store.save(&RecoverySnapshot::new("{}".into())).is_err());
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
