//! Whole-document persistence of `AppState`.
//!
//! The state is written as one JSON document under a fixed key, replacing
//! the previous one. The type system keeps payloads out: contacts only hold
//! `FileMeta`. A write refused for lack of space is reported as
//! `StorageQuotaExceeded`, distinct from other failures.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use jb_core::config::AppConfig;
use jb_core::constants::METADATA_DOCUMENT_KEY;
use jb_core::error::{JbError, JbResult};
use jb_models::{AppState, Database, Document};

/// Synchronous store for the application state document.
pub trait MetadataStore: Send + Sync {
    /// Serialize and write the whole state, overwriting the previous one.
    fn save(&self, state: &AppState) -> JbResult<()>;

    /// The stored state, or `None` if absent or unparsable.
    fn load(&self) -> JbResult<Option<AppState>>;

    /// Size of the stored document in bytes (0 when absent).
    fn stored_bytes(&self) -> JbResult<u64>;
}

impl<T: MetadataStore + ?Sized> MetadataStore for Arc<T> {
    fn save(&self, state: &AppState) -> JbResult<()> {
        (**self).save(state)
    }

    fn load(&self) -> JbResult<Option<AppState>> {
        (**self).load()
    }

    fn stored_bytes(&self) -> JbResult<u64> {
        (**self).stored_bytes()
    }
}

/// Parse a stored document, treating garbage as absent.
fn parse_document(raw: &str) -> Option<AppState> {
    match serde_json::from_str(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("stored state document is unreadable, ignoring it: {e}");
            None
        }
    }
}

/// Metadata store backed by a SQLite `documents` table.
pub struct SqliteMetadataStore {
    db: Database,
}

impl SqliteMetadataStore {
    /// Open the store at `path`, capped at `storage.metadata_quota_bytes`.
    pub fn open(path: &Path, config: &AppConfig) -> JbResult<Self> {
        let db = Database::init_with_quota(path, &config.storage, config.storage.metadata_quota_bytes)
            .map_err(|e| match e {
                JbError::IntegrityCheck(_) => e,
                other => JbError::StoreUnavailable(format!(
                    "metadata store at {}: {other}",
                    path.display()
                )),
            })?;
        Ok(Self { db })
    }

    /// Open the store at the configured metadata path.
    pub fn from_config(config: &AppConfig) -> JbResult<Self> {
        Self::open(&config.effective_metadata_path()?, config)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn save(&self, state: &AppState) -> JbResult<()> {
        let json = serde_json::to_string(state)?;
        self.db
            .transaction(|conn| Document::put(conn, METADATA_DOCUMENT_KEY, &json))?;
        debug!("saved state document ({} bytes)", json.len());
        Ok(())
    }

    fn load(&self) -> JbResult<Option<AppState>> {
        let conn = self.db.conn()?;
        Ok(Document::get(&conn, METADATA_DOCUMENT_KEY)?.and_then(|raw| parse_document(&raw)))
    }

    fn stored_bytes(&self) -> JbResult<u64> {
        let conn = self.db.conn()?;
        Ok(Document::size(&conn, METADATA_DOCUMENT_KEY)?.unwrap_or(0))
    }
}

/// Metadata store held in memory, with an optional size quota.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    document: Mutex<Option<String>>,
    quota_bytes: Option<u64>,
    saves: AtomicUsize,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents larger than `bytes`.
    pub fn with_quota(bytes: u64) -> Self {
        Self {
            quota_bytes: Some(bytes),
            ..Self::default()
        }
    }

    /// Start with a raw stored document.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// The raw stored document.
    pub fn raw(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn save(&self, state: &AppState) -> JbResult<()> {
        let json = serde_json::to_string(state)?;
        if let Some(quota) = self.quota_bytes {
            if json.len() as u64 > quota {
                return Err(JbError::StorageQuotaExceeded(format!(
                    "document of {} bytes exceeds quota of {quota} bytes",
                    json.len()
                )));
            }
        }
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> JbResult<Option<AppState>> {
        Ok(self.raw().and_then(|raw| parse_document(&raw)))
    }

    fn stored_bytes(&self) -> JbResult<u64> {
        Ok(self.raw().map(|raw| raw.len() as u64).unwrap_or(0))
    }
}
