//! Keyed storage for attachment payloads.
//!
//! Payloads live apart from the metadata document so large files never
//! bloat it. All operations are async; SQLite work runs on the blocking
//! pool. Missing ids on `get` and `delete` are not errors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use jb_core::config::{AppConfig, StorageConfig};
use jb_core::error::{JbError, JbResult};
use jb_models::{Database, Id, StoredFile};

/// Entry count and total payload size of a blob store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobUsage {
    pub count: u64,
    pub bytes: u64,
}

/// Async keyed storage for attachment payloads.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Upsert each file by id.
    async fn put(&self, files: &[StoredFile]) -> JbResult<()>;

    /// Files for the ids that exist, in request order. Missing ids are omitted.
    async fn get(&self, ids: &[Id]) -> JbResult<Vec<StoredFile>>;

    /// Remove the given ids. Missing ids are ignored.
    async fn delete(&self, ids: &[Id]) -> JbResult<()>;

    /// Every stored file.
    async fn get_all(&self) -> JbResult<Vec<StoredFile>>;

    /// Replace the whole store with `files`. Readers observe either the old
    /// set or the new one, never a mix.
    async fn replace_all(&self, files: &[StoredFile]) -> JbResult<()>;

    async fn usage(&self) -> JbResult<BlobUsage>;
}

// ─── SQLite ──────────────────────────────────────────────────────────────────

/// Blob store backed by its own SQLite file.
///
/// The database is opened on first use. Concurrent first callers share a
/// single open; a failed open leaves the store closed so the next call
/// tries again.
pub struct SqliteBlobStore {
    path: PathBuf,
    config: StorageConfig,
    db: OnceCell<Database>,
    opens: AtomicUsize,
}

impl SqliteBlobStore {
    /// Create a store for the database at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>, config: StorageConfig) -> Self {
        Self {
            path: path.into(),
            config,
            db: OnceCell::new(),
            opens: AtomicUsize::new(0),
        }
    }

    /// Create a store at the configured blob path.
    pub fn from_config(config: &AppConfig) -> JbResult<Self> {
        Ok(Self::new(config.effective_blob_path()?, config.storage.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the database has been opened.
    pub fn is_open(&self) -> bool {
        self.db.initialized()
    }

    /// How many times an open has been attempted.
    pub fn open_attempts(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    async fn db(&self) -> JbResult<&Database> {
        self.db
            .get_or_try_init(|| async {
                self.opens.fetch_add(1, Ordering::SeqCst);
                let path = self.path.clone();
                let config = self.config.clone();
                let shown = path.display().to_string();
                let db = tokio::task::spawn_blocking(move || Database::init(&path, &config))
                    .await
                    .map_err(|e| JbError::Internal(format!("blob store open task failed: {e}")))?
                    .map_err(|e| {
                        warn!("blob store at {shown} could not be opened: {e}");
                        JbError::StoreUnavailable(format!("blob store at {shown}: {e}"))
                    })?;
                info!("blob store opened at {shown}");
                Ok(db)
            })
            .await
    }

    /// Run `f` against the database on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> JbResult<T>
    where
        F: FnOnce(&Database) -> JbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db().await?.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| JbError::Internal(format!("blob store task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, files: &[StoredFile]) -> JbResult<()> {
        if files.is_empty() {
            return Ok(());
        }
        let files = files.to_vec();
        let count = files.len();
        self.with_db(move |db| {
            db.transaction(|conn| {
                for file in &files {
                    file.save(conn)?;
                }
                Ok(())
            })
        })
        .await?;
        debug!("stored {count} blob(s)");
        Ok(())
    }

    async fn get(&self, ids: &[Id]) -> JbResult<Vec<StoredFile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        self.with_db(move |db| {
            let conn = db.conn()?;
            let mut found = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(file) = StoredFile::find_by_id(&conn, id)? {
                    found.push(file);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn delete(&self, ids: &[Id]) -> JbResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        let removed = self
            .with_db(move |db| {
                db.transaction(|conn| {
                    let mut removed = 0;
                    for id in &ids {
                        if StoredFile::delete(conn, id)? {
                            removed += 1;
                        }
                    }
                    Ok(removed)
                })
            })
            .await?;
        debug!("deleted {removed} blob(s)");
        Ok(())
    }

    async fn get_all(&self) -> JbResult<Vec<StoredFile>> {
        self.with_db(|db| {
            let conn = db.conn()?;
            StoredFile::load_all(&conn)
        })
        .await
    }

    async fn replace_all(&self, files: &[StoredFile]) -> JbResult<()> {
        let files = files.to_vec();
        let count = files.len();
        self.with_db(move |db| {
            db.transaction(|conn| {
                StoredFile::clear(conn)?;
                for file in &files {
                    file.save(conn)?;
                }
                Ok(())
            })
        })
        .await?;
        info!("blob store replaced with {count} file(s)");
        Ok(())
    }

    async fn usage(&self) -> JbResult<BlobUsage> {
        let (count, bytes) = self
            .with_db(|db| {
                let conn = db.conn()?;
                StoredFile::usage(&conn)
            })
            .await?;
        Ok(BlobUsage { count, bytes })
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

/// Blob store held in memory. Used for ephemeral runs and tests.
///
/// Each operation can be made to fail once, to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    files: RwLock<BTreeMap<Id, StoredFile>>,
    fail_next_put: AtomicBool,
    fail_next_delete: AtomicBool,
    fail_next_replace: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `put` fail without storing anything.
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Make the next `delete` fail without removing anything.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    /// Make the next `replace_all` fail, leaving the old set in place.
    pub fn fail_next_replace(&self) {
        self.fail_next_replace.store(true, Ordering::SeqCst);
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.files.read().await.contains_key(id)
    }

    pub async fn ids(&self) -> Vec<Id> {
        self.files.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    fn injected(flag: &AtomicBool, op: &str) -> JbResult<()> {
        if flag.swap(false, Ordering::SeqCst) {
            return Err(JbError::Database(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, files: &[StoredFile]) -> JbResult<()> {
        Self::injected(&self.fail_next_put, "put")?;
        let mut map = self.files.write().await;
        for file in files {
            map.insert(file.meta.id.clone(), file.clone());
        }
        Ok(())
    }

    async fn get(&self, ids: &[Id]) -> JbResult<Vec<StoredFile>> {
        let map = self.files.read().await;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn delete(&self, ids: &[Id]) -> JbResult<()> {
        Self::injected(&self.fail_next_delete, "delete")?;
        let mut map = self.files.write().await;
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    async fn get_all(&self) -> JbResult<Vec<StoredFile>> {
        Ok(self.files.read().await.values().cloned().collect())
    }

    async fn replace_all(&self, files: &[StoredFile]) -> JbResult<()> {
        Self::injected(&self.fail_next_replace, "replace")?;
        let next: BTreeMap<Id, StoredFile> = files
            .iter()
            .map(|f| (f.meta.id.clone(), f.clone()))
            .collect();
        *self.files.write().await = next;
        Ok(())
    }

    async fn usage(&self) -> JbResult<BlobUsage> {
        let map = self.files.read().await;
        Ok(BlobUsage {
            count: map.len() as u64,
            bytes: map.values().map(|f| f.payload.len() as u64).sum(),
        })
    }
}
