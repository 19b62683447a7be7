//! Database initialization, connection pooling, and lifecycle management.
//!
//! Both JobBook stores (metadata and blobs) are SQLite files opened through
//! this wrapper: WAL mode, an r2d2 pool, an optional startup integrity
//! check, schema creation and versioned migrations. A store that must stay
//! under a size quota passes `max_bytes`; the cap is enforced by SQLite
//! through `PRAGMA max_page_count` and surfaces as `SQLITE_FULL`.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode};
use tracing::{debug, error, info, warn};

use jb_core::config::StorageConfig;
use jb_core::error::{JbError, JbResult};

use crate::migrations;
use crate::schema;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` with no size cap.
    pub fn init(db_path: &Path, config: &StorageConfig) -> JbResult<Self> {
        Self::init_with_quota(db_path, config, 0)
    }

    /// Open the database at `db_path`, capping its size at `max_bytes`
    /// (zero means unlimited).
    ///
    /// This:
    /// 1. Creates the database file and parent directories if needed
    /// 2. Applies WAL mode and the size cap on every pooled connection
    /// 3. Runs an integrity check if configured
    /// 4. Creates the schema tables and runs pending migrations
    pub fn init_with_quota(db_path: &Path, config: &StorageConfig, max_bytes: u64) -> JbResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("opening database at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
                max_bytes,
            }))
            .build(manager)
            .map_err(|e| JbError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let conn = db.conn()?;
            schema::create_tables(&conn)?;
            migrations::run_migrations(&conn)?;
        }

        debug!("database ready at {}", db_path.display());
        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> JbResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| JbError::Pool(e.to_string()))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> JbResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(db_error)?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(JbError::IntegrityCheck(result));
        }

        debug!("database integrity check passed");
        Ok(())
    }

    /// Execute a function within a database transaction.
    ///
    /// The transaction commits only if `f` succeeds; otherwise it is rolled
    /// back when dropped.
    pub fn transaction<T, F>(&self, f: F) -> JbResult<T>
    where
        F: FnOnce(&Connection) -> JbResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;

        let result = f(&tx)?;

        tx.commit().map_err(db_error)?;

        Ok(result)
    }

    /// Get database statistics.
    pub fn stats(&self) -> JbResult<DatabaseStats> {
        let conn = self.conn()?;

        let count = |table: &str| -> JbResult<i64> {
            let sql = format!("SELECT COUNT(*) FROM {table}");
            conn.query_row(&sql, [], |row| row.get(0)).map_err(db_error)
        };
        let pragma = |name: &str| -> JbResult<i64> {
            conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
                .map_err(db_error)
        };

        Ok(DatabaseStats {
            documents: count("documents").unwrap_or(0),
            blobs: count("blobs").unwrap_or(0),
            page_count: pragma("page_count")?,
            page_size: pragma("page_size")?,
        })
    }

    /// Reset the database by dropping and recreating all tables.
    pub fn reset(&self) -> JbResult<()> {
        warn!("resetting database - all data will be lost");
        let conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&conn)?;
        info!("database reset complete");
        Ok(())
    }
}

/// Map a rusqlite error to `JbError`, keeping "database is full" distinct.
pub fn db_error(e: rusqlite::Error) -> JbError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DiskFull) => JbError::StorageQuotaExceeded(e.to_string()),
        _ => JbError::Database(e.to_string()),
    }
}

/// Database row and size statistics.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub documents: i64,
    pub blobs: i64,
    pub page_count: i64,
    pub page_size: i64,
}

impl DatabaseStats {
    /// Size of the main database file in bytes.
    pub fn size_bytes(&self) -> u64 {
        (self.page_count.max(0) as u64) * (self.page_size.max(0) as u64)
    }
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "documents={}, blobs={}, size={} bytes",
            self.documents,
            self.blobs,
            self.size_bytes()
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
    max_bytes: u64,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        if self.max_bytes > 0 {
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
            let max_pages = (self.max_bytes / page_size.max(1) as u64).max(1);
            // max_page_count is per connection and never drops below the current size
            conn.query_row(
                &format!("PRAGMA max_page_count={max_pages}"),
                [],
                |row| row.get::<_, i64>(0),
            )?;
        }

        Ok(())
    }
}
