//! Database schema definitions and table creation.
//!
//! The metadata and blob databases share one schema: a `documents` table
//! holding whole JSON documents by key, and a `blobs` table holding
//! attachment payloads by attachment id. Each store only touches its own
//! table.

use rusqlite::Connection;
use jb_core::error::{JbError, JbResult};
use tracing::debug;

/// Create all database tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> JbResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| JbError::Database(format!("failed to create schema: {e}")))?;
    debug!("database schema verified");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> JbResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS documents;
         DROP TABLE IF EXISTS blobs;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| JbError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- Whole JSON documents keyed by name
CREATE TABLE IF NOT EXISTS documents (
    key                             TEXT PRIMARY KEY NOT NULL,
    value                           TEXT NOT NULL,
    updated_at                      TEXT NOT NULL
);

-- Attachment payloads keyed by attachment id
CREATE TABLE IF NOT EXISTS blobs (
    id                              TEXT PRIMARY KEY NOT NULL,
    name                            TEXT NOT NULL,
    mime_type                       TEXT NOT NULL DEFAULT '',
    size                            INTEGER NOT NULL DEFAULT 0,
    payload                         BLOB NOT NULL,
    stored_at                       TEXT NOT NULL
);
"#;
