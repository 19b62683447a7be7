//! Versioned database migrations.
//!
//! Migrations run sequentially from the stored version up to
//! `DB_SCHEMA_VERSION`. Each migration is an idempotent SQL script.

use rusqlite::Connection;
use tracing::{debug, info, warn};
use jb_core::constants::DB_SCHEMA_VERSION;
use jb_core::error::{JbError, JbResult};

/// Run all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> JbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= DB_SCHEMA_VERSION {
        debug!("database schema is up to date (version {current_version})");
        return Ok(());
    }

    info!("running migrations from version {current_version} to {DB_SCHEMA_VERSION}");

    for version in (current_version + 1)..=DB_SCHEMA_VERSION {
        run_migration(conn, version)?;
    }

    set_schema_version(conn, DB_SCHEMA_VERSION)?;
    info!("migrations complete, schema at version {DB_SCHEMA_VERSION}");
    Ok(())
}

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> JbResult<i32> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| JbError::Migration(e.to_string()))?;

    if count == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .map_err(|e| JbError::Migration(e.to_string()))?;
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
        row.get(0)
    })
    .map_err(|e| JbError::Migration(e.to_string()))
}

fn set_schema_version(conn: &Connection, version: i32) -> JbResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(|e| JbError::Migration(e.to_string()))?;
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> JbResult<()> {
    info!("applying migration version {version}");

    match version {
        1 => migration_v1(conn),
        _ => {
            warn!("unknown migration version {version}, skipping");
            Ok(())
        }
    }
}

/// Migration v1: tables come from `schema::create_tables`; this adds the
/// index used to list blobs in insertion order.
fn migration_v1(conn: &Connection) -> JbResult<()> {
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_blobs_stored_at ON blobs(stored_at);")
        .map_err(|e| JbError::Migration(e.to_string()))
}
