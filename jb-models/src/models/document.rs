//! Whole-document key-value table.
//!
//! Each row holds one serialized JSON document under a fixed key. Writes
//! overwrite the previous value.

use chrono::Utc;
use rusqlite::{params, Connection};

use jb_core::error::JbResult;

use crate::db::db_error;

/// Key-value access to the `documents` table.
pub struct Document;

impl Document {
    /// Get the stored value for a key.
    pub fn get(conn: &Connection, key: &str) -> JbResult<Option<String>> {
        match conn.query_row(
            "SELECT value FROM documents WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error(e)),
        }
    }

    /// Store a value under a key (upsert).
    pub fn put(conn: &Connection, key: &str, value: &str) -> JbResult<()> {
        conn.execute(
            "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(db_error)?;
        Ok(())
    }

    /// Delete a document by key.
    pub fn delete(conn: &Connection, key: &str) -> JbResult<bool> {
        let changed = conn
            .execute("DELETE FROM documents WHERE key = ?1", [key])
            .map_err(db_error)?;
        Ok(changed > 0)
    }

    /// Byte length of the stored value, if present.
    pub fn size(conn: &Connection, key: &str) -> JbResult<Option<u64>> {
        match conn.query_row(
            "SELECT LENGTH(CAST(value AS BLOB)) FROM documents WHERE key = ?1",
            [key],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(len) => Ok(Some(len.max(0) as u64)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error(e)),
        }
    }

    /// When the document was last written (RFC 3339).
    pub fn updated_at(conn: &Connection, key: &str) -> JbResult<Option<String>> {
        match conn.query_row(
            "SELECT updated_at FROM documents WHERE key = ?1",
            [key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_put_get_overwrite() {
        let conn = conn();
        assert_eq!(Document::get(&conn, "state").unwrap(), None);

        Document::put(&conn, "state", "{\"a\":1}").unwrap();
        Document::put(&conn, "state", "{\"a\":2}").unwrap();
        assert_eq!(Document::get(&conn, "state").unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(Document::updated_at(&conn, "state").unwrap().is_some());
    }

    #[test]
    fn test_size_counts_bytes() {
        let conn = conn();
        Document::put(&conn, "state", "héllo").unwrap();
        assert_eq!(Document::size(&conn, "state").unwrap(), Some(6));
        assert_eq!(Document::size(&conn, "missing").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let conn = conn();
        Document::put(&conn, "k", "v").unwrap();
        assert!(Document::delete(&conn, "k").unwrap());
        assert!(!Document::delete(&conn, "k").unwrap());
    }
}
