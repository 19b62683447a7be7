//! File attachment models.
//!
//! An attachment exists in two shapes. `FileMeta` is what contacts and the
//! metadata document reference: id, name, MIME type and size, never bytes.
//! `StoredFile` carries the payload as well and is what the blob store and
//! backup documents hold. `FileAttachment` is the union accepted on create
//! and update paths; `into_meta` is the projection applied before anything
//! reaches the metadata document.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use jb_core::error::{JbError, JbResult};

use crate::db::db_error;
use crate::ids::{deserialize_id, new_id, Id};

/// MIME type used when none is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Attachment reference without payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
}

impl FileMeta {
    /// Top-level MIME category ("image", "application", ...).
    pub fn mime_start(&self) -> Option<&str> {
        self.mime_type.split('/').next().filter(|s| !s.is_empty())
    }

    pub fn is_image(&self) -> bool {
        self.mime_start() == Some("image")
    }

    /// Human-readable file size string.
    pub fn human_file_size(&self) -> String {
        let bytes = self.size as f64;
        if bytes < 1024.0 {
            format!("{} B", self.size)
        } else if bytes < 1024.0 * 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else if bytes < 1024.0 * 1024.0 * 1024.0 {
            format!("{:.1} MB", bytes / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", bytes / (1024.0 * 1024.0 * 1024.0))
        }
    }

    /// Best-effort MIME type from a file name's extension.
    pub fn guess_mime(file_name: &str) -> &'static str {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "pdf" => "application/pdf",
            "txt" => "text/plain",
            "csv" => "text/csv",
            "json" => "application/json",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "zip" => "application/zip",
            _ => OCTET_STREAM,
        }
    }
}

/// Attachment with its payload bytes.
///
/// Serialized with the payload as a `dataUrl` (`data:<mime>;base64,...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredFileRepr", into = "StoredFileRepr")]
pub struct StoredFile {
    pub meta: FileMeta,
    pub payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredFileRepr {
    #[serde(deserialize_with = "deserialize_id")]
    id: Id,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    mime_type: String,
    #[serde(default)]
    size: Option<u64>,
    data_url: String,
}

impl TryFrom<StoredFileRepr> for StoredFile {
    type Error = JbError;

    fn try_from(repr: StoredFileRepr) -> JbResult<Self> {
        let (url_mime, payload) = decode_data_url(&repr.data_url)?;
        let mime_type = if repr.mime_type.is_empty() {
            url_mime.unwrap_or_default()
        } else {
            repr.mime_type
        };
        let size = repr.size.unwrap_or(payload.len() as u64);
        Ok(Self {
            meta: FileMeta {
                id: repr.id,
                name: repr.name,
                mime_type,
                size,
            },
            payload,
        })
    }
}

impl From<StoredFile> for StoredFileRepr {
    fn from(file: StoredFile) -> Self {
        let data_url = encode_data_url(&file.meta.mime_type, &file.payload);
        Self {
            id: file.meta.id,
            name: file.meta.name,
            mime_type: file.meta.mime_type,
            size: Some(file.meta.size),
            data_url,
        }
    }
}

/// Encode a payload as a base64 data URL.
pub fn encode_data_url(mime_type: &str, payload: &[u8]) -> String {
    let mime = if mime_type.is_empty() { OCTET_STREAM } else { mime_type };
    format!("data:{mime};base64,{}", STANDARD.encode(payload))
}

/// Decode a base64 data URL, or a bare base64 string.
///
/// Returns the MIME type named in the URL header, if any, with the bytes.
pub fn decode_data_url(value: &str) -> JbResult<(Option<String>, Vec<u8>)> {
    let value = value.trim();
    let (mime, encoded) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| JbError::InvalidFormat("data URL has no payload separator".into()))?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                JbError::InvalidFormat(format!("data URL is not base64 encoded: data:{header}"))
            })?;
            let mime = mime.split(';').next().unwrap_or_default();
            ((!mime.is_empty()).then(|| mime.to_string()), data)
        }
        None => (None, value),
    };
    let payload = STANDARD
        .decode(encoded)
        .map_err(|e| JbError::InvalidFormat(format!("invalid base64 payload: {e}")))?;
    Ok((mime, payload))
}

impl StoredFile {
    /// Create a new attachment with a fresh id. Size is the payload length.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            meta: FileMeta {
                id: new_id(),
                name: name.into(),
                mime_type: mime_type.into(),
                size: payload.len() as u64,
            },
            payload,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Construct a StoredFile from a `blobs` row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            meta: FileMeta {
                id: row.get("id")?,
                name: row.get("name")?,
                mime_type: row.get("mime_type")?,
                size: row.get::<_, i64>("size")?.max(0) as u64,
            },
            payload: row.get("payload")?,
        })
    }

    // ─── Blob table access ───────────────────────────────────────────────

    /// Upsert this file into the `blobs` table.
    pub fn save(&self, conn: &Connection) -> JbResult<()> {
        conn.execute(
            "INSERT INTO blobs (id, name, mime_type, size, payload, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                mime_type = excluded.mime_type,
                size = excluded.size,
                payload = excluded.payload,
                stored_at = excluded.stored_at",
            params![
                self.meta.id,
                self.meta.name,
                self.meta.mime_type,
                self.meta.size as i64,
                self.payload,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_error)?;
        Ok(())
    }

    /// Find a file by id.
    pub fn find_by_id(conn: &Connection, id: &str) -> JbResult<Option<Self>> {
        match conn.query_row("SELECT * FROM blobs WHERE id = ?1", [id], Self::from_row) {
            Ok(f) => Ok(Some(f)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_error(e)),
        }
    }

    /// Load every stored file, oldest first.
    pub fn load_all(conn: &Connection) -> JbResult<Vec<Self>> {
        let mut stmt = conn
            .prepare("SELECT * FROM blobs ORDER BY stored_at, id")
            .map_err(db_error)?;
        let files = stmt
            .query_map([], Self::from_row)
            .map_err(db_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        Ok(files)
    }

    /// Delete a file by id. Returns whether a row was removed.
    pub fn delete(conn: &Connection, id: &str) -> JbResult<bool> {
        let changed = conn
            .execute("DELETE FROM blobs WHERE id = ?1", [id])
            .map_err(db_error)?;
        Ok(changed > 0)
    }

    /// Remove every stored file.
    pub fn clear(conn: &Connection) -> JbResult<()> {
        conn.execute("DELETE FROM blobs", []).map_err(db_error)?;
        Ok(())
    }

    /// Entry count and total payload bytes.
    pub fn usage(conn: &Connection) -> JbResult<(u64, u64)> {
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(payload)), 0) FROM blobs",
            [],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
        )
        .map_err(db_error)
    }
}

/// An attachment as supplied by a caller: metadata only (already stored)
/// or with a payload still to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileAttachment {
    WithPayload(StoredFile),
    MetadataOnly(FileMeta),
}

impl FileAttachment {
    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn meta(&self) -> &FileMeta {
        match self {
            FileAttachment::WithPayload(file) => &file.meta,
            FileAttachment::MetadataOnly(meta) => meta,
        }
    }

    /// The payload-bearing file, if this attachment still carries bytes.
    pub fn payload(&self) -> Option<&StoredFile> {
        match self {
            FileAttachment::WithPayload(file) => Some(file),
            FileAttachment::MetadataOnly(_) => None,
        }
    }

    /// Drop the payload, keeping only the reference.
    pub fn into_meta(self) -> FileMeta {
        match self {
            FileAttachment::WithPayload(file) => file.meta,
            FileAttachment::MetadataOnly(meta) => meta,
        }
    }
}

impl From<StoredFile> for FileAttachment {
    fn from(file: StoredFile) -> Self {
        FileAttachment::WithPayload(file)
    }
}

impl From<FileMeta> for FileAttachment {
    fn from(meta: FileMeta) -> Self {
        FileAttachment::MetadataOnly(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn blob_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_stored_file_serializes_data_url() {
        let file = StoredFile::new("hello.txt", "text/plain", b"hello".to_vec());
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["dataUrl"], "data:text/plain;base64,aGVsbG8=");
        assert_eq!(json["type"], "text/plain");
        assert_eq!(json["size"], 5);
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_stored_file_accepts_plain_base64() {
        let json = r#"{"id": "f1", "name": "a.bin", "type": "", "dataUrl": "AAEC"}"#;
        let file: StoredFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.payload, vec![0, 1, 2]);
        assert_eq!(file.meta.size, 3);
    }

    #[test]
    fn test_mime_taken_from_data_url_when_missing() {
        let json = r#"{"id": "f1", "name": "p.png", "dataUrl": "data:image/png;base64,AAEC"}"#;
        let file: StoredFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.meta.mime_type, "image/png");
        assert!(file.meta.is_image());
    }

    #[test]
    fn test_non_base64_data_url_rejected() {
        let json = r#"{"id": "f1", "name": "a.txt", "dataUrl": "data:text/plain,hello"}"#;
        assert!(serde_json::from_str::<StoredFile>(json).is_err());
    }

    #[test]
    fn test_untagged_attachment_picks_shape() {
        let with: FileAttachment = serde_json::from_str(
            r#"{"id": "a", "name": "a.txt", "type": "text/plain", "size": 1, "dataUrl": "data:text/plain;base64,YQ=="}"#,
        )
        .unwrap();
        assert!(with.payload().is_some());

        let without: FileAttachment =
            serde_json::from_str(r#"{"id": "b", "name": "b.txt", "type": "text/plain", "size": 1}"#).unwrap();
        assert!(without.payload().is_none());
        assert_eq!(without.into_meta().id, "b");
    }

    #[test]
    fn test_blob_table_roundtrip() {
        let conn = blob_conn();
        let file = StoredFile::new("a.pdf", "application/pdf", vec![1, 2, 3, 4]);
        file.save(&conn).unwrap();

        let loaded = StoredFile::find_by_id(&conn, file.id()).unwrap().unwrap();
        assert_eq!(loaded, file);
        assert_eq!(StoredFile::usage(&conn).unwrap(), (1, 4));

        assert!(StoredFile::delete(&conn, file.id()).unwrap());
        assert!(!StoredFile::delete(&conn, file.id()).unwrap());
        assert!(StoredFile::find_by_id(&conn, file.id()).unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_same_id() {
        let conn = blob_conn();
        let mut file = StoredFile::new("a.txt", "text/plain", b"one".to_vec());
        file.save(&conn).unwrap();
        file.payload = b"three".to_vec();
        file.meta.size = 5;
        file.save(&conn).unwrap();

        let all = StoredFile::load_all(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payload, b"three");
    }

    #[test]
    fn test_human_file_size() {
        let meta = FileMeta {
            id: "x".into(),
            name: "x".into(),
            mime_type: String::new(),
            size: 2048,
        };
        assert_eq!(meta.human_file_size(), "2.0 KB");
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(FileMeta::guess_mime("Invoice.PDF"), "application/pdf");
        assert_eq!(FileMeta::guess_mime("noext"), OCTET_STREAM);
    }
}
