//! Global error types for the JobBook application.
//!
//! All error categories across the application are unified into a single
//! `JbError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using JbError.
pub type JbResult<T> = Result<T, JbError>;

/// Unified error type covering all error categories in JobBook.
#[derive(Error, Debug)]
pub enum JbError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Database errors --
    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Persistence errors --
    /// Durable storage is full; the write was rejected.
    #[error("storage quota exceeded: {0}")]
    StorageQuotaExceeded(String),

    /// A backing store could not be opened or initialized.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A blob put/delete failed part way through a batch.
    #[error("blob operation failed: {0}")]
    PartialBlobFailure(String),

    /// Recovery snapshot could not be written or cleared.
    #[error("recovery snapshot error: {0}")]
    Recovery(String),

    /// A recovery candidate must be accepted or dismissed before the state
    /// can change.
    #[error("recovery pending: {0}")]
    RecoveryPending(String),

    // -- Restore / import errors --
    /// Payload is well-formed but does not have the expected shape.
    #[error("invalid backup format: {0}")]
    InvalidFormat(String),

    /// Payload is not well-formed serialized data.
    #[error("failed to parse backup: {0}")]
    ParseFailure(String),

    // -- Domain errors --
    /// Contact not found.
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    /// Attachment not found on a contact.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Input rejected because it would break a data invariant.
    #[error("validation error: {0}")]
    Validation(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Notification errors --
    /// Desktop notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JbError {
    /// Whether this error means durable storage ran out of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, JbError::StorageQuotaExceeded(_))
    }
}

impl From<serde_json::Error> for JbError {
    fn from(e: serde_json::Error) -> Self {
        JbError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for JbError {
    fn from(e: toml::de::Error) -> Self {
        JbError::Config(e.to_string())
    }
}
