//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "JobBook";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database schema version.
pub const DB_SCHEMA_VERSION: i32 = 1;

/// Key under which the metadata document is stored.
pub const METADATA_DOCUMENT_KEY: &str = "jobbook.state";

/// File name of the session-scoped recovery snapshot.
pub const RECOVERY_FILE_NAME: &str = "recovery.json";

/// Default metadata database file name.
pub const METADATA_DB_FILE: &str = "metadata.db";

/// Default blob database file name.
pub const BLOB_DB_FILE: &str = "blobs.db";

/// Default event bus channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Prefix of exported backup file names.
pub const BACKUP_FILE_PREFIX: &str = "jobbook-backup";

/// Labels offered as default custom fields on first run.
pub const DEFAULT_FIELD_LABELS: &[&str] = &["Company", "Job Title", "Website"];

/// Job ticket status display strings, in workflow order.
pub mod ticket_status {
    pub const ESTIMATE_SCHEDULED: &str = "Estimate Scheduled";
    pub const QUOTE_SENT: &str = "Quote Sent";
    pub const SCHEDULED: &str = "Scheduled";
    pub const IN_PROGRESS: &str = "In Progress";
    pub const AWAITING_PARTS: &str = "Awaiting Parts";
    pub const COMPLETED: &str = "Completed";
    pub const PAID: &str = "Paid";
    pub const DECLINED: &str = "Declined";

    /// All statuses in workflow order.
    pub const ALL: &[&str] = &[
        ESTIMATE_SCHEDULED,
        QUOTE_SENT,
        SCHEDULED,
        IN_PROGRESS,
        AWAITING_PARTS,
        COMPLETED,
        PAID,
        DECLINED,
    ];
}
