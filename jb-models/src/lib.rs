//! JobBook Models - data model, SQLite database wrapper, schema and migrations.
//!
//! This crate owns the shape of everything JobBook persists: contacts with
//! their custom fields, job tickets and attachment references, the business
//! settings, the aggregate `AppState` document and the backup document that
//! carries attachment payloads alongside metadata. It also owns the SQLite
//! plumbing (pooling, pragmas, schema, versioned migrations) shared by the
//! metadata and blob stores.

pub mod db;
pub mod ids;
pub mod schema;
pub mod models;
pub mod migrations;

// Re-export key types
pub use db::{Database, DbPool, DatabaseStats};
pub use ids::{new_id, Id};
pub use models::app_state::{AppState, AutoBackupStamp, BackupDocument};
pub use models::attachment::{FileAttachment, FileMeta, StoredFile};
pub use models::contact::{Contact, ContactDraft, CustomField};
pub use models::document::Document;
pub use models::job_ticket::{InvoiceTotals, JobTicket, Part, TicketStatus};
pub use models::settings::{BusinessInfo, DefaultFieldSetting};
