//! JobBook Services - persistence, recovery and the collaborators around them.
//!
//! This crate provides:
//! - The blob store (async, attachment payloads) and its SQLite and
//!   in-memory implementations
//! - The metadata store (sync, the whole `AppState` document)
//! - The session-scoped recovery snapshot store
//! - Collaborator seams: confirmation prompts, user notices, export sinks
//! - The event bus for observable side effects
//! - The persistence coordinator that owns application state and drives
//!   every mutation, backup, restore and recovery

pub mod service;
pub mod event_bus;
pub mod notification;
pub mod prompt;
pub mod export;
pub mod blob_store;
pub mod metadata_store;
pub mod recovery;
pub mod coordinator;

// Re-export key types
pub use service::{Service, ServiceState};
pub use event_bus::{AppEvent, EventBus};
pub use notification::{DesktopNotifier, LogNotifier, Notice, NoticeLevel, Notifier, RecordingNotifier};
pub use prompt::{AutoConfirm, Prompter, ScriptedPrompter};
pub use export::{backup_file_name, DirectoryExportSink, ExportSink, MemoryExportSink};
pub use blob_store::{BlobStore, BlobUsage, InMemoryBlobStore, SqliteBlobStore};
pub use metadata_store::{InMemoryMetadataStore, MetadataStore, SqliteMetadataStore};
pub use recovery::{InMemoryRecoveryStore, RecoverySnapshot, RecoveryStore, SessionRecoveryStore};
pub use coordinator::{
    ExportSummary, PersistenceCoordinator, RestoreOutcome, StartupOutcome, StorageUsage, Stores,
    ViewFocus,
};
