//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use jb_core::config::AppConfig;
use jb_models::{ContactDraft, FileAttachment, FileMeta, Id, StoredFile};
use jb_services::blob_store::InMemoryBlobStore;
use jb_services::coordinator::{PersistenceCoordinator, Stores};
use jb_services::event_bus::{AppEvent, EventBus};
use jb_services::metadata_store::InMemoryMetadataStore;
use jb_services::notification::RecordingNotifier;
use jb_services::prompt::ScriptedPrompter;
use jb_services::recovery::{InMemoryRecoveryStore, RecoverySnapshot};
use tempfile::TempDir;
use tokio::sync::broadcast::Receiver;

/// Create a configuration whose stores all live in a fresh temp directory.
/// Returns the config and the TempDir (must be held alive for the test).
pub fn create_test_config() -> (AppConfig, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut config = AppConfig::default().with_data_dir(dir.path());
    config.recovery.session_dir = dir.path().join("session").to_string_lossy().to_string();
    config.backup.export_dir = dir.path().join("exports").to_string_lossy().to_string();
    (config, dir)
}

/// Create an EventBus with a small buffer suitable for tests.
pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

/// A coordinator over in-memory stores, with every collaborator kept
/// reachable for assertions.
pub struct Harness {
    pub coordinator: PersistenceCoordinator,
    pub blobs: Arc<InMemoryBlobStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub recovery: Arc<InMemoryRecoveryStore>,
    pub prompter: Arc<ScriptedPrompter>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: Receiver<AppEvent>,
}

pub struct HarnessBuilder {
    metadata: InMemoryMetadataStore,
    recovery: InMemoryRecoveryStore,
    answers: Vec<bool>,
    fallback: bool,
    auto_backup: bool,
}

impl HarnessBuilder {
    pub fn metadata(mut self, metadata: InMemoryMetadataStore) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn recovery_snapshot(mut self, snapshot: RecoverySnapshot) -> Self {
        self.recovery = InMemoryRecoveryStore::with_snapshot(snapshot);
        self
    }

    /// Answers given to confirmations in order; `fallback` afterwards.
    pub fn answers(mut self, answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        self.answers = answers.into_iter().collect();
        self.fallback = fallback;
        self
    }

    pub fn auto_backup(mut self, enabled: bool) -> Self {
        self.auto_backup = enabled;
        self
    }

    /// Build and start the coordinator.
    pub fn start(self) -> Harness {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let metadata = Arc::new(self.metadata);
        let recovery = Arc::new(self.recovery);
        let prompter = Arc::new(ScriptedPrompter::new(self.answers, self.fallback));
        let notifier = Arc::new(RecordingNotifier::new());
        let bus = create_test_event_bus();
        let events = bus.subscribe();

        let stores = Stores {
            blobs: blobs.clone(),
            metadata: Box::new(metadata.clone()),
            recovery: Box::new(recovery.clone()),
        };
        let mut coordinator =
            PersistenceCoordinator::new(stores, prompter.clone(), notifier.clone(), bus)
                .with_auto_backup_on_first_run(self.auto_backup);
        coordinator.start().expect("coordinator failed to start");

        Harness {
            coordinator,
            blobs,
            metadata,
            recovery,
            prompter,
            notifier,
            events,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            metadata: InMemoryMetadataStore::new(),
            recovery: InMemoryRecoveryStore::new(),
            answers: Vec::new(),
            fallback: true,
            auto_backup: false,
        }
    }

    /// Fresh in-memory harness that confirms every prompt.
    pub fn new() -> Self {
        Self::builder().start()
    }

    /// Every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// A text attachment with a payload and a fresh id.
pub fn text_file(name: &str, contents: &str) -> StoredFile {
    StoredFile::new(name, "text/plain", contents.as_bytes().to_vec())
}

/// A draft carrying the given payload-bearing files.
pub fn draft_with_files(name: &str, files: &[StoredFile]) -> ContactDraft {
    let mut draft = ContactDraft::new(name);
    draft.files = files.iter().cloned().map(FileAttachment::from).collect();
    draft
}

/// Metadata-only references for `files`.
pub fn metas(files: &[StoredFile]) -> Vec<FileMeta> {
    files.iter().map(|f| f.meta.clone()).collect()
}

pub fn ids(files: &[StoredFile]) -> Vec<Id> {
    files.iter().map(|f| f.meta.id.clone()).collect()
}
