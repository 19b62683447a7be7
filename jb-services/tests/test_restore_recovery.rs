//! Integration tests for backup export, restore and crash recovery.
//!
//! Tests restore validation and confirmation, blob replacement, the
//! startup recovery offer, accept/dismiss, and export-then-restore.

mod common;

use common::{draft_with_files, text_file, Harness};
use jb_core::error::JbError;
use jb_models::{AppState, ContactDraft};
use jb_services::coordinator::{PersistenceCoordinator, RestoreOutcome, StartupOutcome, Stores, ViewFocus};
use jb_services::event_bus::AppEvent;
use jb_services::export::MemoryExportSink;
use jb_services::metadata_store::{InMemoryMetadataStore, MetadataStore};
use jb_services::notification::{NoticeLevel, RecordingNotifier};
use jb_services::prompt::AutoConfirm;
use jb_services::recovery::{InMemoryRecoveryStore, RecoverySnapshot, RecoveryStore};
use std::sync::Arc;

fn state_json(h: &Harness) -> String {
    serde_json::to_string(h.coordinator.state()).unwrap()
}

// ---- Restore validation ----

#[tokio::test]
async fn restore_without_contacts_leaves_state_unchanged() {
    let mut h = Harness::new();
    h.coordinator.add_contact(ContactDraft::new("Dana")).await.unwrap();
    let before = state_json(&h);
    let stored_before = h.metadata.raw();
    h.drain_events();

    let err = h
        .coordinator
        .restore(r#"{"defaultFields": []}"#, false)
        .await
        .unwrap_err();

    assert!(matches!(err, JbError::InvalidFormat(_)), "got {err:?}");
    assert_eq!(state_json(&h), before);
    assert_eq!(h.metadata.raw(), stored_before);
    assert_eq!(h.prompter.times_asked(), 0);
    assert_eq!(h.notifier.count(NoticeLevel::Error), 1);
    assert!(matches!(h.drain_events().as_slice(), [AppEvent::RestoreRejected { .. }]));
}

#[tokio::test]
async fn restore_with_non_array_contacts_is_invalid() {
    let mut h = Harness::new();
    let err = h
        .coordinator
        .restore(r#"{"contacts": "nope"}"#, false)
        .await
        .unwrap_err();
    assert!(matches!(err, JbError::InvalidFormat(_)));
}

#[tokio::test]
async fn restore_of_malformed_json_is_parse_failure() {
    let mut h = Harness::new();
    let err = h.coordinator.restore("{not json", true).await.unwrap_err();
    assert!(matches!(err, JbError::ParseFailure(_)));
    assert!(h.notifier.notices().is_empty(), "silent restore does not notify");
}

#[tokio::test]
async fn declined_restore_changes_nothing() {
    let mut h = Harness::builder().answers([false], false).start();
    h.coordinator.add_contact(ContactDraft::new("Dana")).await.unwrap();
    let before = state_json(&h);

    let outcome = h
        .coordinator
        .restore(r#"{"contacts": []}"#, false)
        .await
        .unwrap();

    assert_eq!(outcome, RestoreOutcome::Cancelled);
    assert_eq!(state_json(&h), before);
    assert_eq!(h.prompter.times_asked(), 1);
}

// ---- Applying restores ----

#[tokio::test]
async fn restore_replaces_contacts_and_blobs() {
    let mut h = Harness::new();
    let old = text_file("old.txt", "old");
    h.coordinator
        .add_contact(draft_with_files("Old", &[old.clone()]))
        .await
        .unwrap();

    let payload = r#"{
        "contacts": [{
            "id": 1717000000000,
            "name": "Restored",
            "files": [{"id": "f1", "name": "r.txt", "type": "text/plain", "size": 5}]
        }],
        "files": [{"id": "f1", "name": "r.txt", "type": "text/plain", "size": 5,
                   "dataUrl": "data:text/plain;base64,aGVsbG8="}]
    }"#;
    let outcome = h.coordinator.restore(payload, false).await.unwrap();

    assert_eq!(outcome, RestoreOutcome::Applied { contacts: 1, files: Some(1) });
    assert_eq!(h.coordinator.contacts()[0].id, "1717000000000");
    assert_eq!(h.blobs.ids().await, vec!["f1".to_string()]);
    assert!(!h.blobs.contains(&old.meta.id).await);
    assert_eq!(h.coordinator.focus(), &ViewFocus::ContactList);
    assert_eq!(h.notifier.count(NoticeLevel::Success), 1);
}

#[tokio::test]
async fn restore_without_files_keeps_blobs() {
    let mut h = Harness::new();
    let kept = text_file("kept.txt", "k");
    h.coordinator
        .add_contact(draft_with_files("Dana", &[kept.clone()]))
        .await
        .unwrap();

    h.coordinator.restore(r#"{"contacts": []}"#, false).await.unwrap();
    assert!(h.coordinator.contacts().is_empty());
    assert!(h.blobs.contains(&kept.meta.id).await);
}

#[tokio::test]
async fn restore_uses_defaults_for_missing_settings() {
    let mut h = Harness::new();
    h.coordinator.add_default_field("Gate Code").await.unwrap();
    h.coordinator.restore(r#"{"contacts": []}"#, true).await.unwrap();

    let labels: Vec<&str> = h
        .coordinator
        .state()
        .default_fields
        .iter()
        .map(|f| f.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Company", "Job Title", "Website"]);
    assert!(h.coordinator.state().business_info.is_empty());
}

#[tokio::test]
async fn failed_blob_replacement_aborts_restore() {
    let mut h = Harness::new();
    h.coordinator.add_contact(ContactDraft::new("Dana")).await.unwrap();
    let before = state_json(&h);

    h.blobs.fail_next_replace();
    let payload = r#"{"contacts": [], "files": []}"#;
    assert!(h.coordinator.restore(payload, false).await.is_err());
    assert_eq!(state_json(&h), before);
    assert_eq!(h.notifier.count(NoticeLevel::Error), 1);
}

#[tokio::test]
async fn restore_rejects_duplicate_contact_ids() {
    let mut h = Harness::new();
    let payload = r#"{"contacts": [{"id": "a", "name": "One"}, {"id": "a", "name": "Two"}]}"#;
    let err = h.coordinator.restore(payload, true).await.unwrap_err();
    assert!(matches!(err, JbError::InvalidFormat(_)));
}

// ---- Export ----

#[tokio::test]
async fn export_then_restore_roundtrip() {
    let mut h = Harness::new();
    let file = text_file("plan.txt", "floor plan");
    h.coordinator
        .add_contact(draft_with_files("Dana", &[file.clone()]))
        .await
        .unwrap();
    h.coordinator.add_default_field("Gate Code").await.unwrap();

    let sink = MemoryExportSink::new();
    let summary = h.coordinator.export_backup(&sink).await.unwrap();
    assert_eq!(summary.contacts, 1);
    assert_eq!(summary.files, 1);
    assert!(summary.file_name.starts_with("jobbook-backup-"));
    assert!(summary.file_name.ends_with(".json"));
    let (_, bytes) = sink.last().unwrap();
    let exported = String::from_utf8(bytes).unwrap();
    assert!(exported.contains("dataUrl"));

    let mut other = Harness::new();
    other.coordinator.restore(&exported, false).await.unwrap();
    assert_eq!(other.coordinator.contacts(), h.coordinator.contacts());
    assert_eq!(
        other.coordinator.state().default_fields,
        h.coordinator.state().default_fields
    );
    let stored = other
        .coordinator
        .attachment(&other.coordinator.contacts()[0].id.clone(), &file.meta.id)
        .await
        .unwrap();
    assert_eq!(stored.payload, b"floor plan");
}

// ---- Startup and recovery ----

#[tokio::test]
async fn startup_adopts_stored_state_and_ignores_snapshot() {
    let mut stored = AppState::default();
    stored.auto_backup_enabled = true;
    let metadata = InMemoryMetadataStore::new();
    metadata.save(&stored).unwrap();

    let h = Harness::builder()
        .metadata(metadata)
        .recovery_snapshot(RecoverySnapshot::new(r#"{"contacts": []}"#.into()))
        .start();

    assert!(h.coordinator.pending_recovery().is_none());
    assert!(h.coordinator.state().auto_backup_enabled);
}

#[tokio::test]
async fn startup_offers_snapshot_when_nothing_is_stored() {
    let snapshot = RecoverySnapshot::new(r#"{"contacts": [{"id": "c1", "name": "Recovered"}]}"#.into());
    let mut coordinator = PersistenceCoordinator::new(
        Stores {
            blobs: Arc::new(jb_services::blob_store::InMemoryBlobStore::new()),
            metadata: Box::new(InMemoryMetadataStore::new()),
            recovery: Box::new(InMemoryRecoveryStore::with_snapshot(snapshot.clone())),
        },
        Arc::new(AutoConfirm::yes()),
        Arc::new(RecordingNotifier::new()),
        common::create_test_event_bus(),
    );

    let outcome = coordinator.start().unwrap();
    assert_eq!(
        outcome,
        StartupOutcome::RecoveryAvailable { timestamp: snapshot.timestamp }
    );
    assert!(coordinator.contacts().is_empty(), "snapshot is not applied at startup");
}

#[tokio::test]
async fn fresh_start_without_anything_stored() {
    let mut coordinator = PersistenceCoordinator::new(
        Stores::in_memory(),
        Arc::new(AutoConfirm::yes()),
        Arc::new(RecordingNotifier::new()),
        common::create_test_event_bus(),
    )
    .with_auto_backup_on_first_run(true);

    assert_eq!(coordinator.start().unwrap(), StartupOutcome::Fresh);
    assert!(coordinator.state().auto_backup_enabled);
    assert_eq!(coordinator.state().default_fields.len(), 3);
}

#[tokio::test]
async fn accept_recovery_applies_silently_and_clears_snapshot() {
    let snapshot = RecoverySnapshot::new(
        r#"{"contacts": [{"id": "c1", "name": "Recovered"}],
            "files": [{"id": "f1", "name": "a.txt", "type": "text/plain", "size": 2, "dataUrl": "aGk="}]}"#
            .into(),
    );
    let mut h = Harness::builder()
        .recovery_snapshot(snapshot)
        .start();
    assert!(h.coordinator.pending_recovery().is_some());

    assert!(h.coordinator.accept_recovery().await.unwrap());

    assert_eq!(h.prompter.times_asked(), 0, "recovery must not prompt");
    assert_eq!(h.coordinator.contacts()[0].name, "Recovered");
    assert!(h.blobs.contains("f1").await);
    assert!(h.recovery.load().is_none());
    assert!(h.coordinator.pending_recovery().is_none());
    assert!(h.notifier.notices().is_empty());
    assert!(h.metadata.raw().is_some(), "recovered state is persisted");
    assert!(!h.coordinator.accept_recovery().await.unwrap());
}

#[tokio::test]
async fn dismiss_recovery_clears_without_applying() {
    let snapshot = RecoverySnapshot::new(r#"{"contacts": [{"id": "c1", "name": "Recovered"}]}"#.into());
    let mut h = Harness::builder().recovery_snapshot(snapshot).start();
    let before = state_json(&h);
    h.drain_events();

    assert!(h.coordinator.dismiss_recovery().unwrap());

    assert_eq!(state_json(&h), before);
    assert!(h.recovery.load().is_none());
    assert_eq!(h.drain_events(), vec![AppEvent::RecoveryDismissed]);
    assert!(!h.coordinator.dismiss_recovery().unwrap());
}

#[tokio::test]
async fn mutations_wait_for_a_recovery_decision() {
    let snapshot = RecoverySnapshot::new(
        r#"{"contacts": [{"id": "c1", "name": "Lost Customer"}, {"id": "c2", "name": "Another"}]}"#.into(),
    );
    let mut h = Harness::builder()
        .recovery_snapshot(snapshot.clone())
        .auto_backup(true)
        .start();

    let err = h.coordinator.add_contact(ContactDraft::new("New")).await.unwrap_err();
    assert!(matches!(err, JbError::RecoveryPending(_)), "got {err:?}");
    assert!(matches!(
        h.coordinator.toggle_auto_backup(false),
        Err(JbError::RecoveryPending(_))
    ));
    assert!(matches!(
        h.coordinator.add_default_field("Gate Code").await,
        Err(JbError::RecoveryPending(_))
    ));
    assert!(matches!(
        h.coordinator.restore(r#"{"contacts": []}"#, true).await,
        Err(JbError::RecoveryPending(_))
    ));

    assert!(h.coordinator.contacts().is_empty());
    assert!(h.metadata.raw().is_none(), "nothing may be stored over the candidate");
    assert_eq!(h.recovery.save_count(), 0);
    assert_eq!(h.recovery.load(), Some(snapshot));
    assert!(h.coordinator.pending_recovery().is_some());

    assert!(h.coordinator.accept_recovery().await.unwrap());
    h.coordinator.add_contact(ContactDraft::new("New")).await.unwrap();
    let names: Vec<&str> = h.coordinator.contacts().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["New", "Lost Customer", "Another"]);
}

#[tokio::test]
async fn dismissing_recovery_unlocks_mutations() {
    let snapshot = RecoverySnapshot::new(r#"{"contacts": [{"id": "c1", "name": "Lost"}]}"#.into());
    let mut h = Harness::builder().recovery_snapshot(snapshot).start();

    assert!(h.coordinator.add_contact(ContactDraft::new("New")).await.is_err());
    assert!(h.coordinator.dismiss_recovery().unwrap());
    h.coordinator.add_contact(ContactDraft::new("New")).await.unwrap();

    assert_eq!(h.coordinator.contacts().len(), 1);
    assert!(h.metadata.raw().is_some());
}

#[tokio::test]
async fn invalid_recovery_snapshot_stays_pending() {
    let snapshot = RecoverySnapshot::new(r#"{"businessInfo": {}}"#.into());
    let mut h = Harness::builder().recovery_snapshot(snapshot).start();

    assert!(h.coordinator.accept_recovery().await.is_err());
    assert!(h.coordinator.pending_recovery().is_some());
    assert!(h.recovery.load().is_some());
}

#[tokio::test]
async fn older_metadata_document_loads_with_defaults() {
    let raw = r#"{"contacts": [{"id": 42, "name": "Legacy", "jobTickets": [
        {"id": "t1", "date": "2023-01-01", "status": "Paid", "parts": [], "laborCost": 10}
    ]}]}"#;
    let h = Harness::builder()
        .metadata(InMemoryMetadataStore::with_raw(raw))
        .start();

    let contact = &h.coordinator.contacts()[0];
    assert_eq!(contact.id, "42");
    assert!(contact.files.is_empty());
    assert!(contact.job_tickets[0].sales_tax_rate.is_none());
    assert!(!h.coordinator.state().auto_backup_enabled);
    assert!(h.coordinator.state().last_auto_backup.is_none());
    assert_eq!(h.coordinator.state().default_fields.len(), 3);
}
