//! Persistence coordinator.
//!
//! Owns the in-memory `AppState` and is the only way to change it. Every
//! mutation follows the same order:
//!
//! 1. validate the request
//! 2. await the blob store work (put new payloads, delete dropped ones)
//! 3. apply the change to the in-memory state
//! 4. persist: write the metadata document and, when auto-backup is on,
//!    a full recovery snapshot with payloads
//!
//! A failed blob step aborts before the state changes. A failed metadata
//! write leaves the change applied in memory and is returned to the caller.
//! A failed snapshot write is reported as a warning notice; the change
//! itself stands.
//!
//! While a recovery candidate is pending every mutation is refused with
//! `JbError::RecoveryPending`, so the stored state and the snapshot stay
//! as they were until the user accepts or dismisses it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, error, info, warn};

use jb_core::config::AppConfig;
use jb_core::error::{JbError, JbResult};
use jb_models::models::contact::validate_tickets;
use jb_models::{
    new_id, AppState, AutoBackupStamp, BackupDocument, BusinessInfo, Contact, ContactDraft,
    DefaultFieldSetting, FileAttachment, FileMeta, Id, JobTicket, StoredFile,
};

use crate::blob_store::{BlobStore, BlobUsage, InMemoryBlobStore, SqliteBlobStore};
use crate::event_bus::{AppEvent, EventBus};
use crate::export::{backup_file_name, ExportSink};
use crate::metadata_store::{InMemoryMetadataStore, MetadataStore, SqliteMetadataStore};
use crate::notification::{Notice, Notifier};
use crate::prompt::Prompter;
use crate::recovery::{InMemoryRecoveryStore, RecoverySnapshot, RecoveryStore, SessionRecoveryStore};
use crate::service::{Service, ServiceState};

/// Which record the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewFocus {
    #[default]
    ContactList,
    ContactDetail(Id),
    Settings,
}

impl fmt::Display for ViewFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewFocus::ContactList => write!(f, "contacts"),
            ViewFocus::ContactDetail(id) => write!(f, "contact {id}"),
            ViewFocus::Settings => write!(f, "settings"),
        }
    }
}

/// What `start` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// A stored state document was adopted.
    Loaded { contacts: usize },
    /// Nothing stored, but a recovery snapshot is waiting for a decision.
    RecoveryAvailable { timestamp: chrono::DateTime<Utc> },
    /// Nothing stored; started from built-in defaults.
    Fresh,
}

/// Result of a restore request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Applied { contacts: usize, files: Option<usize> },
    /// The user declined the confirmation.
    Cancelled,
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub file_name: String,
    pub contacts: usize,
    pub files: usize,
    pub bytes: usize,
}

/// Space used by both durable stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub metadata_bytes: u64,
    pub blobs: BlobUsage,
}

/// The three stores the coordinator persists through.
pub struct Stores {
    pub blobs: Arc<dyn BlobStore>,
    pub metadata: Box<dyn MetadataStore>,
    pub recovery: Box<dyn RecoveryStore>,
}

impl Stores {
    /// SQLite-backed stores and the session recovery file, at the paths
    /// `config` names. The blob database opens on first use.
    pub fn open(config: &AppConfig) -> JbResult<Self> {
        Ok(Self {
            blobs: Arc::new(SqliteBlobStore::from_config(config)?),
            metadata: Box::new(SqliteMetadataStore::from_config(config)?),
            recovery: Box::new(SessionRecoveryStore::from_config(config)),
        })
    }

    /// Stores that live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            blobs: Arc::new(InMemoryBlobStore::new()),
            metadata: Box::new(InMemoryMetadataStore::new()),
            recovery: Box::new(InMemoryRecoveryStore::new()),
        }
    }
}

/// Owner of the application state and driver of all persistence.
pub struct PersistenceCoordinator {
    state: AppState,
    focus: ViewFocus,
    pending_recovery: Option<RecoverySnapshot>,
    service_state: ServiceState,
    auto_backup_on_first_run: bool,
    blobs: Arc<dyn BlobStore>,
    metadata: Box<dyn MetadataStore>,
    recovery: Box<dyn RecoveryStore>,
    prompter: Arc<dyn Prompter>,
    notifier: Arc<dyn Notifier>,
    events: EventBus,
}

impl PersistenceCoordinator {
    /// Create a coordinator over `stores`. Call `start` before use.
    pub fn new(
        stores: Stores,
        prompter: Arc<dyn Prompter>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
    ) -> Self {
        Self {
            state: AppState::default(),
            focus: ViewFocus::default(),
            pending_recovery: None,
            service_state: ServiceState::Created,
            auto_backup_on_first_run: false,
            blobs: stores.blobs,
            metadata: stores.metadata,
            recovery: stores.recovery,
            prompter,
            notifier,
            events,
        }
    }

    /// Enable auto-backup in the state created when nothing is stored.
    pub fn with_auto_backup_on_first_run(mut self, enabled: bool) -> Self {
        self.auto_backup_on_first_run = enabled;
        self
    }

    // ─── Startup ─────────────────────────────────────────────────────────

    /// Adopt the stored state, or, when none exists, look for a recovery
    /// snapshot and hold it as a pending candidate without applying it.
    pub fn start(&mut self) -> JbResult<StartupOutcome> {
        self.focus = ViewFocus::ContactList;
        self.pending_recovery = None;

        let outcome = match self.metadata.load()? {
            Some(state) => {
                info!("loaded state with {} contact(s)", state.contacts.len());
                self.state = state;
                StartupOutcome::Loaded {
                    contacts: self.state.contacts.len(),
                }
            }
            None => {
                self.state = AppState {
                    auto_backup_enabled: self.auto_backup_on_first_run,
                    ..AppState::default()
                };
                match self.recovery.load() {
                    Some(snapshot) => {
                        info!("found recovery snapshot from {}", snapshot.timestamp);
                        let timestamp = snapshot.timestamp;
                        self.pending_recovery = Some(snapshot);
                        StartupOutcome::RecoveryAvailable { timestamp }
                    }
                    None => {
                        info!("no stored state, starting fresh");
                        StartupOutcome::Fresh
                    }
                }
            }
        };

        self.service_state = ServiceState::Running;
        self.events.emit(AppEvent::StateLoaded {
            contacts: self.state.contacts.len(),
            recovery_pending: self.pending_recovery.is_some(),
        });
        Ok(outcome)
    }

    // ─── Contacts ────────────────────────────────────────────────────────

    /// Add a contact at the top of the list and focus it.
    pub async fn add_contact(&mut self, draft: ContactDraft) -> JbResult<Id> {
        self.ensure_no_pending_recovery()?;
        draft.validate()?;
        self.ensure_files_unowned(&draft.files, None)?;
        self.ensure_blobs_exist(&draft.files, &HashSet::new()).await?;
        self.commit_payloads(&draft.files).await?;

        let id = new_id();
        let contact = draft.into_contact(id.clone(), Utc::now());
        info!("added contact {id} with {} file(s)", contact.files.len());
        self.state.contacts.insert(0, contact);
        self.focus = ViewFocus::ContactDetail(id.clone());
        self.events.emit(AppEvent::ContactAdded { contact_id: id.clone() });

        self.persist().await?;
        Ok(id)
    }

    /// Replace a contact's contents, keeping its id and creation time.
    ///
    /// Payload-bearing files are stored; files the draft no longer lists
    /// are deleted from the blob store.
    pub async fn update_contact(&mut self, id: &str, draft: ContactDraft) -> JbResult<()> {
        self.ensure_no_pending_recovery()?;
        let existing = self.require_contact(id)?;
        let created_at = existing.created_at;
        let old_ids: HashSet<Id> = existing.file_ids().into_iter().collect();

        draft.validate()?;
        self.ensure_files_unowned(&draft.files, Some(id))?;
        self.ensure_blobs_exist(&draft.files, &old_ids).await?;

        let kept: HashSet<&str> = draft.files.iter().map(|f| f.id()).collect();
        let removed: Vec<Id> = old_ids
            .iter()
            .filter(|old| !kept.contains(old.as_str()))
            .cloned()
            .collect();

        // Payloads about to be overwritten, so a failed delete can put them back.
        let overwritten: Vec<Id> = draft
            .files
            .iter()
            .filter(|f| f.payload().is_some() && old_ids.contains(f.id()))
            .map(|f| f.id().to_string())
            .collect();
        let previous = if overwritten.is_empty() {
            Vec::new()
        } else {
            self.blobs
                .get(&overwritten)
                .await
                .map_err(|e| blob_failure("read replaced files", e))?
        };

        let committed = self.commit_payloads(&draft.files).await?;

        if let Err(e) = self.blobs.delete(&removed).await {
            error!("removing dropped files from contact {id} failed: {e}");
            self.roll_back_payloads(committed, &old_ids, previous).await;
            return Err(blob_failure("delete removed files", e));
        }

        let updated = draft.into_contact(id.to_string(), created_at);
        if let Some(slot) = self.state.contact_mut(id) {
            *slot = updated;
        }
        info!("updated contact {id} ({} file(s) removed)", removed.len());
        self.events.emit(AppEvent::ContactUpdated { contact_id: id.to_string() });

        self.persist().await
    }

    /// Delete a contact and all of its attachments after confirmation.
    ///
    /// Returns `false` when the user declines.
    pub async fn delete_contact(&mut self, id: &str) -> JbResult<bool> {
        self.ensure_no_pending_recovery()?;
        let contact = self.require_contact(id)?;
        let file_ids = contact.file_ids();
        let question = format!(
            "Delete contact \"{}\" and its {} attachment(s)? This cannot be undone.",
            display_name(contact),
            file_ids.len()
        );
        if !self.prompter.confirm(&question) {
            debug!("delete of contact {id} declined");
            return Ok(false);
        }

        self.blobs
            .delete(&file_ids)
            .await
            .map_err(|e| blob_failure("delete contact files", e))?;

        self.state.contacts.retain(|c| c.id != id);
        if self.focus == ViewFocus::ContactDetail(id.to_string()) {
            self.focus = ViewFocus::ContactList;
        }
        info!("deleted contact {id} and {} file(s)", file_ids.len());
        self.events.emit(AppEvent::ContactDeleted {
            contact_id: id.to_string(),
            files_removed: file_ids.len(),
        });

        self.persist().await?;
        Ok(true)
    }

    // ─── Attachments ─────────────────────────────────────────────────────

    /// Append attachments to a contact, keeping the ones it already has.
    pub async fn add_files_to_contact(
        &mut self,
        contact_id: &str,
        files: Vec<FileAttachment>,
    ) -> JbResult<Vec<FileMeta>> {
        self.ensure_no_pending_recovery()?;
        let contact = self.require_contact(contact_id)?;
        let mut seen: HashSet<&str> = contact.files.iter().map(|f| f.id.as_str()).collect();
        for file in &files {
            if !seen.insert(file.id()) {
                return Err(JbError::Validation(format!(
                    "file {} is already attached to contact {contact_id}",
                    file.id()
                )));
            }
        }
        self.ensure_files_unowned(&files, Some(contact_id))?;
        self.ensure_blobs_exist(&files, &HashSet::new()).await?;
        self.commit_payloads(&files).await?;

        let added: Vec<FileMeta> = files.into_iter().map(FileAttachment::into_meta).collect();
        let file_ids: Vec<Id> = added.iter().map(|f| f.id.clone()).collect();
        if let Some(contact) = self.state.contact_mut(contact_id) {
            contact.files.extend(added.iter().cloned());
        }
        info!("attached {} file(s) to contact {contact_id}", added.len());
        self.events.emit(AppEvent::FilesAdded {
            contact_id: contact_id.to_string(),
            file_ids,
        });

        self.persist().await?;
        Ok(added)
    }

    /// Delete one attachment's payload and drop its reference.
    pub async fn remove_file_from_contact(&mut self, contact_id: &str, file_id: &str) -> JbResult<FileMeta> {
        self.ensure_no_pending_recovery()?;
        let contact = self.require_contact(contact_id)?;
        let meta = contact
            .file(file_id)
            .cloned()
            .ok_or_else(|| JbError::FileNotFound(format!("{file_id} on contact {contact_id}")))?;

        self.blobs
            .delete(&[meta.id.clone()])
            .await
            .map_err(|e| blob_failure("delete file", e))?;

        if let Some(contact) = self.state.contact_mut(contact_id) {
            contact.files.retain(|f| f.id != file_id);
        }
        info!("removed file {file_id} from contact {contact_id}");
        self.events.emit(AppEvent::FileRemoved {
            contact_id: contact_id.to_string(),
            file_id: file_id.to_string(),
        });

        self.persist().await?;
        Ok(meta)
    }

    /// Fetch an attachment's payload.
    pub async fn attachment(&self, contact_id: &str, file_id: &str) -> JbResult<StoredFile> {
        let contact = self.require_contact(contact_id)?;
        if contact.file(file_id).is_none() {
            return Err(JbError::FileNotFound(format!("{file_id} on contact {contact_id}")));
        }
        self.blobs
            .get(&[file_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| JbError::FileNotFound(format!("payload for {file_id} is missing")))
    }

    // ─── Tickets and settings ────────────────────────────────────────────

    /// Replace a contact's job tickets with `tickets`.
    pub async fn update_job_tickets(&mut self, contact_id: &str, tickets: Vec<JobTicket>) -> JbResult<()> {
        self.ensure_no_pending_recovery()?;
        self.require_contact(contact_id)?;
        validate_tickets(&tickets)?;

        let count = tickets.len();
        if let Some(contact) = self.state.contact_mut(contact_id) {
            contact.job_tickets = tickets;
        }
        self.events.emit(AppEvent::TicketsUpdated {
            contact_id: contact_id.to_string(),
            count,
        });
        self.persist().await
    }

    /// Offer a new default custom field. Returns `false` without changing
    /// anything when the label is blank or already present in any case.
    pub async fn add_default_field(&mut self, label: &str) -> JbResult<bool> {
        self.ensure_no_pending_recovery()?;
        let label = label.trim();
        if label.is_empty() {
            return Ok(false);
        }
        if self.state.default_fields.iter().any(|f| f.same_label(label)) {
            debug!("default field \"{label}\" already exists");
            return Ok(false);
        }

        self.state.default_fields.push(DefaultFieldSetting::new(label));
        self.events.emit(AppEvent::DefaultFieldsChanged {
            count: self.state.default_fields.len(),
        });
        self.persist().await?;
        Ok(true)
    }

    /// Remove a default field. Returns `false` if no field has that id.
    pub async fn delete_default_field(&mut self, id: &str) -> JbResult<bool> {
        self.ensure_no_pending_recovery()?;
        let before = self.state.default_fields.len();
        self.state.default_fields.retain(|f| f.id != id);
        if self.state.default_fields.len() == before {
            return Ok(false);
        }

        self.events.emit(AppEvent::DefaultFieldsChanged {
            count: self.state.default_fields.len(),
        });
        self.persist().await?;
        Ok(true)
    }

    pub async fn update_business_info(&mut self, info: BusinessInfo) -> JbResult<()> {
        self.ensure_no_pending_recovery()?;
        self.state.business_info = info;
        self.events.emit(AppEvent::BusinessInfoUpdated);
        self.persist().await
    }

    /// Turn auto-backup on or off. Saves the metadata document only; the
    /// next mutation takes the first snapshot.
    pub fn toggle_auto_backup(&mut self, enabled: bool) -> JbResult<()> {
        self.ensure_no_pending_recovery()?;
        self.state.auto_backup_enabled = enabled;
        info!("auto-backup {}", if enabled { "enabled" } else { "disabled" });
        self.events.emit(AppEvent::AutoBackupToggled { enabled });
        self.save_metadata()
    }

    // ─── Backup, restore, recovery ───────────────────────────────────────

    /// Replace the whole state from a backup payload.
    ///
    /// Validation failures are reported through the notifier unless
    /// `silent`, and leave everything untouched. Unless `silent`, the user
    /// must confirm. Carried files replace the blob store before the
    /// metadata is adopted.
    pub async fn restore(&mut self, payload: &str, silent: bool) -> JbResult<RestoreOutcome> {
        self.ensure_no_pending_recovery()?;
        let doc = match BackupDocument::parse(payload).and_then(validate_backup) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("restore rejected: {e}");
                self.events.emit(AppEvent::RestoreRejected { reason: e.to_string() });
                if !silent {
                    self.notifier.notify(&Notice::error("Restore failed", e.to_string()));
                }
                return Err(e);
            }
        };

        if !silent {
            let question = format!(
                "Restore {} contact(s) from backup? This replaces all current data.",
                doc.contacts.len()
            );
            if !self.prompter.confirm(&question) {
                debug!("restore declined");
                return Ok(RestoreOutcome::Cancelled);
            }
        }

        let file_count = doc.files.as_ref().map(Vec::len);
        if let Some(files) = &doc.files {
            if let Err(e) = self.blobs.replace_all(files).await {
                error!("restore could not replace attachments: {e}");
                let e = blob_failure("replace attachments", e);
                if !silent {
                    self.notifier.notify(&Notice::error("Restore failed", e.to_string()));
                }
                return Err(e);
            }
        }

        let default_fields = doc.resolved_default_fields();
        let business_info = doc.resolved_business_info();
        self.state.contacts = doc.contacts;
        self.state.default_fields = default_fields;
        self.state.business_info = business_info;
        self.focus = ViewFocus::ContactList;

        let contacts = self.state.contacts.len();
        info!("restored {contacts} contact(s), files: {file_count:?}");
        self.events.emit(AppEvent::StateRestored {
            contacts,
            files: file_count,
            silent,
        });

        self.persist().await?;
        if !silent {
            self.notifier.notify(&Notice::success(
                "Restore complete",
                format!("Restored {contacts} contact(s)."),
            ));
        }
        Ok(RestoreOutcome::Applied {
            contacts,
            files: file_count,
        })
    }

    /// Apply the pending recovery snapshot without asking, then clear it.
    /// Returns `false` when there is no pending snapshot.
    pub async fn accept_recovery(&mut self) -> JbResult<bool> {
        let Some(snapshot) = self.pending_recovery.take() else {
            return Ok(false);
        };

        if let Err(e) = self.restore(&snapshot.data, true).await {
            if !matches!(e, JbError::StorageQuotaExceeded(_)) {
                self.pending_recovery = Some(snapshot);
                return Err(e);
            }
            warn!("recovered state could not be fully saved: {e}");
        }

        self.recovery.clear()?;
        info!("recovery snapshot from {} applied", snapshot.timestamp);
        self.events.emit(AppEvent::RecoveryAccepted);
        Ok(true)
    }

    /// Discard the pending recovery snapshot without applying it.
    /// Returns `false` when there is no pending snapshot.
    pub fn dismiss_recovery(&mut self) -> JbResult<bool> {
        if self.pending_recovery.take().is_none() {
            return Ok(false);
        }
        self.recovery.clear()?;
        info!("recovery snapshot dismissed");
        self.events.emit(AppEvent::RecoveryDismissed);
        Ok(true)
    }

    /// Export the full state with every attachment payload.
    pub async fn export_backup(&self, sink: &dyn ExportSink) -> JbResult<ExportSummary> {
        let files = self.blobs.get_all().await?;
        let file_count = files.len();
        let json = self.state.to_backup(Some(files)).to_json_pretty()?;
        let file_name = backup_file_name(Local::now().date_naive());

        sink.save(&file_name, json.as_bytes())?;
        info!("exported backup {file_name} ({} bytes)", json.len());
        self.events.emit(AppEvent::BackupExported {
            file_name: file_name.clone(),
            bytes: json.len(),
        });
        Ok(ExportSummary {
            file_name,
            contacts: self.state.contacts.len(),
            files: file_count,
            bytes: json.len(),
        })
    }

    // ─── Read side ───────────────────────────────────────────────────────

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.state.contacts
    }

    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.state.contact(id)
    }

    /// Contacts whose name, email, phone, address or custom-field values
    /// contain `query`, ignoring case.
    pub fn search_contacts(&self, query: &str) -> Vec<&Contact> {
        self.state.contacts.iter().filter(|c| c.matches(query)).collect()
    }

    pub fn focus(&self) -> &ViewFocus {
        &self.focus
    }

    /// Move focus. A contact focus must name an existing contact.
    pub fn set_focus(&mut self, focus: ViewFocus) -> JbResult<()> {
        if let ViewFocus::ContactDetail(id) = &focus {
            self.require_contact(id)?;
        }
        self.focus = focus;
        Ok(())
    }

    pub fn pending_recovery(&self) -> Option<&RecoverySnapshot> {
        self.pending_recovery.as_ref()
    }

    pub async fn storage_usage(&self) -> JbResult<StorageUsage> {
        Ok(StorageUsage {
            metadata_bytes: self.metadata.stored_bytes()?,
            blobs: self.blobs.usage().await?,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn ensure_no_pending_recovery(&self) -> JbResult<()> {
        match &self.pending_recovery {
            Some(snapshot) => Err(JbError::RecoveryPending(format!(
                "unsaved data from {} is waiting; accept or dismiss it first",
                snapshot.timestamp
            ))),
            None => Ok(()),
        }
    }

    /// Undo `commit_payloads` for a contact whose files were `old_ids`:
    /// drop new payloads and put back the ones that were overwritten.
    async fn roll_back_payloads(&self, committed: Vec<Id>, old_ids: &HashSet<Id>, previous: Vec<StoredFile>) {
        let fresh: Vec<Id> = committed
            .into_iter()
            .filter(|c| !old_ids.contains(c))
            .collect();
        if let Err(e) = self.blobs.delete(&fresh).await {
            warn!("could not roll back {} new blob(s): {e}", fresh.len());
        }
        if !previous.is_empty() {
            if let Err(e) = self.blobs.put(&previous).await {
                warn!("could not restore {} replaced blob(s): {e}", previous.len());
            }
        }
    }

    fn require_contact(&self, id: &str) -> JbResult<&Contact> {
        self.state
            .contact(id)
            .ok_or_else(|| JbError::ContactNotFound(id.to_string()))
    }

    /// Reject payloads whose ids another contact already references; the
    /// blob store is keyed globally.
    fn ensure_files_unowned(&self, files: &[FileAttachment], owner: Option<&str>) -> JbResult<()> {
        for file in files {
            let taken = self
                .state
                .contacts
                .iter()
                .filter(|c| Some(c.id.as_str()) != owner)
                .any(|c| c.file(file.id()).is_some());
            if taken {
                return Err(JbError::Validation(format!(
                    "file {} belongs to another contact",
                    file.id()
                )));
            }
        }
        Ok(())
    }

    /// Metadata-only references not in `known` must already be stored.
    async fn ensure_blobs_exist(&self, files: &[FileAttachment], known: &HashSet<Id>) -> JbResult<()> {
        let wanted: Vec<Id> = files
            .iter()
            .filter(|f| f.payload().is_none() && !known.contains(f.id()))
            .map(|f| f.id().to_string())
            .collect();
        if wanted.is_empty() {
            return Ok(());
        }
        let found: HashSet<Id> = self
            .blobs
            .get(&wanted)
            .await?
            .into_iter()
            .map(|f| f.meta.id)
            .collect();
        match wanted.into_iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(JbError::FileNotFound(format!("no stored payload for {missing}"))),
            None => Ok(()),
        }
    }

    /// Store every payload-bearing file; returns their ids.
    async fn commit_payloads(&self, files: &[FileAttachment]) -> JbResult<Vec<Id>> {
        let payloads: Vec<StoredFile> = files.iter().filter_map(|f| f.payload().cloned()).collect();
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        self.blobs.put(&payloads).await.map_err(|e| {
            error!("storing {} attachment(s) failed: {e}", payloads.len());
            blob_failure("store attachments", e)
        })?;
        Ok(payloads.into_iter().map(|f| f.meta.id).collect())
    }

    /// Persist after a mutation: snapshot (when auto-backup is on) and the
    /// metadata document. The snapshot is written even if the metadata
    /// write fails. Only the metadata result is returned; an error always
    /// means the change was applied in memory but not saved.
    async fn persist(&mut self) -> JbResult<()> {
        let snapshot = if self.state.auto_backup_enabled {
            match self.build_snapshot().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("could not build recovery snapshot: {e}");
                    None
                }
            }
        } else {
            None
        };

        let saved = self.save_metadata();

        if let Some(snapshot) = snapshot {
            match self.recovery.save(&snapshot) {
                Ok(()) => self.events.emit(AppEvent::RecoverySnapshotSaved {
                    timestamp: snapshot.timestamp,
                }),
                Err(e) => {
                    warn!("recovery snapshot not saved: {e}");
                    self.notifier.notify(&Notice::warning(
                        "Auto-backup failed",
                        format!("Your change was kept, but the recovery snapshot could not be written: {e}"),
                    ));
                }
            }
        }

        saved
    }

    /// Full snapshot with payloads; records the metadata-only form as the
    /// last auto-backup.
    async fn build_snapshot(&mut self) -> JbResult<RecoverySnapshot> {
        let files = self.blobs.get_all().await?;
        let full = self.state.to_backup(Some(files)).to_json()?;
        let snapshot = RecoverySnapshot::new(full);
        self.state.last_auto_backup = Some(AutoBackupStamp {
            timestamp: snapshot.timestamp,
            data: self.state.to_backup(None).to_json()?,
        });
        Ok(snapshot)
    }

    fn save_metadata(&self) -> JbResult<()> {
        match self.metadata.save(&self.state) {
            Ok(()) => {
                self.events.emit(AppEvent::Persisted);
                Ok(())
            }
            Err(e) => {
                let quota_exceeded = e.is_quota_exceeded();
                if quota_exceeded {
                    warn!("metadata store is full: {e}");
                    self.notifier.notify(&Notice::warning(
                        "Storage full",
                        "Your changes could not be saved because storage is full. \
                         Remove some attachments to free up space.",
                    ));
                } else {
                    error!("saving state failed: {e}");
                }
                self.events.emit(AppEvent::PersistFailed {
                    error: e.to_string(),
                    quota_exceeded,
                });
                Err(e)
            }
        }
    }
}

impl Service for PersistenceCoordinator {
    fn name(&self) -> &str {
        "persistence"
    }

    fn state(&self) -> ServiceState {
        self.service_state
    }

    fn init(&mut self) -> JbResult<()> {
        if let Err(e) = self.start() {
            self.service_state = ServiceState::Failed;
            return Err(e);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> JbResult<()> {
        debug!(
            "persistence stopping with {} contact(s), recovery pending: {}",
            self.state.contacts.len(),
            self.pending_recovery.is_some()
        );
        self.service_state = ServiceState::Stopped;
        Ok(())
    }
}

/// Keep store-level conditions visible; everything else is a partial blob
/// failure of the enclosing operation.
fn blob_failure(action: &str, err: JbError) -> JbError {
    match err {
        e @ (JbError::StoreUnavailable(_) | JbError::StorageQuotaExceeded(_)) => e,
        other => JbError::PartialBlobFailure(format!("{action}: {other}")),
    }
}

/// Reject backups whose records would break id uniqueness.
fn validate_backup(doc: BackupDocument) -> JbResult<BackupDocument> {
    check_backup_ids(&doc)?;
    Ok(doc)
}

fn check_backup_ids(doc: &BackupDocument) -> JbResult<()> {
    let mut contact_ids = HashSet::new();
    for contact in &doc.contacts {
        if !contact_ids.insert(contact.id.as_str()) {
            return Err(JbError::InvalidFormat(format!("duplicate contact id {}", contact.id)));
        }
        contact
            .validate()
            .map_err(|e| JbError::InvalidFormat(format!("contact {}: {e}", contact.id)))?;
    }
    if let Some(files) = &doc.files {
        let mut file_ids = HashSet::new();
        if let Some(dup) = files.iter().find(|f| !file_ids.insert(f.meta.id.as_str())) {
            return Err(JbError::InvalidFormat(format!("duplicate file id {}", dup.meta.id)));
        }
    }
    Ok(())
}

fn display_name(contact: &Contact) -> &str {
    if contact.name.trim().is_empty() {
        "(unnamed)"
    } else {
        &contact.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingNotifier;
    use crate::prompt::AutoConfirm;

    fn coordinator() -> PersistenceCoordinator {
        let mut c = PersistenceCoordinator::new(
            Stores::in_memory(),
            Arc::new(AutoConfirm::yes()),
            Arc::new(RecordingNotifier::new()),
            EventBus::new(64),
        );
        c.start().unwrap();
        c
    }

    #[tokio::test]
    async fn test_add_contact_prepends_and_focuses() {
        let mut c = coordinator();
        let first = c.add_contact(ContactDraft::new("First")).await.unwrap();
        let second = c.add_contact(ContactDraft::new("Second")).await.unwrap();

        assert_eq!(c.contacts()[0].id, second);
        assert_eq!(c.contacts()[1].id, first);
        assert_eq!(c.focus(), &ViewFocus::ContactDetail(second));
    }

    #[tokio::test]
    async fn test_update_unknown_contact() {
        let mut c = coordinator();
        let err = c.update_contact("nope", ContactDraft::new("x")).await.unwrap_err();
        assert!(matches!(err, JbError::ContactNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_focus_requires_contact() {
        let mut c = coordinator();
        assert!(c.set_focus(ViewFocus::ContactDetail("ghost".into())).is_err());
        c.set_focus(ViewFocus::Settings).unwrap();
        assert_eq!(c.focus().to_string(), "settings");
    }

    #[test]
    fn test_blob_failure_keeps_store_conditions() {
        assert!(matches!(
            blob_failure("x", JbError::StoreUnavailable("closed".into())),
            JbError::StoreUnavailable(_)
        ));
        assert!(matches!(
            blob_failure("x", JbError::Database("io".into())),
            JbError::PartialBlobFailure(_)
        ));
    }

    #[test]
    fn test_validate_backup_rejects_duplicate_contacts() {
        let payload = r#"{"contacts": [{"id": "a"}, {"id": "a"}]}"#;
        let err = BackupDocument::parse(payload).and_then(validate_backup).unwrap_err();
        assert!(matches!(err, JbError::InvalidFormat(_)));
    }

    #[test]
    fn test_service_lifecycle() {
        let mut c = PersistenceCoordinator::new(
            Stores::in_memory(),
            Arc::new(AutoConfirm::no()),
            Arc::new(RecordingNotifier::new()),
            EventBus::default(),
        );
        assert_eq!(Service::state(&c), ServiceState::Created);
        c.init().unwrap();
        assert!(c.is_healthy());
        c.shutdown().unwrap();
        assert_eq!(c.name(), "persistence");
        assert!(!c.is_healthy());
    }
}
