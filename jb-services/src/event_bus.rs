//! Typed event bus for observable side effects.
//!
//! The coordinator emits an event for every state change and every
//! persistence outcome. Front ends and tests subscribe without the
//! coordinator knowing who listens.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use jb_models::Id;

/// Application-level events emitted by the persistence coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// State was adopted at startup.
    StateLoaded {
        contacts: usize,
        recovery_pending: bool,
    },
    ContactAdded {
        contact_id: Id,
    },
    ContactUpdated {
        contact_id: Id,
    },
    /// A contact and all its attachment blobs were removed.
    ContactDeleted {
        contact_id: Id,
        files_removed: usize,
    },
    FilesAdded {
        contact_id: Id,
        file_ids: Vec<Id>,
    },
    FileRemoved {
        contact_id: Id,
        file_id: Id,
    },
    TicketsUpdated {
        contact_id: Id,
        count: usize,
    },
    DefaultFieldsChanged {
        count: usize,
    },
    BusinessInfoUpdated,
    AutoBackupToggled {
        enabled: bool,
    },
    /// A backup or recovery payload replaced the whole state.
    StateRestored {
        contacts: usize,
        files: Option<usize>,
        silent: bool,
    },
    /// A restore payload was rejected before anything changed.
    RestoreRejected {
        reason: String,
    },
    /// The metadata document was written.
    Persisted,
    /// The metadata document could not be written.
    PersistFailed {
        error: String,
        quota_exceeded: bool,
    },
    RecoverySnapshotSaved {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    RecoveryAccepted,
    RecoveryDismissed,
    BackupExported {
        file_name: String,
        bytes: usize,
    },
}

/// Application-wide event bus backed by a tokio broadcast channel.
///
/// Every subscriber gets every event. Subscribers that fall behind receive
/// `Lagged` and miss events.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<AppEvent>>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to receive application events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: AppEvent) {
        let label = event_label(&event);
        match self.sender.send(event) {
            Ok(count) => debug!("event_bus: emitted {label} to {count} subscriber(s)"),
            Err(_) => debug!("event_bus: no subscribers for {label}"),
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(jb_core::constants::EVENT_BUS_CAPACITY)
    }
}

/// Label for an event, for logging.
pub fn event_label(event: &AppEvent) -> &'static str {
    match event {
        AppEvent::StateLoaded { .. } => "StateLoaded",
        AppEvent::ContactAdded { .. } => "ContactAdded",
        AppEvent::ContactUpdated { .. } => "ContactUpdated",
        AppEvent::ContactDeleted { .. } => "ContactDeleted",
        AppEvent::FilesAdded { .. } => "FilesAdded",
        AppEvent::FileRemoved { .. } => "FileRemoved",
        AppEvent::TicketsUpdated { .. } => "TicketsUpdated",
        AppEvent::DefaultFieldsChanged { .. } => "DefaultFieldsChanged",
        AppEvent::BusinessInfoUpdated => "BusinessInfoUpdated",
        AppEvent::AutoBackupToggled { .. } => "AutoBackupToggled",
        AppEvent::StateRestored { .. } => "StateRestored",
        AppEvent::RestoreRejected { .. } => "RestoreRejected",
        AppEvent::Persisted => "Persisted",
        AppEvent::PersistFailed { .. } => "PersistFailed",
        AppEvent::RecoverySnapshotSaved { .. } => "RecoverySnapshotSaved",
        AppEvent::RecoveryAccepted => "RecoveryAccepted",
        AppEvent::RecoveryDismissed => "RecoveryDismissed",
        AppEvent::BackupExported { .. } => "BackupExported",
    }
}
