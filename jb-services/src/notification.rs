//! User-facing notices.
//!
//! The coordinator reports quota warnings and restore results through a
//! `Notifier`. The desktop implementation shows native notifications; the
//! log implementation writes them through tracing; the recording one keeps
//! them for inspection.

use std::sync::{Mutex, PoisonError};

use tracing::{error, info, warn};

use jb_core::constants::APP_NAME;
#[allow(unused_imports)]
use jb_core::error::JbError;
use jb_core::error::JbResult;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, body)
    }

    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, body)
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, body)
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, body)
    }
}

/// Delivers notices to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Native desktop notifications. Falls back to the log when the desktop
/// refuses the notification.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn show(&self, notice: &Notice) -> JbResult<()> {
        #[cfg(not(test))]
        {
            notify_rust::Notification::new()
                .summary(&notice.title)
                .body(&notice.body)
                .appname(APP_NAME)
                .show()
                .map_err(|e| JbError::Notification(e.to_string()))?;
        }

        let _ = (notice, APP_NAME);
        Ok(())
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: &Notice) {
        if let Err(e) = self.show(notice) {
            warn!("desktop notification failed ({e}), logging instead");
            LogNotifier.notify(notice);
        }
    }
}

/// Writes notices to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => info!("{}: {}", notice.title, notice.body),
            NoticeLevel::Warning => warn!("{}: {}", notice.title, notice.body),
            NoticeLevel::Error => error!("{}: {}", notice.title, notice.body),
        }
    }
}

/// Keeps every notice it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notice received so far, oldest first.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices().iter().filter(|n| n.level == level).count()
    }

    pub fn clear(&self) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(&Notice::warning("Storage full", "remove attachments"));
        notifier.notify(&Notice::success("Restored", "3 contacts"));

        assert_eq!(notifier.notices().len(), 2);
        assert_eq!(notifier.count(NoticeLevel::Warning), 1);
        notifier.clear();
        assert!(notifier.notices().is_empty());
    }

    #[test]
    fn test_desktop_notifier_in_tests_is_silent() {
        DesktopNotifier.notify(&Notice::info("hello", "world"));
    }

    #[test]
    fn test_notice_constructors() {
        let n = Notice::error("Restore failed", "bad json");
        assert_eq!(n.level, NoticeLevel::Error);
        assert_eq!(n.title, "Restore failed");
    }
}
