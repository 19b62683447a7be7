//! Terminal implementations of the coordinator's prompt and notice seams.

use console::{style, Term};
use dialoguer::Confirm;
use tracing::warn;

use jb_services::notification::{DesktopNotifier, Notice, NoticeLevel, Notifier};
use jb_services::prompt::Prompter;

/// Asks on the terminal, or answers yes without asking under `--yes`.
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !Term::stderr().is_term() {
            warn!("no terminal to confirm \"{question}\"; pass --yes to proceed");
            return false;
        }
        Confirm::new()
            .with_prompt(format!("  {question}"))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Prints notices to stderr, and optionally mirrors warnings and errors
/// as desktop notifications.
#[derive(Default)]
pub struct ConsoleNotifier {
    desktop: Option<DesktopNotifier>,
}

impl ConsoleNotifier {
    pub fn new(desktop: bool) -> Self {
        Self {
            desktop: desktop.then_some(DesktopNotifier),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: &Notice) {
        if let Some(desktop) = &self.desktop {
            if matches!(notice.level, NoticeLevel::Warning | NoticeLevel::Error) {
                desktop.notify(notice);
            }
        }
        let tag = match notice.level {
            NoticeLevel::Info => style("INFO").cyan().bold(),
            NoticeLevel::Success => style("OK").green().bold(),
            NoticeLevel::Warning => style("WARN").yellow().bold(),
            NoticeLevel::Error => style("FAIL").red().bold(),
        };
        eprintln!("  {} {}: {}", tag, style(&notice.title).bold(), notice.body);
    }
}
