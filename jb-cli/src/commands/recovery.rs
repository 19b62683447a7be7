//! Crash-recovery commands.

use chrono::Local;
use clap::Subcommand;
use console::style;

use jb_core::error::JbResult;

use super::print_json;
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Show whether a recovery snapshot is waiting.
    Status,
    /// Apply the waiting snapshot, then discard it.
    Accept,
    /// Discard the waiting snapshot without applying it.
    Dismiss,
}

pub async fn run(ctx: &Context, action: RecoveryAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        RecoveryAction::Status => {
            let pending = coordinator.pending_recovery();
            let summary = pending.and_then(|s| s.document().ok()).map(|doc| {
                (doc.contacts.len(), doc.files.as_ref().map_or(0, Vec::len))
            });
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "pending": pending.is_some(),
                    "timestamp": pending.map(|s| s.timestamp),
                    "contacts": summary.map(|(c, _)| c),
                    "files": summary.map(|(_, f)| f),
                }))?,
                OutputFormat::Text => match (pending, summary) {
                    (Some(snapshot), summary) => {
                        println!(
                            "  Snapshot from {}",
                            snapshot.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                        );
                        match summary {
                            Some((contacts, files)) => {
                                println!("  {contacts} contact(s), {files} file(s)")
                            }
                            None => println!("  {} snapshot is unreadable", style("WARN").yellow().bold()),
                        }
                    }
                    (None, _) => println!("  No recovery snapshot pending."),
                },
            }
        }
        RecoveryAction::Accept => {
            if coordinator.accept_recovery().await? {
                println!(
                    "  {} Recovered {} contact(s).",
                    style("OK").green().bold(),
                    coordinator.contacts().len()
                );
            } else {
                println!("  No recovery snapshot pending.");
            }
        }
        RecoveryAction::Dismiss => {
            if coordinator.dismiss_recovery()? {
                println!("  {} Recovery snapshot discarded.", style("OK").green().bold());
            } else {
                println!("  No recovery snapshot pending.");
            }
        }
    }

    super::close(coordinator)
}
