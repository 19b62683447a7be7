//! Backup export, import and auto-backup commands.

use std::path::PathBuf;

use chrono::Local;
use clap::Subcommand;
use console::style;

use jb_core::error::JbResult;
use jb_services::coordinator::RestoreOutcome;
use jb_services::export::DirectoryExportSink;

use super::{format_bytes, print_json};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum BackupAction {
    /// Export everything, attachments included, to a dated JSON file.
    Export {
        /// Directory to write into (defaults to the configured export directory).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Replace all data with the contents of a backup file.
    Import {
        /// Backup file to import.
        path: PathBuf,
    },
    /// Show or change automatic crash-recovery snapshots.
    Auto {
        /// Turn auto-backup on or off; omit to show the current setting.
        #[arg(value_enum)]
        switch: Option<Switch>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Switch {
    On,
    Off,
}

pub async fn run(ctx: &Context, action: BackupAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        BackupAction::Export { dir } => {
            let sink = DirectoryExportSink::new(dir.unwrap_or_else(|| ctx.config.effective_export_dir()));
            let summary = coordinator.export_backup(&sink).await?;
            let path = sink.path_for(&summary.file_name);
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "path": path.display().to_string(),
                    "contacts": summary.contacts,
                    "files": summary.files,
                    "bytes": summary.bytes,
                }))?,
                OutputFormat::Text => println!(
                    "  {} Exported {} contact(s) and {} file(s) to {} ({})",
                    style("OK").green().bold(),
                    summary.contacts,
                    summary.files,
                    path.display(),
                    format_bytes(summary.bytes as u64)
                ),
            }
        }
        BackupAction::Import { path } => {
            let payload = std::fs::read_to_string(&path)?;
            match coordinator.restore(&payload, false).await? {
                RestoreOutcome::Applied { contacts, files } => match ctx.format {
                    OutputFormat::Json => print_json(&serde_json::json!({
                        "contacts": contacts,
                        "files": files,
                    }))?,
                    OutputFormat::Text => {
                        let files = files.map_or("kept existing".to_string(), |n| n.to_string());
                        println!("  Imported {contacts} contact(s); attachments: {files}.");
                    }
                },
                RestoreOutcome::Cancelled => println!("  Import cancelled."),
            }
        }
        BackupAction::Auto { switch } => {
            if let Some(switch) = switch {
                coordinator.toggle_auto_backup(matches!(switch, Switch::On))?;
            }
            let state = coordinator.state();
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "enabled": state.auto_backup_enabled,
                    "last": state.last_auto_backup.as_ref().map(|s| s.timestamp),
                }))?,
                OutputFormat::Text => {
                    let enabled = if state.auto_backup_enabled {
                        style("on").green().bold()
                    } else {
                        style("off").dim()
                    };
                    println!("  Auto-backup: {enabled}");
                    if let Some(last) = &state.last_auto_backup {
                        println!(
                            "  Last snapshot: {}",
                            last.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }
        }
    }

    super::close(coordinator)
}
