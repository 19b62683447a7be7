//! Storage usage and location commands.

use clap::Subcommand;
use console::style;

use jb_core::error::JbResult;

use super::{format_bytes, new_table, print_json};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum StorageAction {
    /// Show how much space the stores use.
    Stats,
    /// Show where data, logs, recovery snapshots and exports live.
    Path,
}

pub async fn run(ctx: &Context, action: StorageAction) -> JbResult<()> {
    match action {
        StorageAction::Stats => {
            let coordinator = super::open_coordinator(ctx)?;
            let usage = coordinator.storage_usage().await?;
            let quota = ctx.config.storage.metadata_quota_bytes;
            let state = coordinator.state();

            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "contacts": state.contacts.len(),
                    "metadata_bytes": usage.metadata_bytes,
                    "metadata_quota_bytes": (quota > 0).then_some(quota),
                    "blob_count": usage.blobs.count,
                    "blob_bytes": usage.blobs.bytes,
                    "auto_backup": state.auto_backup_enabled,
                }))?,
                OutputFormat::Text => {
                    println!("{}", style("Storage").bold().underlined());
                    let mut table = new_table();
                    table.set_header(vec!["Store", "Entries", "Size"]);
                    table.add_row(vec![
                        "Metadata document".to_string(),
                        format!("{} contact(s)", state.contacts.len()),
                        format_bytes(usage.metadata_bytes),
                    ]);
                    table.add_row(vec![
                        "Attachments".to_string(),
                        usage.blobs.count.to_string(),
                        format_bytes(usage.blobs.bytes),
                    ]);
                    println!("{table}");

                    if quota > 0 {
                        let pct = usage.metadata_bytes as f64 / quota as f64 * 100.0;
                        let line = format!("  Metadata quota: {} of {} ({pct:.0}%)", format_bytes(usage.metadata_bytes), format_bytes(quota));
                        if pct >= 90.0 {
                            println!("{}", style(line).yellow());
                        } else {
                            println!("{line}");
                        }
                    }
                    if ctx.ephemeral {
                        println!("  {}", style("(ephemeral run: nothing is written to disk)").dim());
                    }
                }
            }
            super::close(coordinator)?;
        }
        StorageAction::Path => {
            let config = &ctx.config;
            let paths = [
                ("Metadata", config.effective_metadata_path()?),
                ("Attachments", config.effective_blob_path()?),
                ("Logs", config.effective_log_dir()?),
                ("Recovery", config.effective_session_dir()),
                ("Exports", config.effective_export_dir()),
            ];
            match ctx.format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = paths
                        .iter()
                        .map(|(k, p)| (k.to_lowercase(), p.display().to_string().into()))
                        .collect();
                    print_json(&map)?;
                }
                OutputFormat::Text => {
                    for (label, path) in &paths {
                        let marker = if path.exists() { style("*").green() } else { style("-").dim() };
                        println!("  {marker} {:<12} {}", label, path.display());
                    }
                }
            }
        }
    }

    Ok(())
}
