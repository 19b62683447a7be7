//! Attachment commands.

use std::path::PathBuf;

use clap::Subcommand;
use console::style;

use jb_core::error::{JbError, JbResult};
use jb_models::FileAttachment;

use super::{format_bytes, new_table, or_dash, print_json, read_attachment, truncate};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum FilesAction {
    /// List a contact's attachments.
    List {
        /// Contact id.
        contact_id: String,
    },
    /// Attach files to a contact.
    Add {
        /// Contact id.
        contact_id: String,
        /// Files to attach.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove an attachment and delete its stored payload.
    Remove {
        /// Contact id.
        contact_id: String,
        /// File id.
        file_id: String,
    },
    /// Write an attachment's payload to disk.
    Get {
        /// Contact id.
        contact_id: String,
        /// File id.
        file_id: String,
        /// Output path (defaults to the original file name in the current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run(ctx: &Context, action: FilesAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        FilesAction::List { contact_id } => {
            let contact = coordinator
                .contact(&contact_id)
                .ok_or_else(|| JbError::ContactNotFound(contact_id.clone()))?;
            match ctx.format {
                OutputFormat::Json => print_json(&contact.files)?,
                OutputFormat::Text => {
                    if contact.files.is_empty() {
                        println!("No files attached to {}.", or_dash(&contact.name));
                    } else {
                        let mut table = new_table();
                        table.set_header(vec!["ID", "Name", "Type", "Size"]);
                        let mut total = 0;
                        for file in &contact.files {
                            total += file.size;
                            table.add_row(vec![
                                file.id.clone(),
                                truncate(&file.name, 40),
                                or_dash(&file.mime_type),
                                file.human_file_size(),
                            ]);
                        }
                        println!("{table}");
                        println!("\n{} file(s), {}", contact.files.len(), format_bytes(total));
                    }
                }
            }
        }
        FilesAction::Add { contact_id, paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(FileAttachment::from(read_attachment(path)?));
            }
            let added = coordinator.add_files_to_contact(&contact_id, files).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&added)?,
                OutputFormat::Text => {
                    for file in &added {
                        println!(
                            "  {} Attached {} ({}) as {}",
                            style("OK").green().bold(),
                            file.name,
                            file.human_file_size(),
                            style(&file.id).cyan()
                        );
                    }
                }
            }
        }
        FilesAction::Remove { contact_id, file_id } => {
            let removed = coordinator.remove_file_from_contact(&contact_id, &file_id).await?;
            println!("  {} Removed {}.", style("OK").green().bold(), removed.name);
        }
        FilesAction::Get { contact_id, file_id, output } => {
            let file = coordinator.attachment(&contact_id, &file_id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&file.meta.name));
            std::fs::write(&path, &file.payload)?;
            println!(
                "  {} Wrote {} to {}",
                style("OK").green().bold(),
                format_bytes(file.payload.len() as u64),
                path.display()
            );
        }
    }

    super::close(coordinator)
}
