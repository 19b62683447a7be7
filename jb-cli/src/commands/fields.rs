//! Default custom field commands.

use clap::Subcommand;
use console::style;

use jb_core::error::JbResult;

use super::{new_table, print_json};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum FieldsAction {
    /// List the fields offered on new contacts.
    List,
    /// Offer a new field on new contacts.
    Add {
        /// Field label.
        label: String,
    },
    /// Stop offering a field.
    Delete {
        /// Field id.
        id: String,
    },
}

pub async fn run(ctx: &Context, action: FieldsAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        FieldsAction::List => {
            let fields = &coordinator.state().default_fields;
            match ctx.format {
                OutputFormat::Json => print_json(fields)?,
                OutputFormat::Text => {
                    if fields.is_empty() {
                        println!("No default fields.");
                    } else {
                        let mut table = new_table();
                        table.set_header(vec!["ID", "Label"]);
                        for field in fields {
                            table.add_row(vec![field.id.clone(), field.label.clone()]);
                        }
                        println!("{table}");
                    }
                }
            }
        }
        FieldsAction::Add { label } => {
            if coordinator.add_default_field(&label).await? {
                println!("  {} Added field \"{}\".", style("OK").green().bold(), label.trim());
            } else {
                println!(
                    "  {} \"{}\" is blank or already exists; nothing changed.",
                    style("SKIP").yellow().bold(),
                    label.trim()
                );
            }
        }
        FieldsAction::Delete { id } => {
            if coordinator.delete_default_field(&id).await? {
                println!("  {} Field {} deleted.", style("OK").green().bold(), id);
            } else {
                println!("  No field with id {id}.");
            }
        }
    }

    super::close(coordinator)
}
