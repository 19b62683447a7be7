//! Contact commands.

use std::path::PathBuf;

use chrono::Local;
use clap::Subcommand;
use console::style;

use jb_core::error::{JbError, JbResult};
use jb_models::{Contact, ContactDraft, CustomField, FileAttachment};

use super::{new_table, or_dash, parse_field, print_json, read_attachment, set_field, truncate};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum ContactsAction {
    /// List all contacts, newest first.
    List {
        /// Maximum number of contacts to display.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show one contact with its fields, tickets and files.
    Show {
        /// Contact id.
        id: String,
    },
    /// Search contacts by name, email, phone, address or field value.
    Search {
        /// Search query (case-insensitive substring).
        query: String,
    },
    /// Add a contact.
    Add {
        /// Contact name.
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
        /// Custom field as LABEL=VALUE (repeatable).
        #[arg(long = "field")]
        fields: Vec<String>,
        /// File to attach (repeatable).
        #[arg(long = "file")]
        files: Vec<PathBuf>,
        /// Image to use as the contact photo.
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Edit a contact's details.
    Edit {
        /// Contact id.
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        /// Set a custom field as LABEL=VALUE (repeatable).
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Remove the custom field with this label (repeatable).
        #[arg(long = "remove-field")]
        remove_fields: Vec<String>,
        /// Replace the contact photo with this image.
        #[arg(long, conflicts_with = "clear_photo")]
        photo: Option<PathBuf>,
        /// Remove the contact photo.
        #[arg(long)]
        clear_photo: bool,
    },
    /// Delete a contact and all of its attachments.
    Delete {
        /// Contact id.
        id: String,
    },
}

pub async fn run(ctx: &Context, action: ContactsAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        ContactsAction::List { limit } => {
            let contacts: Vec<&Contact> = coordinator
                .contacts()
                .iter()
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            print_contacts(&contacts, ctx.format, "No contacts yet. Add one with `jobbook contacts add NAME`.")?;
        }
        ContactsAction::Search { query } => {
            let results = coordinator.search_contacts(&query);
            if matches!(ctx.format, OutputFormat::Text) && !results.is_empty() {
                println!("{} result(s) for \"{}\":\n", results.len(), query);
            }
            print_contacts(&results, ctx.format, &format!("No contacts matching \"{query}\"."))?;
        }
        ContactsAction::Show { id } => {
            let contact = coordinator
                .contact(&id)
                .ok_or_else(|| JbError::ContactNotFound(id.clone()))?;
            match ctx.format {
                OutputFormat::Json => print_json(contact)?,
                OutputFormat::Text => print_contact_detail(ctx, contact),
            }
        }
        ContactsAction::Add { name, email, phone, address, fields, files, photo } => {
            let mut draft = ContactDraft::new(name);
            draft.email = email;
            draft.phone = phone;
            draft.address = address;
            draft.custom_fields = coordinator
                .state()
                .default_fields
                .iter()
                .map(|f| CustomField::new(f.label.clone(), ""))
                .collect();
            for arg in &fields {
                let (label, value) = parse_field(arg)?;
                set_field(&mut draft.custom_fields, &label, &value);
            }
            if let Some(path) = photo {
                draft.photo = Some(read_photo(&path)?);
            }
            for path in &files {
                draft.files.push(FileAttachment::from(read_attachment(path)?));
            }

            let id = coordinator.add_contact(draft).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id }))?,
                OutputFormat::Text => println!(
                    "  {} Added contact {} ({} file(s)).",
                    style("OK").green().bold(),
                    style(&id).cyan(),
                    files.len()
                ),
            }
        }
        ContactsAction::Edit {
            id,
            name,
            email,
            phone,
            address,
            fields,
            remove_fields,
            photo,
            clear_photo,
        } => {
            let contact = coordinator
                .contact(&id)
                .ok_or_else(|| JbError::ContactNotFound(id.clone()))?;
            let mut draft = ContactDraft::from(contact);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(email) = email {
                draft.email = email;
            }
            if let Some(phone) = phone {
                draft.phone = phone;
            }
            if let Some(address) = address {
                draft.address = address;
            }
            for arg in &fields {
                let (label, value) = parse_field(arg)?;
                set_field(&mut draft.custom_fields, &label, &value);
            }
            draft
                .custom_fields
                .retain(|f| !remove_fields.iter().any(|r| f.label.eq_ignore_ascii_case(r.trim())));
            if clear_photo {
                draft.photo = None;
            } else if let Some(path) = photo {
                draft.photo = Some(read_photo(&path)?);
            }

            coordinator.update_contact(&id, draft).await?;
            println!("  {} Contact {} updated.", style("OK").green().bold(), style(&id).cyan());
        }
        ContactsAction::Delete { id } => {
            if coordinator.delete_contact(&id).await? {
                println!("  {} Contact {} deleted.", style("OK").green().bold(), style(&id).cyan());
            } else {
                println!("  Delete cancelled.");
            }
        }
    }

    super::close(coordinator)
}

fn read_photo(path: &std::path::Path) -> JbResult<String> {
    let file = read_attachment(path)?;
    if !file.meta.is_image() {
        return Err(JbError::Validation(format!("{} is not an image", path.display())));
    }
    Ok(jb_models::models::attachment::encode_data_url(&file.meta.mime_type, &file.payload))
}

fn print_contacts(contacts: &[&Contact], format: OutputFormat, empty_message: &str) -> JbResult<()> {
    match format {
        OutputFormat::Json => print_json(contacts)?,
        OutputFormat::Text => {
            if contacts.is_empty() {
                println!("{empty_message}");
                return Ok(());
            }
            let mut table = new_table();
            table.set_header(vec!["ID", "Name", "Phone", "Email", "Tickets", "Files"]);
            for c in contacts {
                table.add_row(vec![
                    c.id.clone(),
                    truncate(&or_dash(&c.name), 30),
                    or_dash(&c.phone),
                    or_dash(&c.email),
                    c.job_tickets.len().to_string(),
                    c.files.len().to_string(),
                ]);
            }
            println!("{table}");
            println!("\n{} contact(s) shown", contacts.len());
        }
    }
    Ok(())
}

fn print_contact_detail(ctx: &Context, contact: &Contact) {
    println!(
        "{} {}",
        style(format!("[{}]", contact.initials())).dim(),
        style(or_dash(&contact.name)).bold().underlined()
    );
    println!("  ID:       {}", contact.id);
    println!("  Email:    {}", or_dash(&contact.email));
    println!("  Phone:    {}", or_dash(&contact.phone));
    println!("  Address:  {}", or_dash(&contact.address));
    println!(
        "  Created:  {}",
        contact.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if contact.photo.is_some() {
        println!("  Photo:    yes");
    }

    if !contact.custom_fields.is_empty() {
        println!();
        println!("{}", style("Fields").bold().underlined());
        for field in &contact.custom_fields {
            println!("  {:<16} {}", format!("{}:", field.label), or_dash(&field.value));
        }
    }

    if !contact.job_tickets.is_empty() {
        println!();
        println!("{}", style("Job Tickets").bold().underlined());
        let mut table = new_table();
        table.set_header(vec!["ID", "Date", "Status", "Total"]);
        for ticket in &contact.job_tickets {
            table.add_row(vec![
                ticket.id.clone(),
                ticket.date.clone(),
                ticket.status.to_string(),
                ctx.config.display.format_money(ticket.totals().total),
            ]);
        }
        println!("{table}");
    }

    if !contact.files.is_empty() {
        println!();
        println!("{}", style("Files").bold().underlined());
        let mut table = new_table();
        table.set_header(vec!["ID", "Name", "Type", "Size"]);
        for file in &contact.files {
            table.add_row(vec![
                file.id.clone(),
                truncate(&file.name, 40),
                or_dash(&file.mime_type),
                file.human_file_size(),
            ]);
        }
        println!("{table}");
    }
}
