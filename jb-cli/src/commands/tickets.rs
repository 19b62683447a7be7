//! Job ticket and invoice commands.

use chrono::Local;
use clap::Subcommand;
use console::style;

use jb_core::error::{JbError, JbResult};
use jb_models::{Contact, JobTicket, Part, TicketStatus};

use super::{new_table, or_dash, print_json};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum TicketsAction {
    /// List a contact's job tickets.
    List {
        /// Contact id.
        contact_id: String,
    },
    /// Open a new job ticket.
    Add {
        /// Contact id.
        contact_id: String,
        /// Job date (YYYY-MM-DD, defaults to today).
        #[arg(long)]
        date: Option<String>,
        /// Initial status.
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
        /// Part as NAME:COST or NAME:QUANTITY:COST, cost being the line total (repeatable).
        #[arg(long = "part")]
        parts: Vec<String>,
        #[arg(long, default_value_t = 0.0)]
        labor: f64,
        /// Sales tax rate in percent.
        #[arg(long)]
        tax: Option<f64>,
        /// Card processing fee rate in percent.
        #[arg(long)]
        fee: Option<f64>,
    },
    /// Change fields of an existing ticket.
    Set {
        /// Contact id.
        contact_id: String,
        /// Ticket id.
        ticket_id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Append a part as NAME:COST or NAME:QUANTITY:COST (repeatable).
        #[arg(long = "part")]
        parts: Vec<String>,
        /// Remove the part with this id (repeatable).
        #[arg(long = "remove-part")]
        remove_parts: Vec<String>,
        #[arg(long)]
        labor: Option<f64>,
        #[arg(long)]
        tax: Option<f64>,
        #[arg(long)]
        fee: Option<f64>,
    },
    /// Delete a job ticket.
    Remove {
        /// Contact id.
        contact_id: String,
        /// Ticket id.
        ticket_id: String,
    },
    /// Print an invoice for a ticket.
    Invoice {
        /// Contact id.
        contact_id: String,
        /// Ticket id.
        ticket_id: String,
    },
}

pub async fn run(ctx: &Context, action: TicketsAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        TicketsAction::List { contact_id } => {
            let contact = find_contact(coordinator.contact(&contact_id), &contact_id)?;
            match ctx.format {
                OutputFormat::Json => {
                    let json: Vec<_> = contact
                        .job_tickets
                        .iter()
                        .map(|t| serde_json::json!({ "ticket": t, "totals": t.totals() }))
                        .collect();
                    print_json(&json)?;
                }
                OutputFormat::Text => {
                    if contact.job_tickets.is_empty() {
                        println!("No job tickets for {}.", or_dash(&contact.name));
                    } else {
                        let mut table = new_table();
                        table.set_header(vec!["ID", "Date", "Status", "Parts", "Labor", "Total"]);
                        for t in &contact.job_tickets {
                            let totals = t.totals();
                            let status = if t.status.is_closed() {
                                style(t.status.to_string()).dim().to_string()
                            } else {
                                t.status.to_string()
                            };
                            table.add_row(vec![
                                t.id.clone(),
                                t.date.clone(),
                                status,
                                t.parts.len().to_string(),
                                ctx.config.display.format_money(t.labor_cost),
                                ctx.config.display.format_money(totals.total),
                            ]);
                        }
                        println!("{table}");
                    }
                }
            }
        }
        TicketsAction::Add { contact_id, date, status, notes, parts, labor, tax, fee } => {
            let contact = find_contact(coordinator.contact(&contact_id), &contact_id)?;
            let mut ticket = JobTicket::new(date.unwrap_or_else(today));
            if let Some(status) = status {
                ticket.status = status.parse()?;
            }
            ticket.notes = notes;
            ticket.labor_cost = labor;
            ticket.sales_tax_rate = tax;
            ticket.processing_fee_rate = fee;
            for arg in &parts {
                ticket.parts.push(parse_part(arg)?);
            }

            let ticket_id = ticket.id.clone();
            let mut tickets = contact.job_tickets.clone();
            tickets.push(ticket);
            coordinator.update_job_tickets(&contact_id, tickets).await?;
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": ticket_id }))?,
                OutputFormat::Text => println!(
                    "  {} Opened ticket {}.",
                    style("OK").green().bold(),
                    style(&ticket_id).cyan()
                ),
            }
        }
        TicketsAction::Set {
            contact_id,
            ticket_id,
            date,
            status,
            notes,
            parts,
            remove_parts,
            labor,
            tax,
            fee,
        } => {
            let contact = find_contact(coordinator.contact(&contact_id), &contact_id)?;
            let mut tickets = contact.job_tickets.clone();
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == ticket_id)
                .ok_or_else(|| JbError::Validation(format!("no ticket {ticket_id} on contact {contact_id}")))?;

            if let Some(date) = date {
                ticket.date = date;
            }
            if let Some(status) = status {
                ticket.status = status.parse::<TicketStatus>()?;
            }
            if let Some(notes) = notes {
                ticket.notes = notes;
            }
            if let Some(labor) = labor {
                ticket.labor_cost = labor;
            }
            if tax.is_some() {
                ticket.sales_tax_rate = tax;
            }
            if fee.is_some() {
                ticket.processing_fee_rate = fee;
            }
            ticket.parts.retain(|p| !remove_parts.contains(&p.id));
            for arg in &parts {
                ticket.parts.push(parse_part(arg)?);
            }

            coordinator.update_job_tickets(&contact_id, tickets).await?;
            println!("  {} Ticket {} updated.", style("OK").green().bold(), style(&ticket_id).cyan());
        }
        TicketsAction::Remove { contact_id, ticket_id } => {
            let contact = find_contact(coordinator.contact(&contact_id), &contact_id)?;
            let mut tickets = contact.job_tickets.clone();
            let before = tickets.len();
            tickets.retain(|t| t.id != ticket_id);
            if tickets.len() == before {
                return Err(JbError::Validation(format!("no ticket {ticket_id} on contact {contact_id}")));
            }
            coordinator.update_job_tickets(&contact_id, tickets).await?;
            println!("  {} Ticket {} removed.", style("OK").green().bold(), style(&ticket_id).cyan());
        }
        TicketsAction::Invoice { contact_id, ticket_id } => {
            let contact = find_contact(coordinator.contact(&contact_id), &contact_id)?;
            let ticket = contact
                .ticket(&ticket_id)
                .ok_or_else(|| JbError::Validation(format!("no ticket {ticket_id} on contact {contact_id}")))?;
            match ctx.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "business": coordinator.state().business_info,
                    "customer": { "name": contact.name, "email": contact.email,
                                  "phone": contact.phone, "address": contact.address },
                    "ticket": ticket,
                    "totals": ticket.totals(),
                }))?,
                OutputFormat::Text => print_invoice(ctx, coordinator.state(), contact, ticket),
            }
        }
    }

    super::close(coordinator)
}

fn find_contact<'a>(contact: Option<&'a Contact>, id: &str) -> JbResult<&'a Contact> {
    contact.ok_or_else(|| JbError::ContactNotFound(id.to_string()))
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Parse `NAME:COST` or `NAME:QUANTITY:COST`. The name may contain colons.
fn parse_part(arg: &str) -> JbResult<Part> {
    let invalid = || JbError::Validation(format!("expected NAME:COST or NAME:QUANTITY:COST, got \"{arg}\""));
    let number = |s: &str| s.trim().parse::<f64>().map_err(|_| invalid());

    let (rest, cost) = arg.rsplit_once(':').ok_or_else(invalid)?;
    let cost = number(cost)?;
    let (name, quantity) = match rest.rsplit_once(':') {
        Some((name, qty)) if qty.trim().parse::<f64>().is_ok() => (name, number(qty)?),
        _ => (rest, 1.0),
    };
    if name.trim().is_empty() {
        return Err(invalid());
    }
    Ok(Part::new(name.trim(), quantity, cost))
}

fn print_invoice(ctx: &Context, state: &jb_models::AppState, contact: &Contact, ticket: &JobTicket) {
    let money = |v: f64| ctx.config.display.format_money(v);
    let business = &state.business_info;

    if !business.is_empty() {
        println!("{}", style(or_dash(&business.name)).bold());
        for line in [&business.address, &business.phone, &business.email] {
            if !line.trim().is_empty() {
                println!("{line}");
            }
        }
        println!();
    }

    println!("{}", style("INVOICE").bold().underlined());
    println!("  Ticket:   {}", ticket.id);
    println!("  Date:     {}", or_dash(&ticket.date));
    println!("  Status:   {}", ticket.status);
    println!("  Bill to:  {}", or_dash(&contact.name));
    if !contact.address.trim().is_empty() {
        println!("            {}", contact.address);
    }
    if !ticket.notes.trim().is_empty() {
        println!("  Notes:    {}", ticket.notes);
    }
    println!();

    let totals = ticket.totals();
    let mut table = new_table();
    table.set_header(vec!["Item", "Qty", "Amount"]);
    for part in &ticket.parts {
        table.add_row(vec![part.name.clone(), format!("{}", part.quantity), money(part.cost)]);
    }
    table.add_row(vec!["Labor".to_string(), String::new(), money(totals.labor_cost)]);
    println!("{table}");

    println!("  {:<22} {:>12}", "Subtotal", money(totals.subtotal));
    if let Some(rate) = ticket.sales_tax_rate {
        println!("  {:<22} {:>12}", format!("Sales tax ({rate}%)"), money(totals.tax_amount));
    }
    if let Some(rate) = ticket.processing_fee_rate {
        println!("  {:<22} {:>12}", format!("Processing fee ({rate}%)"), money(totals.fee_amount));
    }
    println!("  {:<22} {:>12}", style("Total").bold(), style(money(totals.total)).bold());
}
