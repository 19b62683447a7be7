//! Job tickets, their parts, and invoice arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use jb_core::constants::ticket_status;
use jb_core::error::JbError;

use crate::ids::{deserialize_id, new_id, Id};

/// Workflow status of a job ticket. Serialized as its display string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    #[serde(rename = "Estimate Scheduled")]
    EstimateScheduled,
    #[serde(rename = "Quote Sent")]
    QuoteSent,
    #[serde(rename = "Scheduled")]
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Awaiting Parts")]
    AwaitingParts,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Paid")]
    Paid,
    #[serde(rename = "Declined")]
    Declined,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 8] = [
        TicketStatus::EstimateScheduled,
        TicketStatus::QuoteSent,
        TicketStatus::Scheduled,
        TicketStatus::InProgress,
        TicketStatus::AwaitingParts,
        TicketStatus::Completed,
        TicketStatus::Paid,
        TicketStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::EstimateScheduled => ticket_status::ESTIMATE_SCHEDULED,
            TicketStatus::QuoteSent => ticket_status::QUOTE_SENT,
            TicketStatus::Scheduled => ticket_status::SCHEDULED,
            TicketStatus::InProgress => ticket_status::IN_PROGRESS,
            TicketStatus::AwaitingParts => ticket_status::AWAITING_PARTS,
            TicketStatus::Completed => ticket_status::COMPLETED,
            TicketStatus::Paid => ticket_status::PAID,
            TicketStatus::Declined => ticket_status::DECLINED,
        }
    }

    /// Whether work on the ticket is finished (paid, completed or declined).
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            TicketStatus::Completed | TicketStatus::Paid | TicketStatus::Declined
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = JbError;

    /// Parses the display string, ignoring case, spaces, dashes and underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squash = |v: &str| -> String {
            v.chars()
                .filter(|c| !matches!(c, ' ' | '-' | '_'))
                .flat_map(char::to_lowercase)
                .collect()
        };
        let wanted = squash(s);
        TicketStatus::ALL
            .into_iter()
            .find(|status| squash(status.as_str()) == wanted)
            .ok_or_else(|| JbError::Validation(format!("unknown ticket status: {s}")))
    }
}

/// A part used on a job. `cost` is the line cost, not a unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub cost: f64,
}

impl Part {
    pub fn new(name: impl Into<String>, quantity: f64, cost: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            quantity,
            cost,
        }
    }
}

/// A unit of work for a contact, invoiced from its parts and labor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTicket {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub labor_cost: f64,
    /// Sales tax in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_tax_rate: Option<f64>,
    /// Card processing fee in percent, charged on the taxed subtotal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_fee_rate: Option<f64>,
}

/// Derived invoice amounts for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub parts_total: f64,
    pub labor_cost: f64,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub fee_amount: f64,
    pub total: f64,
}

impl JobTicket {
    /// Create an empty ticket dated `date` in the initial status.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            date: date.into(),
            status: TicketStatus::default(),
            notes: String::new(),
            parts: Vec::new(),
            labor_cost: 0.0,
            sales_tax_rate: None,
            processing_fee_rate: None,
        }
    }

    /// Compute invoice totals.
    ///
    /// The processing fee applies to the subtotal plus tax. Missing rates
    /// count as zero.
    pub fn totals(&self) -> InvoiceTotals {
        let parts_total: f64 = self.parts.iter().map(|p| p.cost).sum();
        let subtotal = parts_total + self.labor_cost;
        let tax_amount = subtotal * self.sales_tax_rate.unwrap_or(0.0) / 100.0;
        let fee_amount = (subtotal + tax_amount) * self.processing_fee_rate.unwrap_or(0.0) / 100.0;
        InvoiceTotals {
            parts_total,
            labor_cost: self.labor_cost,
            subtotal,
            tax_amount,
            fee_amount,
            total: subtotal + tax_amount + fee_amount,
        }
    }

    /// First part id that appears more than once, if any.
    pub fn duplicate_part_id(&self) -> Option<&str> {
        super::first_duplicate(self.parts.iter().map(|p| p.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(cost: f64) -> Part {
        Part::new("part", 1.0, cost)
    }

    #[test]
    fn test_invoice_totals_fee_on_taxed_subtotal() {
        let mut ticket = JobTicket::new("2024-03-01");
        ticket.parts = vec![part(100.0), part(50.0)];
        ticket.labor_cost = 75.0;
        ticket.sales_tax_rate = Some(10.0);
        ticket.processing_fee_rate = Some(5.0);

        let t = ticket.totals();
        assert_eq!(t.parts_total, 150.0);
        assert_eq!(t.subtotal, 225.0);
        assert!((t.tax_amount - 22.5).abs() < 1e-9);
        assert!((t.fee_amount - 12.375).abs() < 1e-9);
        assert!((t.total - 259.875).abs() < 1e-9);
    }

    #[test]
    fn test_missing_rates_are_zero() {
        let mut ticket = JobTicket::new("");
        ticket.parts = vec![part(10.0)];
        ticket.labor_cost = 5.0;
        let t = ticket.totals();
        assert_eq!(t.tax_amount, 0.0);
        assert_eq!(t.fee_amount, 0.0);
        assert_eq!(t.total, 15.0);
    }

    #[test]
    fn test_status_serializes_as_display_string() {
        let json = serde_json::to_string(&TicketStatus::AwaitingParts).unwrap();
        assert_eq!(json, "\"Awaiting Parts\"");
        let parsed: TicketStatus = serde_json::from_str("\"Quote Sent\"").unwrap();
        assert_eq!(parsed, TicketStatus::QuoteSent);
    }

    #[test]
    fn test_status_from_str_is_lenient() {
        assert_eq!("in-progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!("PAID".parse::<TicketStatus>().unwrap(), TicketStatus::Paid);
        assert!("lost".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_ticket_json_shape() {
        let json = r#"{
            "id": 17,
            "date": "2024-01-02",
            "status": "Completed",
            "notes": "replaced valve",
            "parts": [{"id": "p1", "name": "valve", "quantity": 2, "cost": 30}],
            "laborCost": 40,
            "salesTaxRate": 8.25
        }"#;
        let ticket: JobTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.id, "17");
        assert_eq!(ticket.status, TicketStatus::Completed);
        assert_eq!(ticket.processing_fee_rate, None);
        assert_eq!(ticket.totals().subtotal, 70.0);
    }

    #[test]
    fn test_duplicate_part_id() {
        let mut ticket = JobTicket::new("");
        let p = part(1.0);
        ticket.parts = vec![p.clone(), part(2.0), p];
        assert!(ticket.duplicate_part_id().is_some());
    }
}
