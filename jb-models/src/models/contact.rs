//! Contact entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jb_core::error::{JbError, JbResult};

use crate::ids::{deserialize_id, new_id, Id};
use crate::models::attachment::{FileAttachment, FileMeta};
use crate::models::first_duplicate;
use crate::models::job_ticket::JobTicket;

/// A labelled free-text value on a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: String,
}

impl CustomField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A business contact as stored in the metadata document.
///
/// Attachments are held as references only; payloads live in the blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub job_tickets: Vec<JobTicket>,
    #[serde(default)]
    pub files: Vec<FileMeta>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied contact contents for add and update.
///
/// Files may still carry payloads; they are committed to the blob store
/// before the contact is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub job_tickets: Vec<JobTicket>,
    pub files: Vec<FileAttachment>,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check nested ids are unique within their collections.
    pub fn validate(&self) -> JbResult<()> {
        check_nested_ids(
            &self.custom_fields,
            &self.job_tickets,
            self.files.iter().map(|f| f.id()),
        )
    }

    /// Build the stored contact, keeping `id` and `created_at`.
    pub fn into_contact(self, id: Id, created_at: DateTime<Utc>) -> Contact {
        Contact {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            photo: self.photo,
            custom_fields: self.custom_fields,
            job_tickets: self.job_tickets,
            files: self.files.into_iter().map(FileAttachment::into_meta).collect(),
            created_at,
        }
    }
}

impl From<&Contact> for ContactDraft {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            photo: contact.photo.clone(),
            custom_fields: contact.custom_fields.clone(),
            job_tickets: contact.job_tickets.clone(),
            files: contact.files.iter().cloned().map(FileAttachment::from).collect(),
        }
    }
}

impl Contact {
    /// Ids of every attachment this contact references.
    pub fn file_ids(&self) -> Vec<Id> {
        self.files.iter().map(|f| f.id.clone()).collect()
    }

    pub fn file(&self, file_id: &str) -> Option<&FileMeta> {
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn ticket(&self, ticket_id: &str) -> Option<&JobTicket> {
        self.job_tickets.iter().find(|t| t.id == ticket_id)
    }

    /// Value of the custom field with `label`, ignoring case.
    pub fn custom_field(&self, label: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(label))
            .map(|f| f.value.as_str())
    }

    /// Case-insensitive substring match on the searchable fields.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.name, &self.email, &self.phone, &self.address]
            .into_iter()
            .chain(self.custom_fields.iter().map(|f| &f.value))
            .any(|v| v.to_lowercase().contains(&needle))
    }

    /// Initials from the name, or "?" when it is blank.
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() {
            "?".to_string()
        } else {
            initials
        }
    }

    /// Check nested ids are unique within their collections.
    pub fn validate(&self) -> JbResult<()> {
        check_nested_ids(
            &self.custom_fields,
            &self.job_tickets,
            self.files.iter().map(|f| f.id.as_str()),
        )
    }
}

fn check_nested_ids<'a>(
    custom_fields: &[CustomField],
    tickets: &[JobTicket],
    file_ids: impl Iterator<Item = &'a str>,
) -> JbResult<()> {
    if let Some(id) = first_duplicate(custom_fields.iter().map(|f| f.id.as_str())) {
        return Err(JbError::Validation(format!("duplicate custom field id {id}")));
    }
    validate_tickets(tickets)?;
    if let Some(id) = first_duplicate(file_ids) {
        return Err(JbError::Validation(format!("duplicate file id {id}")));
    }
    Ok(())
}

/// Check ticket ids, and part ids within each ticket, are unique.
pub fn validate_tickets(tickets: &[JobTicket]) -> JbResult<()> {
    if let Some(id) = first_duplicate(tickets.iter().map(|t| t.id.as_str())) {
        return Err(JbError::Validation(format!("duplicate job ticket id {id}")));
    }
    for ticket in tickets {
        if let Some(id) = ticket.duplicate_part_id() {
            return Err(JbError::Validation(format!(
                "duplicate part id {id} on ticket {}",
                ticket.id
            )));
        }
    }
    Ok(())
}
