//! Business-wide settings: default custom-field labels and business details.

use serde::{Deserialize, Serialize};

use jb_core::constants::DEFAULT_FIELD_LABELS;

use crate::ids::{deserialize_id, new_id, Id};

/// A custom-field label offered for every contact.
///
/// Independent of the values any contact actually stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultFieldSetting {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    pub label: String,
}

impl DefaultFieldSetting {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
        }
    }

    /// The built-in set used on first run and when a backup omits it.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_FIELD_LABELS.iter().map(|l| Self::new(*l)).collect()
    }

    /// Whether this label equals `other` after trimming, ignoring case.
    pub fn same_label(&self, other: &str) -> bool {
        normalize_label(&self.label) == normalize_label(other)
    }
}

/// Canonical form used to compare labels.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Details printed on invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    /// Logo reference (usually a data URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl BusinessInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.address.is_empty()
            && self.phone.is_empty()
            && self.email.is_empty()
            && self.logo.is_none()
    }
}
