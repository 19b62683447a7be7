//! The aggregate application state and the backup document format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use jb_core::error::{JbError, JbResult};

use crate::models::attachment::StoredFile;
use crate::models::contact::Contact;
use crate::models::settings::{BusinessInfo, DefaultFieldSetting};

/// Most recent automatic backup recorded in the metadata document.
///
/// `data` is the backup JSON without attachment payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBackupStamp {
    pub timestamp: DateTime<Utc>,
    pub data: String,
}

/// Everything the metadata store persists, as one document.
///
/// Fields missing from an older document take their built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub contacts: Vec<Contact>,
    pub default_fields: Vec<DefaultFieldSetting>,
    pub business_info: BusinessInfo,
    pub auto_backup_enabled: bool,
    pub last_auto_backup: Option<AutoBackupStamp>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            default_fields: DefaultFieldSetting::defaults(),
            business_info: BusinessInfo::default(),
            auto_backup_enabled: false,
            last_auto_backup: None,
        }
    }
}

impl AppState {
    pub fn contact(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn contact_mut(&mut self, id: &str) -> Option<&mut Contact> {
        self.contacts.iter_mut().find(|c| c.id == id)
    }

    /// Ids of every attachment referenced by any contact.
    pub fn referenced_file_ids(&self) -> Vec<String> {
        self.contacts
            .iter()
            .flat_map(|c| c.files.iter().map(|f| f.id.clone()))
            .collect()
    }

    /// Backup document for this state, optionally carrying payloads.
    pub fn to_backup(&self, files: Option<Vec<StoredFile>>) -> BackupDocument {
        BackupDocument {
            contacts: self.contacts.clone(),
            default_fields: Some(self.default_fields.clone()),
            business_info: Some(self.business_info.clone()),
            files,
        }
    }
}

/// Portable backup format: metadata plus, optionally, every attachment
/// payload. Also the payload of recovery snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub contacts: Vec<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fields: Option<Vec<DefaultFieldSetting>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_info: Option<BusinessInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<StoredFile>>,
}

impl BackupDocument {
    /// Parse and validate a backup payload.
    ///
    /// Malformed JSON is a `ParseFailure`. Well-formed JSON without a
    /// `contacts` array, or whose records do not fit the model, is an
    /// `InvalidFormat`.
    pub fn parse(payload: &str) -> JbResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| JbError::ParseFailure(e.to_string()))?;

        match value.get("contacts") {
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => return Err(JbError::InvalidFormat("\"contacts\" is not an array".into())),
            None => return Err(JbError::InvalidFormat("missing \"contacts\" array".into())),
        }

        serde_json::from_value(value).map_err(|e| JbError::InvalidFormat(e.to_string()))
    }

    pub fn to_json(&self) -> JbResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> JbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Default fields, falling back to the built-in set.
    pub fn resolved_default_fields(&self) -> Vec<DefaultFieldSetting> {
        self.default_fields
            .clone()
            .unwrap_or_else(DefaultFieldSetting::defaults)
    }

    /// Business info, falling back to an empty record.
    pub fn resolved_business_info(&self) -> BusinessInfo {
        self.business_info.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::new_id;
    use crate::models::contact::ContactDraft;

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(state.contacts.is_empty());
        assert_eq!(state.default_fields.len(), 3);
        assert!(!state.auto_backup_enabled);
        assert!(state.last_auto_backup.is_none());
    }

    #[test]
    fn test_older_document_loads_with_defaults() {
        let state: AppState = serde_json::from_str(r#"{"contacts": []}"#).unwrap();
        assert_eq!(state.default_fields.len(), 3);
        assert_eq!(state.business_info, BusinessInfo::default());
        assert!(!state.auto_backup_enabled);
    }

    #[test]
    fn test_state_json_is_camel_case() {
        let mut state = AppState::default();
        state.last_auto_backup = Some(AutoBackupStamp {
            timestamp: Utc::now(),
            data: "{}".into(),
        });
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("defaultFields").is_some());
        assert!(json.get("autoBackupEnabled").is_some());
        assert!(json["lastAutoBackup"].get("timestamp").is_some());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(BackupDocument::parse("{not json"), Err(JbError::ParseFailure(_))));
    }

    #[test]
    fn test_parse_requires_contacts_array() {
        assert!(matches!(
            BackupDocument::parse(r#"{"defaultFields": []}"#),
            Err(JbError::InvalidFormat(_))
        ));
        assert!(matches!(
            BackupDocument::parse(r#"{"contacts": {"a": 1}}"#),
            Err(JbError::InvalidFormat(_))
        ));
        assert!(matches!(BackupDocument::parse("[]"), Err(JbError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_empty_contacts_is_valid() {
        let doc = BackupDocument::parse(r#"{"contacts": []}"#).unwrap();
        assert!(doc.contacts.is_empty());
        assert_eq!(doc.resolved_default_fields().len(), 3);
        assert!(doc.resolved_business_info().is_empty());
        assert!(doc.files.is_none());
    }

    #[test]
    fn test_backup_roundtrip_with_files() {
        let mut state = AppState::default();
        let file = StoredFile::new("plan.pdf", "application/pdf", vec![9, 8, 7]);
        let mut draft = ContactDraft::new("Ray");
        draft.files = vec![file.clone().into()];
        state.contacts.push(draft.into_contact(new_id(), Utc::now()));

        let doc = state.to_backup(Some(vec![file.clone()]));
        let json = doc.to_json_pretty().unwrap();
        let parsed = BackupDocument::parse(&json).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.files.unwrap()[0].payload, file.payload);
    }

    #[test]
    fn test_metadata_only_backup_omits_files() {
        let doc = AppState::default().to_backup(None);
        let json = doc.to_json().unwrap();
        assert!(!json.contains("\"files\""));
    }
}
