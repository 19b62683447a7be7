//! Record identifiers.

/// Identifier of any JobBook record: contacts, custom fields, tickets,
/// parts, default fields and attachments.
pub type Id = String;

/// Generate a fresh identifier (UUID v4, hyphenated).
pub fn new_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}

/// Deserialize an identifier written either as a string or as a number.
///
/// Backups produced by older tools use millisecond timestamps as ids.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<Id, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match <RawId as serde::Deserialize>::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(n) => n.to_string(),
    })
}
