//! CLI command implementations.

pub mod contacts;
pub mod files;
pub mod tickets;
pub mod fields;
pub mod business;
pub mod backup;
pub mod recovery;
pub mod storage;

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde::Serialize;

use jb_core::error::{JbError, JbResult};
use jb_models::{CustomField, FileMeta, StoredFile};
use jb_services::coordinator::{PersistenceCoordinator, Stores};
use jb_services::event_bus::EventBus;
use jb_services::service::Service;

use crate::terminal::{ConsoleNotifier, TerminalPrompter};
use crate::Context;

/// Open the stores, start the coordinator and report a pending recovery.
pub fn open_coordinator(ctx: &Context) -> JbResult<PersistenceCoordinator> {
    let stores = if ctx.ephemeral {
        Stores::in_memory()
    } else {
        Stores::open(&ctx.config)?
    };
    let mut coordinator = PersistenceCoordinator::new(
        stores,
        Arc::new(TerminalPrompter::new(ctx.assume_yes)),
        Arc::new(ConsoleNotifier::new(ctx.desktop_notify)),
        EventBus::default(),
    )
    .with_auto_backup_on_first_run(ctx.config.backup.auto_backup_on_first_run);

    coordinator.init()?;
    if let Some(snapshot) = coordinator.pending_recovery() {
        eprintln!(
            "  {} Unsaved data from {} can be recovered. Run `jobbook recovery accept` or `jobbook recovery dismiss`.",
            style("!").yellow().bold(),
            snapshot.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
    Ok(coordinator)
}

/// Stop the coordinator at the end of a command.
pub fn close(mut coordinator: PersistenceCoordinator) -> JbResult<()> {
    coordinator.shutdown()
}

/// A table in the CLI's standard style.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> JbResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a file from disk as a new attachment.
pub fn read_attachment(path: &Path) -> JbResult<StoredFile> {
    let payload = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| JbError::Validation(format!("{} is not a file", path.display())))?;
    let mime = FileMeta::guess_mime(&name);
    Ok(StoredFile::new(name, mime, payload))
}

/// Parse a `Label=Value` argument.
pub fn parse_field(arg: &str) -> JbResult<(String, String)> {
    let (label, value) = arg
        .split_once('=')
        .ok_or_else(|| JbError::Validation(format!("expected LABEL=VALUE, got \"{arg}\"")))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(JbError::Validation(format!("empty field label in \"{arg}\"")));
    }
    Ok((label.to_string(), value.trim().to_string()))
}

/// Set a custom field by label, ignoring case, adding it if absent.
pub fn set_field(fields: &mut Vec<CustomField>, label: &str, value: &str) {
    match fields.iter_mut().find(|f| f.label.eq_ignore_ascii_case(label)) {
        Some(field) => field.value = value.to_string(),
        None => fields.push(CustomField::new(label, value)),
    }
}

/// "-" for empty cells.
pub fn or_dash(s: &str) -> String {
    if s.trim().is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars > 3 {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Müller Heating and Air", 10), "Müller ...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("Company = Northside HVAC").unwrap(),
            ("Company".to_string(), "Northside HVAC".to_string())
        );
        assert_eq!(parse_field("Notes=").unwrap().1, "");
        assert!(parse_field("no separator").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn test_set_field_ignores_case() {
        let mut fields = vec![CustomField::new("Company", "")];
        set_field(&mut fields, "company", "Acme");
        set_field(&mut fields, "Website", "acme.test");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].value, "Acme");
    }
}
