//! Entity model definitions.

pub mod app_state;
pub mod attachment;
pub mod contact;
pub mod document;
pub mod job_ticket;
pub mod settings;

/// First value yielded more than once, if any.
pub(crate) fn first_duplicate<'a>(ids: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
