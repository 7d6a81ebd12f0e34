//! Snapshot comparison.
//!
//! Only additions are reported: a URL that disappears from a sitemap is not
//! surfaced anywhere.

use crate::models::{Snapshot, UrlCollection};

/// URLs in `current` that were not in `previous`.
///
/// A missing or empty `previous` means `current` is a baseline and nothing
/// counts as new.
pub fn new_urls(current: &UrlCollection, previous: Option<&UrlCollection>) -> UrlCollection {
    match previous {
        Some(previous) if !previous.is_empty() => current
            .iter()
            .filter(|url| !previous.contains(url))
            .collect(),
        _ => UrlCollection::new(),
    }
}

/// The snapshot that precedes `id` for the same site root: the latest one
/// with an earlier creation time, ties broken by id.
///
/// `history` may be in any order and may contain other sites.
pub fn previous_snapshot(history: &[Snapshot], id: i64) -> Option<&Snapshot> {
    let target = history.iter().find(|s| s.id == id)?;
    let key = (target.created_at, target.id);

    history
        .iter()
        .filter(|s| s.site_root == target.site_root && (s.created_at, s.id) < key)
        .max_by_key(|s| (s.created_at, s.id))
}
