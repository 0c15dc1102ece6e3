//! Sort stage for video entries.

use std::cmp::Ordering;

use crate::model::{MediaEntry, SortMode, SortOrder};

fn compare(a: &MediaEntry, b: &MediaEntry, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Title => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase()),
        SortMode::Length => a.duration_ms.cmp(&b.duration_ms),
        SortMode::Modified => a.modified_seconds.cmp(&b.modified_seconds),
    }
}

/// Stable in-place sort. Ties keep their input order in both directions.
pub fn sort_entries(entries: &mut [MediaEntry], mode: SortMode, order: SortOrder) {
    if entries.len() < 2 {
        return;
    }
    match order {
        SortOrder::Asc => entries.sort_by(|a, b| compare(a, b, mode)),
        SortOrder::Desc => entries.sort_by(|a, b| compare(b, a, mode)),
    }
}

/// Owned variant of [`sort_entries`].
#[must_use]
pub fn sorted(mut entries: Vec<MediaEntry>, mode: SortMode, order: SortOrder) -> Vec<MediaEntry> {
    sort_entries(&mut entries, mode, order);
    entries
}
