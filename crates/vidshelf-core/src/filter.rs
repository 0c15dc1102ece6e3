//! Exclusion filters.
//!
//! Two independent stages run over a freshly queried entry set, in this
//! order:
//!
//! 1. the scope filter keeps only entries whose bucket the user selected
//!    (or everything when the scope is unrestricted);
//! 2. the hidden-folder filter drops entries under any directory holding a
//!    `.nomedia` marker. Marker lookups run once per volume present in the
//!    scope-filtered set.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::index::{Column, IndexQueryAdapter, Selection};
use crate::model::MediaEntry;
use crate::volume_path::{PRIMARY_VOLUME, normalize};

/// File name that hides its directory and everything below it.
pub const NOMEDIA_MARKER: &str = ".nomedia";

/// Which buckets the user wants to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    /// Ignore `allowed` and keep every bucket.
    pub use_all: bool,
    /// Allowed bucket ids.
    #[serde(default)]
    pub allowed: BTreeSet<String>,
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::all()
    }
}

impl SearchScope {
    /// Unrestricted scope.
    #[must_use]
    pub fn all() -> Self {
        Self {
            use_all: true,
            allowed: BTreeSet::new(),
        }
    }

    /// Scope restricted to the given buckets.
    pub fn only<I, S>(bucket_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            use_all: false,
            allowed: bucket_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether an entry in `bucket_id` passes the scope.
    #[must_use]
    pub fn allows(&self, bucket_id: &str) -> bool {
        self.use_all || (!bucket_id.is_empty() && self.allowed.contains(bucket_id))
    }

    /// Short stable identifier of this scope for cache keys: `all`, `none`,
    /// or the SHA-256 of the sorted, pipe-joined bucket ids.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        if self.use_all {
            return "all".to_string();
        }
        if self.allowed.is_empty() {
            return "none".to_string();
        }
        let joined = self
            .allowed
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Both exclusion settings together, as read from user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSettings {
    /// Run the hidden-folder filter.
    pub nomedia_enabled: bool,
    /// Bucket scope.
    pub scope: SearchScope,
}

impl ExclusionSettings {
    /// Scope fingerprint used in cache keys.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.scope.fingerprint()
    }
}

/// Keep the entries whose bucket passes `scope`.
///
/// With an unrestricted scope the input comes back unchanged. With a
/// restricted scope an empty allow-list yields nothing, and entries without
/// a bucket id are always dropped.
#[must_use]
pub fn apply_scope(entries: Vec<MediaEntry>, scope: &SearchScope) -> Vec<MediaEntry> {
    if scope.use_all {
        return entries;
    }
    if scope.allowed.is_empty() || entries.is_empty() {
        return Vec::new();
    }
    entries
        .into_iter()
        .filter(|entry| scope.allows(&entry.bucket_id))
        .collect()
}

/// Per-volume set of directories hidden by a marker file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenFolders {
    by_volume: HashMap<String, BTreeSet<String>>,
}

impl HiddenFolders {
    /// No hidden folders. Used when the filter is switched off.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Look up marker files on every volume present in `entries`, or on the
    /// primary volume when `entries` is empty. Issues one query per volume.
    #[must_use]
    pub fn build(adapter: &IndexQueryAdapter<'_>, entries: &[MediaEntry]) -> Self {
        let mut volumes: BTreeSet<&str> = entries.iter().map(|e| e.volume.as_str()).collect();
        if volumes.is_empty() {
            volumes.insert(PRIMARY_VOLUME);
        }

        let mut hidden = Self::none();
        for volume in volumes {
            let rows = adapter.query_files(
                volume,
                vec![Column::RelativePath],
                Selection::DisplayNameEquals(NOMEDIA_MARKER.to_string()),
            );
            for row in rows {
                hidden.insert(volume, &row.text(Column::RelativePath).unwrap_or_default());
            }
        }
        debug!("Hidden folder index built: {} prefixes", hidden.len());
        hidden
    }

    /// Record `relative_path` on `volume` as hidden. Empty paths are ignored.
    pub fn insert(&mut self, volume: &str, relative_path: &str) {
        let normalized = normalize(relative_path);
        if normalized.is_empty() {
            return;
        }
        self.by_volume
            .entry(volume.to_string())
            .or_default()
            .insert(normalized);
    }

    /// Whether `relative_path` on `volume` lies at or below a hidden folder.
    #[must_use]
    pub fn is_blocked(&self, volume: &str, relative_path: &str) -> bool {
        if relative_path.is_empty() {
            return false;
        }
        self.by_volume.get(volume).is_some_and(|prefixes| {
            prefixes
                .iter()
                .any(|prefix| relative_path.starts_with(prefix.as_str()))
        })
    }

    /// Drop entries that lie under a hidden folder.
    #[must_use]
    pub fn filter(&self, entries: Vec<MediaEntry>) -> Vec<MediaEntry> {
        if self.is_empty() {
            return entries;
        }
        entries
            .into_iter()
            .filter(|entry| !self.is_blocked(&entry.volume, &entry.relative_path))
            .collect()
    }

    /// Total number of hidden prefixes across volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_volume.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing is hidden.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the scope filter and then, if enabled, the hidden-folder filter.
///
/// Returns the surviving entries together with the hidden-folder index so
/// the hierarchy stage can also hide child directories.
#[must_use]
pub fn apply_exclusions(
    adapter: &IndexQueryAdapter<'_>,
    entries: Vec<MediaEntry>,
    settings: &ExclusionSettings,
) -> (Vec<MediaEntry>, HiddenFolders) {
    let scoped = apply_scope(entries, &settings.scope);
    if !settings.nomedia_enabled {
        return (scoped, HiddenFolders::none());
    }
    let hidden = HiddenFolders::build(adapter, &scoped);
    let visible = hidden.filter(scoped);
    (visible, hidden)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::index::VideoFilter;
    use crate::index::testing::MemoryIndex;

    fn entry(bucket: &str, volume: &str, path: &str) -> MediaEntry {
        MediaEntry {
            id: 1,
            display_name: "v.mp4".to_string(),
            bucket_id: bucket.to_string(),
            bucket_name: String::new(),
            duration_ms: 0,
            width: 0,
            height: 0,
            frame_rate: 0.0,
            size_bytes: 0,
            modified_seconds: 0,
            volume: volume.to_string(),
            relative_path: path.to_string(),
            has_subtitle: false,
            content_uri: String::new(),
        }
    }

    #[test]
    fn test_scope_use_all_passes_through() {
        let entries = vec![entry("x", "v", "A/"), entry("", "v", "B/")];
        assert_eq!(apply_scope(entries.clone(), &SearchScope::all()), entries);
    }

    #[test]
    fn test_scope_empty_allow_list_is_empty() {
        let entries = vec![entry("x", "v", "A/")];
        let scope = SearchScope::only(Vec::<String>::new());
        assert!(apply_scope(entries, &scope).is_empty());
    }

    #[test]
    fn test_scope_keeps_only_allowed_buckets() {
        let entries = vec![
            entry("x", "v", "A/"),
            entry("y", "v", "B/"),
            entry("", "v", "C/"),
        ];
        let scope = SearchScope::only(["x"]);
        let kept = apply_scope(entries, &scope);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bucket_id, "x");
    }

    #[test]
    fn test_scope_is_idempotent() {
        let entries = vec![
            entry("x", "v", "A/"),
            entry("y", "v", "B/"),
            entry("z", "v", "C/"),
        ];
        let scope = SearchScope::only(["x", "z"]);
        let once = apply_scope(entries, &scope);
        let twice = apply_scope(once.clone(), &scope);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(SearchScope::all().fingerprint(), "all");
        assert_eq!(SearchScope::only(Vec::<String>::new()).fingerprint(), "none");

        let a = SearchScope::only(["b", "a"]).fingerprint();
        let b = SearchScope::only(["a", "b"]).fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, SearchScope::only(["a"]).fingerprint());
    }

    #[test]
    fn test_hidden_folder_blocks_descendants() {
        let mut hidden = HiddenFolders::none();
        hidden.insert("v", "Private");
        assert!(hidden.is_blocked("v", "Private/"));
        assert!(hidden.is_blocked("v", "Private/Deep/"));
        assert!(!hidden.is_blocked("v", "Public/"));
        assert!(!hidden.is_blocked("other", "Private/"));
        assert!(!hidden.is_blocked("v", ""));
    }

    #[test]
    fn test_hidden_folder_prefix_is_segment_aligned() {
        let mut hidden = HiddenFolders::none();
        hidden.insert("v", "Priv/");
        assert!(!hidden.is_blocked("v", "Private/"));
    }

    #[test]
    fn test_build_queries_once_per_volume() {
        let index = MemoryIndex::new()
            .video("a", "Movies/x.mp4")
            .video("a", "Secret/y.mp4")
            .file("a", "Secret/.nomedia")
            .video("b", "Clips/z.mp4");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();

        let hidden = HiddenFolders::build(&adapter, &entries);

        assert_eq!(index.file_queries().len(), 2);
        assert!(hidden.is_blocked("a", "Secret/"));
        assert_eq!(hidden.len(), 1);
    }

    #[test]
    fn test_build_defaults_to_primary_volume() {
        let index = MemoryIndex::new();
        let adapter = IndexQueryAdapter::new(&index);
        let _ = HiddenFolders::build(&adapter, &[]);
        let queries = index.file_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].location,
            crate::index::Location::Files {
                volume: PRIMARY_VOLUME.to_string()
            }
        );
    }

    #[test]
    fn test_apply_exclusions_runs_scope_first() {
        let index = MemoryIndex::new()
            .video("a", "Keep/x.mp4")
            .video("a", "Keep/Hidden/y.mp4")
            .file("a", "Keep/Hidden/.nomedia")
            .video("b", "Other/z.mp4");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        let keep_bucket = entries[0].bucket_id.clone();
        let hidden_bucket = entries[1].bucket_id.clone();

        let settings = ExclusionSettings {
            nomedia_enabled: true,
            scope: SearchScope::only([keep_bucket, hidden_bucket]),
        };
        let (visible, hidden) = apply_exclusions(&adapter, entries, &settings);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].relative_path, "Keep/");
        assert!(!hidden.is_empty());
        // Volume "b" was scoped out, so it was never searched for markers.
        assert_eq!(index.file_queries().len(), 1);
    }

    #[test]
    fn test_apply_exclusions_skips_marker_lookup_when_disabled() {
        let index = MemoryIndex::new()
            .video("a", "Hidden/y.mp4")
            .file("a", "Hidden/.nomedia");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();

        let (visible, hidden) = apply_exclusions(&adapter, entries, &ExclusionSettings::default());
        assert_eq!(visible.len(), 1);
        assert!(hidden.is_empty());
        assert!(index.file_queries().is_empty());
    }
}
