//! Display list builders, including the hierarchy reconstructor.
//!
//! The index has no notion of directories, only a flat relative path per
//! row. A hierarchy level is rebuilt from scratch on every query: entries
//! exactly at the requested prefix become video leaves, deeper entries are
//! folded into one node per immediate child directory. The root level
//! (`""`) lists storage volumes instead of directories.

use std::collections::{HashMap, HashSet};

use crate::filter::HiddenFolders;
use crate::model::{
    DisplayEntry, FolderCounts, FolderItem, HierarchyItem, MediaEntry, SortMode, SortOrder,
    VideoItem,
};
use crate::sort::sort_entries;
use crate::volume_path::{PRIMARY_VOLUME, VolumePath, normalize};

/// Fallback name for entries and buckets with no name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Human labels for storage volumes.
#[cfg_attr(test, mockall::automock)]
pub trait VolumeLabeler: Send + Sync {
    /// Label shown for `volume` at the hierarchy root.
    fn label(&self, volume: &str) -> String;
}

/// Labels the primary volume as internal storage and everything else as
/// external storage, unless an override is registered.
#[derive(Debug, Clone, Default)]
pub struct DefaultVolumeLabels {
    overrides: HashMap<String, String>,
}

impl DefaultVolumeLabels {
    /// Labels with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `label` for `volume`.
    #[must_use]
    pub fn with_label(mut self, volume: impl Into<String>, label: impl Into<String>) -> Self {
        self.overrides.insert(volume.into(), label.into());
        self
    }
}

impl VolumeLabeler for DefaultVolumeLabels {
    fn label(&self, volume: &str) -> String {
        if let Some(label) = self.overrides.get(volume) {
            return label.clone();
        }
        if volume == PRIMARY_VOLUME {
            "Internal storage".to_string()
        } else {
            format!("External storage ({volume})")
        }
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { UNKNOWN_NAME } else { value }
}

/// Directory used to place `entry` in the tree. Entries with no relative
/// path sit in a pseudo-directory named after their bucket.
fn entry_path(entry: &MediaEntry) -> String {
    if entry.relative_path.is_empty() {
        normalize(or_unknown(&entry.bucket_name))
    } else {
        entry.relative_path.clone()
    }
}

fn first_segment(path: &str) -> &str {
    path.split('/').next().unwrap_or_default()
}

#[derive(Debug)]
struct Aggregate {
    id: String,
    name: String,
    total: u32,
    direct: u32,
    subfolders: HashSet<String>,
}

impl Aggregate {
    fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            total: 0,
            direct: 0,
            subfolders: HashSet::new(),
        }
    }

    fn counts(&self) -> FolderCounts {
        FolderCounts {
            videos: self.direct,
            folders: self.subfolders.len() as u32,
            total: self.total,
        }
    }
}

/// Aggregates in first-seen order, looked up by id.
#[derive(Debug, Default)]
struct Aggregates {
    order: Vec<Aggregate>,
    index: HashMap<String, usize>,
}

impl Aggregates {
    fn get_or_insert(&mut self, id: &str, name: impl FnOnce() -> String) -> &mut Aggregate {
        let slot = match self.index.get(id) {
            Some(slot) => *slot,
            None => {
                let slot = self.order.len();
                self.order.push(Aggregate::new(id.to_string(), name()));
                self.index.insert(id.to_string(), slot);
                slot
            }
        };
        &mut self.order[slot]
    }

    fn into_sorted(self) -> Vec<Aggregate> {
        let mut aggregates = self.order;
        aggregates.sort_by_cached_key(|aggregate| aggregate.name.to_lowercase());
        aggregates
    }
}

/// One [`DisplayEntry::Video`] per entry, in input order.
#[must_use]
pub fn video_items(entries: &[MediaEntry]) -> Vec<DisplayEntry> {
    entries
        .iter()
        .map(|entry| DisplayEntry::Video(VideoItem::from(entry)))
        .collect()
}

/// One [`DisplayEntry::Folder`] per bucket, sorted case-insensitively by name.
#[must_use]
pub fn folder_items(entries: &[MediaEntry]) -> Vec<DisplayEntry> {
    let mut buckets = Aggregates::default();
    for entry in entries {
        let name = or_unknown(&entry.bucket_name);
        let key = if entry.bucket_id.is_empty() {
            name
        } else {
            entry.bucket_id.as_str()
        };
        let bucket = buckets.get_or_insert(key, || name.to_string());
        bucket.total += 1;
        bucket.direct += 1;
    }
    buckets
        .into_sorted()
        .into_iter()
        .map(|bucket| {
            DisplayEntry::Folder(FolderItem {
                counts: bucket.counts(),
                bucket_id: bucket.id,
                name: bucket.name,
            })
        })
        .collect()
}

/// Rebuilds one level of the synthetic directory tree.
pub struct HierarchyReconstructor<'a> {
    labeler: &'a dyn VolumeLabeler,
    hidden: &'a HiddenFolders,
    sort_mode: SortMode,
    sort_order: SortOrder,
}

impl<'a> HierarchyReconstructor<'a> {
    /// Reconstructor that hides children under `hidden` and labels volumes
    /// with `labeler`. Leaves use the default sort until [`Self::with_sort`].
    pub fn new(labeler: &'a dyn VolumeLabeler, hidden: &'a HiddenFolders) -> Self {
        Self {
            labeler,
            hidden,
            sort_mode: SortMode::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Sort applied to the video leaves of a level.
    #[must_use]
    pub const fn with_sort(mut self, mode: SortMode, order: SortOrder) -> Self {
        self.sort_mode = mode;
        self.sort_order = order;
        self
    }

    /// Entries for the level at `path`: child directories sorted by name,
    /// then the videos directly at `path` in the active sort order.
    #[must_use]
    pub fn level(&self, entries: &[MediaEntry], path: &str) -> Vec<DisplayEntry> {
        if path.is_empty() {
            return self.volume_roots(entries);
        }

        let parsed = VolumePath::parse(path);
        let prefix = match &parsed {
            Some(parsed) => parsed.relative.clone(),
            None => normalize(path),
        };

        let mut children = Aggregates::default();
        let mut leaves = Vec::new();

        for entry in entries {
            if parsed.as_ref().is_some_and(|p| p.volume != entry.volume) {
                continue;
            }
            let path = entry_path(entry);
            if self.hidden.is_blocked(&entry.volume, &path) {
                continue;
            }
            let Some(remainder) = path.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if remainder.is_empty() {
                leaves.push(entry.clone());
                continue;
            }

            let child_name = first_segment(remainder);
            if child_name.is_empty() {
                continue;
            }
            let child_relative = format!("{prefix}{child_name}/");
            if self.hidden.is_blocked(&entry.volume, &child_relative) {
                continue;
            }
            let child_id = match &parsed {
                Some(parsed) => VolumePath::new(parsed.volume.clone(), &child_relative).encode(),
                None => child_relative,
            };

            let child = children.get_or_insert(&child_id, || child_name.to_string());
            child.total += 1;
            let below_child = remainder[child_name.len()..].trim_start_matches('/');
            if below_child.is_empty() {
                child.direct += 1;
            } else {
                let grandchild = first_segment(below_child);
                if !grandchild.is_empty() {
                    child.subfolders.insert(grandchild.to_string());
                }
            }
        }

        sort_entries(&mut leaves, self.sort_mode, self.sort_order);

        let mut items: Vec<DisplayEntry> = children
            .into_sorted()
            .into_iter()
            .map(|child| {
                DisplayEntry::HierarchyNode(HierarchyItem {
                    counts: child.counts(),
                    path: child.id,
                    name: child.name,
                })
            })
            .collect();
        items.extend(video_items(&leaves));
        items
    }

    /// The entries at or below `path`, in input order. Hidden entries and
    /// entries of other volumes are dropped.
    #[must_use]
    pub fn videos_under(&self, entries: &[MediaEntry], path: &str) -> Vec<MediaEntry> {
        let parsed = VolumePath::parse(path);
        let prefix = match &parsed {
            Some(parsed) => parsed.relative.clone(),
            None => normalize(path),
        };
        entries
            .iter()
            .filter(|entry| parsed.as_ref().is_none_or(|p| p.volume == entry.volume))
            .filter(|entry| {
                let path = entry_path(entry);
                path.starts_with(prefix.as_str()) && !self.hidden.is_blocked(&entry.volume, &path)
            })
            .cloned()
            .collect()
    }

    /// One node per storage volume present in `entries`, sorted by label.
    #[must_use]
    pub fn volume_roots(&self, entries: &[MediaEntry]) -> Vec<DisplayEntry> {
        let mut volumes = Aggregates::default();
        for entry in entries {
            let key = VolumePath::volume_root(entry.volume.clone()).encode();
            let volume = volumes.get_or_insert(&key, || self.labeler.label(&entry.volume));
            volume.total += 1;

            let path = entry_path(entry);
            let child = first_segment(&path);
            if child.is_empty() {
                volume.direct += 1;
            } else {
                volume.subfolders.insert(child.to_string());
            }
        }
        volumes
            .into_sorted()
            .into_iter()
            .map(|volume| {
                DisplayEntry::HierarchyNode(HierarchyItem {
                    counts: volume.counts(),
                    path: volume.id,
                    name: volume.name,
                })
            })
            .collect()
    }
}
