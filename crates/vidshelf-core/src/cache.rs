//! On-disk result cache for display lists.
//!
//! One JSON snapshot per query key, named after the SHA-256 of the key
//! fields. Snapshots carry a format version; a snapshot with any other
//! version reads as a miss. Writes go through a temporary file and a rename
//! so readers never see a half-written snapshot under the final name.
//!
//! The cache is an optimization only. Every failure is logged and reported
//! as a miss (reads) or ignored (writes).
//!
//! # Example
//!
//! ```rust,ignore
//! use vidshelf_core::cache::{CacheConfig, CacheKey, ResultCache};
//!
//! let cache = ResultCache::new(CacheConfig::default())?;
//! let key = CacheKey::new(&shape, &options);
//! cache.write(&key, &entries);
//! assert_eq!(cache.read(&key), Some(entries));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::atomic_file::{RenameFallback, write_atomically};
use crate::error::{CacheError, Error, FileSystemError, Result};
use crate::model::{
    BrowseMode, DisplayEntry, FolderCounts, FolderItem, HierarchyItem, SortMode, SortOrder,
    VideoItem,
};
use crate::repository::{QueryOptions, QueryShape};

/// Snapshot format version. Bump when the item layout changes.
pub const CACHE_VERSION: u32 = 1;

/// Subdirectory of the cache root holding snapshots.
const SNAPSHOT_DIR: &str = "video_list_cache";

/// Snapshot file name prefix.
const SNAPSHOT_PREFIX: &str = "video_list_";

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether the cache is used at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache root. Defaults to the platform cache directory.
    #[serde(default)]
    pub custom_cache_dir: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_cache_dir: None,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache root.
    #[must_use]
    pub fn with_cache_dir(mut self, path: PathBuf) -> Self {
        self.custom_cache_dir = Some(path);
        self
    }

    /// Disable caching entirely.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Which query produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Top-level view.
    Mode,
    /// One bucket.
    Folder,
    /// One hierarchy level.
    Hierarchy,
}

impl QueryType {
    /// Name used in the hashed key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mode => "MODE",
            Self::Folder => "FOLDER",
            Self::Hierarchy => "HIERARCHY",
        }
    }
}

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Query type.
    pub query_type: QueryType,
    /// Browse mode the query ran under.
    pub mode: BrowseMode,
    /// Sort key.
    pub sort_mode: SortMode,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Whether the hidden-folder filter was on.
    pub nomedia_enabled: bool,
    /// Scope fingerprint.
    pub search_folders_hash: String,
    /// Bucket for folder queries.
    pub bucket_id: Option<String>,
    /// Path for hierarchy queries.
    pub hierarchy_path: Option<String>,
}

impl CacheKey {
    /// Key for running `shape` with `options`.
    #[must_use]
    pub fn new(shape: &QueryShape, options: &QueryOptions) -> Self {
        let (query_type, mode, bucket_id, hierarchy_path) = match shape {
            QueryShape::Mode(mode) => (QueryType::Mode, *mode, None, None),
            QueryShape::Folder(bucket) => {
                (QueryType::Folder, BrowseMode::Folders, Some(bucket.clone()), None)
            }
            QueryShape::Hierarchy(path) => {
                (QueryType::Hierarchy, BrowseMode::Hierarchy, None, Some(path.clone()))
            }
        };
        Self {
            query_type,
            mode,
            sort_mode: options.sort_mode,
            sort_order: options.sort_order,
            nomedia_enabled: options.exclusions.nomedia_enabled,
            search_folders_hash: options.exclusions.fingerprint(),
            bucket_id,
            hierarchy_path,
        }
    }

    /// Pipe-joined key fields.
    #[must_use]
    pub fn joined(&self) -> String {
        [
            self.query_type.as_str(),
            self.mode.as_str(),
            self.sort_mode.as_str(),
            self.sort_order.as_str(),
            if self.nomedia_enabled { "true" } else { "false" },
            self.search_folders_hash.as_str(),
            self.bucket_id.as_deref().unwrap_or_default(),
            self.hierarchy_path.as_deref().unwrap_or_default(),
        ]
        .join("|")
    }

    /// Lowercase hex SHA-256 of [`Self::joined`].
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.joined().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Snapshot file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{SNAPSHOT_PREFIX}{}.json", self.digest())
    }
}

/// Item layout on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireItem {
    #[serde(rename = "type")]
    kind: String,
    title: String,
    subtitle: Option<String>,
    indent_level: i32,
    bucket_id: Option<String>,
    duration_ms: i64,
    width: i32,
    height: i32,
    content_uri: Option<String>,
    size_bytes: i64,
    modified_seconds: i64,
    frame_rate: f64,
    has_subtitle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_count: Option<u32>,
}

const KIND_FOLDER: &str = "FOLDER";
const KIND_HIERARCHY: &str = "HIERARCHY";
const KIND_VIDEO: &str = "VIDEO";

impl WireItem {
    fn folder_like(kind: &str, id: &str, title: &str, counts: FolderCounts) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.to_string(),
            subtitle: Some(counts.summary()),
            bucket_id: Some(id.to_string()),
            video_count: Some(counts.videos),
            folder_count: Some(counts.folders),
            total_count: Some(counts.total),
            ..Self::default()
        }
    }

    fn counts(&self) -> FolderCounts {
        let parsed = self.subtitle.as_deref().and_then(parse_summary);
        let videos = self
            .video_count
            .or(parsed.map(|(videos, _)| videos))
            .unwrap_or(0);
        FolderCounts {
            videos,
            folders: self
                .folder_count
                .or(parsed.map(|(_, folders)| folders))
                .unwrap_or(0),
            total: self.total_count.unwrap_or(videos),
        }
    }
}

/// Parse a `"Video N, Folder M"` summary.
fn parse_summary(summary: &str) -> Option<(u32, u32)> {
    let (videos, folders) = summary.split_once(',')?;
    let videos = videos.trim().strip_prefix("Video")?.trim().parse().ok()?;
    let folders = folders.trim().strip_prefix("Folder")?.trim().parse().ok()?;
    Some((videos, folders))
}

impl From<&DisplayEntry> for WireItem {
    fn from(entry: &DisplayEntry) -> Self {
        match entry {
            DisplayEntry::Folder(folder) => {
                Self::folder_like(KIND_FOLDER, &folder.bucket_id, &folder.name, folder.counts)
            }
            DisplayEntry::HierarchyNode(node) => {
                Self::folder_like(KIND_HIERARCHY, &node.path, &node.name, node.counts)
            }
            DisplayEntry::Video(video) => Self {
                kind: KIND_VIDEO.to_string(),
                title: video.title.clone(),
                duration_ms: video.duration_ms,
                width: video.width,
                height: video.height,
                content_uri: Some(video.content_uri.clone()),
                size_bytes: video.size_bytes,
                modified_seconds: video.modified_seconds,
                frame_rate: f64::from(video.frame_rate),
                has_subtitle: video.has_subtitle,
                ..Self::default()
            },
        }
    }
}

impl WireItem {
    /// Back to a display entry. Unknown item types yield `None`.
    fn into_entry(self) -> Option<DisplayEntry> {
        match self.kind.as_str() {
            KIND_FOLDER => Some(DisplayEntry::Folder(FolderItem {
                counts: self.counts(),
                bucket_id: self.bucket_id.unwrap_or_default(),
                name: self.title,
            })),
            KIND_HIERARCHY => Some(DisplayEntry::HierarchyNode(HierarchyItem {
                counts: self.counts(),
                path: self.bucket_id.unwrap_or_default(),
                name: self.title,
            })),
            KIND_VIDEO => Some(DisplayEntry::Video(VideoItem {
                title: self.title,
                duration_ms: self.duration_ms,
                width: self.width,
                height: self.height,
                size_bytes: self.size_bytes,
                modified_seconds: self.modified_seconds,
                frame_rate: self.frame_rate as f32,
                has_subtitle: self.has_subtitle,
                content_uri: self.content_uri.unwrap_or_default(),
            })),
            _ => None,
        }
    }
}

/// Snapshot file layout.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    updated_at: u64,
    #[serde(default)]
    items: Vec<WireItem>,
}

/// Durable key to display-list store.
#[derive(Debug, Clone)]
pub struct ResultCache {
    config: CacheConfig,
    dir: PathBuf,
}

impl ResultCache {
    /// Open the cache, creating its directory when enabled.
    pub fn new(config: CacheConfig) -> Result<Self> {
        let root = config
            .custom_cache_dir
            .clone()
            .unwrap_or_else(default_cache_directory);
        let dir = root.join(SNAPSHOT_DIR);

        if !config.enabled {
            debug!("Result cache is disabled");
            return Ok(Self { config, dir });
        }

        fs::create_dir_all(&dir).map_err(|e| {
            Error::Cache(CacheError::InitializationFailed {
                reason: format!("Failed to create cache directory {}: {}", dir.display(), e),
            })
        })?;
        info!("Result cache initialized at {}", dir.display());
        Ok(Self { config, dir })
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config: CacheConfig::disabled(),
            dir: PathBuf::new(),
        }
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the cache is in use.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Snapshot path for `key`.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Stored entries for `key`, or `None` on a miss. Missing, unreadable,
    /// corrupt and wrong-version snapshots are all misses.
    #[must_use]
    pub fn read(&self, key: &CacheKey) -> Option<Vec<DisplayEntry>> {
        if !self.config.enabled {
            return None;
        }
        let path = self.path_for(key);
        if !path.exists() {
            debug!("Cache miss for {}", key.joined());
            return None;
        }
        match Self::read_snapshot(&path) {
            Ok(entries) => {
                debug!("Cache hit for {} ({} entries)", key.joined(), entries.len());
                Some(entries)
            }
            Err(e) => {
                warn!("Ignoring cache snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store `entries` under `key`. Failures are logged and otherwise ignored.
    pub fn write(&self, key: &CacheKey, entries: &[DisplayEntry]) {
        if !self.config.enabled {
            return;
        }
        let path = self.path_for(key);
        if let Err(e) = self.write_snapshot(&path, entries) {
            warn!("Failed to write cache snapshot {}: {}", path.display(), e);
        }
    }

    fn read_snapshot(path: &Path) -> Result<Vec<DisplayEntry>> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            Error::Cache(CacheError::Corrupted {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
        if snapshot.version != CACHE_VERSION {
            return Err(Error::Cache(CacheError::VersionMismatch {
                found: snapshot.version,
                expected: CACHE_VERSION,
            }));
        }
        Ok(snapshot
            .items
            .into_iter()
            .filter_map(WireItem::into_entry)
            .collect())
    }

    fn write_snapshot(&self, path: &Path, entries: &[DisplayEntry]) -> Result<()> {
        let snapshot = Snapshot {
            version: CACHE_VERSION,
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            items: entries.iter().map(WireItem::from).collect(),
        };
        let payload = serde_json::to_string(&snapshot)?;
        write_atomically(path, payload.as_bytes(), RenameFallback::WriteInPlace)?;

        debug!("Cached {} entries at {}", entries.len(), path.display());
        Ok(())
    }
}

/// Default cache root under the platform cache directory.
#[must_use]
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("vidshelf")
}
