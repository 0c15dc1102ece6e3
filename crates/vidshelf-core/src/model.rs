//! Entry types that flow through the browse pipeline.
//!
//! [`MediaEntry`] is the normalized form of one index row. It lives only for
//! the duration of a query. [`DisplayEntry`] is what the pipeline hands to the
//! UI layer and what the result cache persists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One video known to the media index, with defaults applied to missing fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaEntry {
    /// Index row id.
    pub id: i64,
    /// File name including extension.
    pub display_name: String,
    /// Id of the owning bucket (directory) as reported by the index.
    pub bucket_id: String,
    /// Display name of the owning bucket.
    pub bucket_name: String,
    /// Duration in milliseconds.
    pub duration_ms: i64,
    /// Pixel width.
    pub width: i32,
    /// Pixel height.
    pub height: i32,
    /// Capture frame rate; zero when the platform does not report it.
    pub frame_rate: f32,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Last modification time, epoch seconds.
    pub modified_seconds: i64,
    /// Storage volume name (never empty).
    pub volume: String,
    /// Volume-scoped directory, empty or ending in `/`.
    pub relative_path: String,
    /// Whether a caption file with a matching basename sits next to the video.
    pub has_subtitle: bool,
    /// Playable locator handed to the player.
    pub content_uri: String,
}

impl MediaEntry {
    /// Copy of this entry with the subtitle flag set to `has_subtitle`.
    #[must_use]
    pub fn with_subtitle(&self, has_subtitle: bool) -> Self {
        Self {
            has_subtitle,
            ..self.clone()
        }
    }

    /// File name without its last extension.
    #[must_use]
    pub fn basename(&self) -> &str {
        match self.display_name.rfind('.') {
            Some(idx) => &self.display_name[..idx],
            None => &self.display_name,
        }
    }
}

/// Aggregate counts shown for folder-like entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderCounts {
    /// Videos directly inside the folder.
    pub videos: u32,
    /// Distinct immediate subfolders.
    pub folders: u32,
    /// Videos anywhere below the folder.
    pub total: u32,
}

impl FolderCounts {
    /// Summary line shown under the folder title.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("Video {}, Folder {}", self.videos, self.folders)
    }
}

/// A bucket in the flat folder view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderItem {
    /// Bucket id, passed back to load the folder's videos.
    pub bucket_id: String,
    /// Bucket display name.
    pub name: String,
    /// Video counts.
    pub counts: FolderCounts,
}

/// A synthetic directory in the hierarchy view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyItem {
    /// Synthetic path key; also the node's opaque id.
    pub path: String,
    /// Directory name or volume label.
    pub name: String,
    /// Video and subfolder counts.
    pub counts: FolderCounts,
}

/// A playable video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoItem {
    /// File name.
    pub title: String,
    /// Duration in milliseconds.
    pub duration_ms: i64,
    /// Pixel width.
    pub width: i32,
    /// Pixel height.
    pub height: i32,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Last modification time, epoch seconds.
    pub modified_seconds: i64,
    /// Capture frame rate.
    pub frame_rate: f32,
    /// Whether a matching caption file exists.
    pub has_subtitle: bool,
    /// Playable locator.
    pub content_uri: String,
}

impl From<&MediaEntry> for VideoItem {
    fn from(entry: &MediaEntry) -> Self {
        let title = if entry.display_name.is_empty() {
            "Unknown".to_string()
        } else {
            entry.display_name.clone()
        };
        Self {
            title,
            duration_ms: entry.duration_ms,
            width: entry.width,
            height: entry.height,
            size_bytes: entry.size_bytes,
            modified_seconds: entry.modified_seconds,
            frame_rate: entry.frame_rate,
            has_subtitle: entry.has_subtitle,
            content_uri: entry.content_uri.clone(),
        }
    }
}

/// What the browse pipeline produces for display.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEntry {
    /// Flat bucket.
    Folder(FolderItem),
    /// Synthetic directory or volume root.
    HierarchyNode(HierarchyItem),
    /// Leaf video.
    Video(VideoItem),
}

impl DisplayEntry {
    /// Title shown in lists.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::HierarchyNode(node) => &node.name,
            Self::Video(video) => &video.title,
        }
    }

    /// Navigation id: bucket id for folders, synthetic path for nodes.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Folder(folder) => Some(&folder.bucket_id),
            Self::HierarchyNode(node) => Some(&node.path),
            Self::Video(_) => None,
        }
    }

    /// Aggregate counts of folder-like entries.
    #[must_use]
    pub const fn counts(&self) -> Option<&FolderCounts> {
        match self {
            Self::Folder(folder) => Some(&folder.counts),
            Self::HierarchyNode(node) => Some(&node.counts),
            Self::Video(_) => None,
        }
    }

    /// Content locator of video entries.
    #[must_use]
    pub fn content_uri(&self) -> Option<&str> {
        match self {
            Self::Video(video) => Some(&video.content_uri),
            _ => None,
        }
    }

    /// Whether this entry is a video leaf.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }
}

/// Which of the three top-level views is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseMode {
    /// Flat list of buckets.
    #[default]
    Folders,
    /// Reconstructed directory tree.
    Hierarchy,
    /// Flat list of every video.
    Videos,
}

/// Sort key for videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Case-insensitive file name.
    Title,
    /// Duration.
    Length,
    /// Modification time.
    #[default]
    Modified,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

/// How the list is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One entry per row.
    #[default]
    List,
    /// Grid of thumbnails.
    Tile,
}

macro_rules! keyword_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Stable upper-case name used in cache keys.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(Error::Configuration(format!(
                        concat!("Unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

keyword_enum!(BrowseMode {
    Folders => "FOLDERS",
    Hierarchy => "HIERARCHY",
    Videos => "VIDEOS",
});

keyword_enum!(SortMode {
    Title => "TITLE",
    Length => "LENGTH",
    Modified => "MODIFIED",
});

keyword_enum!(DisplayMode {
    List => "LIST",
    Tile => "TILE",
});

keyword_enum!(SortOrder {
    Asc => "ASC",
    Desc => "DESC",
});
