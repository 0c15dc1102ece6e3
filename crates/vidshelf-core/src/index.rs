//! Media index access.
//!
//! [`MediaIndex`] is the seam to the platform's shared media index: a
//! projected, filtered query over either the video collection or the full
//! file collection of a volume. [`IndexQueryAdapter`] sits on top of it and
//! turns raw rows into [`MediaEntry`] values, defaulting missing fields and
//! absorbing transient failures.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Error, IndexError, Result};
use crate::model::MediaEntry;
use crate::volume_path::{self, normalize, resolve_volume};

/// Base locator for videos in the shared index.
pub const VIDEO_CONTENT_URI: &str = "content://media/external/video/media";

/// Number of raw rows echoed to the debug log per query.
const LOGGED_ROWS: usize = 10;

/// Which collection a query targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Videos, optionally restricted to one volume.
    Videos {
        /// Volume restriction, `None` for every volume.
        volume: Option<String>,
    },
    /// Every indexed file on one volume.
    Files {
        /// Volume to search.
        volume: String,
    },
}

/// Index columns the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Row id.
    Id,
    /// File name.
    DisplayName,
    /// Owning bucket id.
    BucketId,
    /// Owning bucket name.
    BucketDisplayName,
    /// Duration in milliseconds.
    Duration,
    /// Pixel width.
    Width,
    /// Pixel height.
    Height,
    /// Volume-scoped directory.
    RelativePath,
    /// Modification time, epoch seconds.
    DateModified,
    /// Size in bytes.
    Size,
    /// Storage volume.
    VolumeName,
    /// Capture frame rate. Not every platform version has it.
    CaptureFrameRate,
}

/// Columns projected by video queries, before optional ones are added.
pub const VIDEO_PROJECTION: [Column; 11] = [
    Column::Id,
    Column::DisplayName,
    Column::BucketId,
    Column::BucketDisplayName,
    Column::Duration,
    Column::Width,
    Column::Height,
    Column::RelativePath,
    Column::DateModified,
    Column::Size,
    Column::VolumeName,
];

/// Row filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exact bucket id match.
    BucketIdEquals(String),
    /// Relative path starts with the given normalized prefix.
    RelativePathPrefix(String),
    /// Relative path equals the given normalized directory.
    RelativePathEquals(String),
    /// File name equals the given name.
    DisplayNameEquals(String),
    /// Any of the nested selections matches.
    AnyOf(Vec<Selection>),
}

/// Ordering hint applied by the index. Display order is decided later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderHint {
    /// Most recently added first.
    DateAddedDesc,
}

/// A single index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Target collection.
    pub location: Location,
    /// Requested columns.
    pub projection: Vec<Column>,
    /// Optional row filter.
    pub selection: Option<Selection>,
    /// Optional ordering.
    pub order: Option<OrderHint>,
}

/// A raw cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing or null.
    Null,
    /// Integer cell.
    Integer(i64),
    /// Floating point cell.
    Real(f64),
    /// Text cell.
    Text(String),
}

/// A raw index row. Columns that were not projected or came back null read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRow {
    values: HashMap<Column, Value>,
}

impl IndexRow {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, column: Column, value: Value) -> Self {
        self.values.insert(column, value);
        self
    }

    /// Set a text cell.
    #[must_use]
    pub fn with_text(self, column: Column, value: impl Into<String>) -> Self {
        self.with(column, Value::Text(value.into()))
    }

    /// Set an integer cell.
    #[must_use]
    pub fn with_int(self, column: Column, value: i64) -> Self {
        self.with(column, Value::Integer(value))
    }

    /// Read a cell as text.
    #[must_use]
    pub fn text(&self, column: Column) -> Option<String> {
        match self.values.get(&column)? {
            Value::Text(text) => Some(text.clone()),
            Value::Integer(value) => Some(value.to_string()),
            Value::Real(value) => Some(value.to_string()),
            Value::Null => None,
        }
    }

    /// Read a cell as an integer.
    #[must_use]
    pub fn int(&self, column: Column) -> Option<i64> {
        match self.values.get(&column)? {
            Value::Integer(value) => Some(*value),
            Value::Real(value) => Some(*value as i64),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Read a cell as a float.
    #[must_use]
    pub fn real(&self, column: Column) -> Option<f64> {
        match self.values.get(&column)? {
            Value::Real(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Null => None,
        }
    }
}

/// Query capability of the shared media index.
#[cfg_attr(test, mockall::automock)]
pub trait MediaIndex: Send + Sync {
    /// Run a query and return every matching row.
    fn query(&self, query: &IndexQuery) -> std::result::Result<Vec<IndexRow>, IndexError>;

    /// Whether the running platform reports capture frame rates.
    fn supports_frame_rate(&self) -> bool;

    /// Playable locator for the video with row id `id`.
    fn content_uri(&self, id: i64) -> String;
}

/// What subset of videos to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoFilter {
    /// Every video on every volume.
    All,
    /// Videos in one bucket.
    Bucket(String),
    /// Videos at or below a synthetic hierarchy path.
    HierarchyPath(String),
}

/// Selection for a hierarchy prefix. Rows with no relative path are shown
/// under a pseudo-directory named after their bucket, which always sits one
/// level below the volume root, so top-level prefixes also fetch them.
fn hierarchy_selection(relative: String) -> Option<Selection> {
    if relative.is_empty() {
        return None;
    }
    if relative.matches('/').count() == 1 {
        return Some(Selection::AnyOf(vec![
            Selection::RelativePathPrefix(relative),
            Selection::RelativePathEquals(String::new()),
        ]));
    }
    Some(Selection::RelativePathPrefix(relative))
}

/// Normalizes index rows into [`MediaEntry`] values.
pub struct IndexQueryAdapter<'a> {
    index: &'a dyn MediaIndex,
}

impl<'a> IndexQueryAdapter<'a> {
    /// Wrap an index.
    pub fn new(index: &'a dyn MediaIndex) -> Self {
        Self { index }
    }

    /// Fetch videos matching `filter`, newest-added first.
    ///
    /// Only a permission failure is returned as an error. Any other index
    /// failure is logged and yields an empty list, and rows without an id are
    /// skipped.
    pub fn query_videos(&self, filter: &VideoFilter) -> Result<Vec<MediaEntry>> {
        let query = self.build_video_query(filter);
        let rows = match self.index.query(&query) {
            Ok(rows) => rows,
            Err(e @ IndexError::PermissionDenied { .. }) => return Err(Error::Index(e)),
            Err(e) => {
                warn!("Video query failed, continuing with no results: {}", e);
                return Ok(Vec::new());
            }
        };

        let include_frame_rate = query.projection.contains(&Column::CaptureFrameRate);
        let mut entries = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in &rows {
            match self.entry_from_row(row, include_frame_rate) {
                Some(entry) => {
                    if entries.len() < LOGGED_ROWS {
                        debug!(
                            "Index entry volume={}, relPath={}, name={}",
                            entry.volume, entry.relative_path, entry.display_name
                        );
                    }
                    entries.push(entry);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("Skipped {} index rows without an id", skipped);
        }
        debug!("Index query done. entries={}", entries.len());
        Ok(entries)
    }

    /// Query the file collection of `volume`. Every failure, including a
    /// permission failure, is logged and yields no rows: these lookups only
    /// enrich or filter a result that was already obtained.
    pub fn query_files(
        &self,
        volume: &str,
        projection: Vec<Column>,
        selection: Selection,
    ) -> Vec<IndexRow> {
        let query = IndexQuery {
            location: Location::Files {
                volume: volume.to_string(),
            },
            projection,
            selection: Some(selection),
            order: None,
        };
        match self.index.query(&query) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("File lookup on volume {} failed: {}", volume, e);
                Vec::new()
            }
        }
    }

    fn build_video_query(&self, filter: &VideoFilter) -> IndexQuery {
        let mut projection = VIDEO_PROJECTION.to_vec();
        if self.index.supports_frame_rate() {
            projection.push(Column::CaptureFrameRate);
        }

        let (volume, selection) = match filter {
            VideoFilter::All => (None, None),
            VideoFilter::Bucket(bucket_id) => {
                (None, Some(Selection::BucketIdEquals(bucket_id.clone())))
            }
            VideoFilter::HierarchyPath(key) => {
                let (volume, relative) = volume_path::split_key(key);
                (volume, hierarchy_selection(relative))
            }
        };

        IndexQuery {
            location: Location::Videos { volume },
            projection,
            selection,
            order: Some(OrderHint::DateAddedDesc),
        }
    }

    fn entry_from_row(&self, row: &IndexRow, include_frame_rate: bool) -> Option<MediaEntry> {
        let id = row.int(Column::Id)?;
        let frame_rate = if include_frame_rate {
            row.real(Column::CaptureFrameRate).unwrap_or(0.0) as f32
        } else {
            0.0
        };
        Some(MediaEntry {
            id,
            display_name: row.text(Column::DisplayName).unwrap_or_default(),
            bucket_id: row.text(Column::BucketId).unwrap_or_default(),
            bucket_name: row.text(Column::BucketDisplayName).unwrap_or_default(),
            duration_ms: row.int(Column::Duration).unwrap_or(0),
            width: row.int(Column::Width).unwrap_or(0) as i32,
            height: row.int(Column::Height).unwrap_or(0) as i32,
            frame_rate,
            size_bytes: row.int(Column::Size).unwrap_or(0),
            modified_seconds: row.int(Column::DateModified).unwrap_or(0),
            volume: resolve_volume(row.text(Column::VolumeName).as_deref()),
            relative_path: normalize(&row.text(Column::RelativePath).unwrap_or_default()),
            has_subtitle: false,
            content_uri: self.index.content_uri(id),
        })
    }
}
