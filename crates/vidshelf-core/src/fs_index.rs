//! Media index over plain directories.
//!
//! Each configured [`VolumeRoot`] is walked on every query. Files are
//! described the way a platform media index would describe them: a
//! volume-scoped relative directory, a bucket per directory and a stable
//! row id. Video rows are recognised by extension.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::VolumeRoot;
use crate::error::IndexError;
use crate::index::{Column, IndexQuery, IndexRow, Location, MediaIndex, OrderHint, Selection, Value};

/// File extensions treated as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "3gp", "avi", "flv", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ts", "webm", "wmv",
];

/// Whether `path` has a video extension.
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

/// One file found on a volume.
#[derive(Debug, Clone)]
struct FileRecord {
    id: i64,
    volume: String,
    relative_path: String,
    name: String,
    bucket_id: String,
    bucket_name: String,
    size_bytes: i64,
    modified_seconds: i64,
    absolute: PathBuf,
}

impl FileRecord {
    fn value(&self, column: Column) -> Value {
        match column {
            Column::Id => Value::Integer(self.id),
            Column::DisplayName => Value::Text(self.name.clone()),
            Column::BucketId => Value::Text(self.bucket_id.clone()),
            Column::BucketDisplayName => Value::Text(self.bucket_name.clone()),
            Column::RelativePath => Value::Text(self.relative_path.clone()),
            Column::DateModified => Value::Integer(self.modified_seconds),
            Column::Size => Value::Integer(self.size_bytes),
            Column::VolumeName => Value::Text(self.volume.clone()),
            Column::Duration | Column::Width | Column::Height | Column::CaptureFrameRate => {
                Value::Null
            }
        }
    }

    fn row(&self, projection: &[Column]) -> IndexRow {
        projection
            .iter()
            .fold(IndexRow::new(), |row, &column| row.with(column, self.value(column)))
    }

    fn matches(&self, selection: Option<&Selection>) -> bool {
        match selection {
            None => true,
            Some(Selection::BucketIdEquals(id)) => &self.bucket_id == id,
            Some(Selection::RelativePathPrefix(prefix)) => {
                self.relative_path.starts_with(prefix.as_str())
            }
            Some(Selection::RelativePathEquals(path)) => &self.relative_path == path,
            Some(Selection::DisplayNameEquals(name)) => &self.name == name,
            Some(Selection::AnyOf(options)) => options.iter().any(|o| self.matches(Some(o))),
        }
    }
}

/// [`MediaIndex`] that scans local directories.
#[derive(Debug)]
pub struct FsMediaIndex {
    volumes: Vec<VolumeRoot>,
    locations: Mutex<HashMap<i64, PathBuf>>,
}

impl FsMediaIndex {
    /// Index over `volumes`.
    pub fn new(volumes: Vec<VolumeRoot>) -> Self {
        Self {
            volumes,
            locations: Mutex::new(HashMap::new()),
        }
    }

    /// Configured volumes.
    #[must_use]
    pub fn volumes(&self) -> &[VolumeRoot] {
        &self.volumes
    }

    fn volume(&self, name: &str) -> Result<&VolumeRoot, IndexError> {
        self.volumes
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| IndexError::VolumeNotFound {
                volume: name.to_string(),
            })
    }

    fn scan(&self, volume: &VolumeRoot, videos_only: bool) -> Result<Vec<FileRecord>, IndexError> {
        let root = &volume.root;
        if let Err(e) = fs::read_dir(root) {
            return Err(classify(root, &e));
        }
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    skipped += 1;
                    debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || (videos_only && !is_video_file(entry.path())) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    skipped += 1;
                    debug!("No metadata for {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let relative_path = relative_dir(relative);
            let bucket_name = relative
                .parent()
                .and_then(Path::file_name)
                .map_or_else(|| root_name.clone(), |n| n.to_string_lossy().into_owned());
            let modified_seconds = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_secs() as i64);

            records.push(FileRecord {
                id: row_id(&volume.name, &relative_path, &name),
                bucket_id: bucket_id(&volume.name, &relative_path),
                volume: volume.name.clone(),
                relative_path,
                name,
                bucket_name,
                size_bytes: metadata.len() as i64,
                modified_seconds,
                absolute: entry.path().to_path_buf(),
            });
        }
        if skipped > 0 {
            warn!("Skipped {} unreadable entries on volume {}", skipped, volume.name);
        }
        Ok(records)
    }

    fn remember(&self, records: &[FileRecord]) {
        let mut locations = self.locations.lock().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            locations.insert(record.id, record.absolute.clone());
        }
    }
}

impl MediaIndex for FsMediaIndex {
    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexRow>, IndexError> {
        let (volumes, videos_only): (Vec<&VolumeRoot>, bool) = match &query.location {
            Location::Videos { volume: None } => (self.volumes.iter().collect(), true),
            Location::Videos {
                volume: Some(volume),
            } => (vec![self.volume(volume)?], true),
            Location::Files { volume } => (vec![self.volume(volume)?], false),
        };

        let mut records = Vec::new();
        let mut answered = 0usize;
        let mut last_error = None;
        for volume in volumes {
            match self.scan(volume, videos_only) {
                Ok(scanned) => {
                    answered += 1;
                    records.extend(
                        scanned
                            .into_iter()
                            .filter(|r| r.matches(query.selection.as_ref())),
                    );
                }
                Err(e @ IndexError::PermissionDenied { .. }) => return Err(e),
                Err(e) => {
                    warn!("Skipping volume {}: {}", volume.name, e);
                    last_error = Some(e);
                }
            }
        }
        if answered == 0
            && let Some(e) = last_error
        {
            return Err(e);
        }
        if query.order == Some(OrderHint::DateAddedDesc) {
            records.sort_by(|a, b| b.modified_seconds.cmp(&a.modified_seconds));
        }
        if videos_only {
            self.remember(&records);
        }

        debug!("Filesystem query matched {} files", records.len());
        Ok(records.iter().map(|r| r.row(&query.projection)).collect())
    }

    fn supports_frame_rate(&self) -> bool {
        false
    }

    fn content_uri(&self, id: i64) -> String {
        let locations = self.locations.lock().unwrap_or_else(PoisonError::into_inner);
        locations.get(&id).map_or_else(String::new, |path| file_uri(path))
    }
}

fn classify(root: &Path, error: &io::Error) -> IndexError {
    let reason = format!("{}: {}", root.display(), error);
    if error.kind() == io::ErrorKind::PermissionDenied {
        IndexError::PermissionDenied { reason }
    } else {
        IndexError::Unavailable { reason }
    }
}

/// Volume-scoped directory of a file: `/`-separated, ending in `/`, empty at
/// the volume root.
fn relative_dir(relative_file: &Path) -> String {
    let Some(parent) = relative_file.parent() else {
        return String::new();
    };
    let mut dir = String::new();
    for component in parent.components() {
        dir.push_str(&component.as_os_str().to_string_lossy());
        dir.push('/');
    }
    dir
}

fn bucket_id(volume: &str, relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(volume.as_bytes());
    hasher.update(b":");
    hasher.update(relative_path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn row_id(volume: &str, relative_path: &str, name: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(volume.as_bytes());
    hasher.update(b":");
    hasher.update(relative_path.as_bytes());
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    // Non-negative and non-zero.
    (i64::from_be_bytes(bytes) & i64::MAX).max(1)
}

fn file_uri(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::index::VIDEO_PROJECTION;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, mtime: i64) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"data").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    fn videos(volume: Option<&str>) -> IndexQuery {
        IndexQuery {
            location: Location::Videos {
                volume: volume.map(str::to_string),
            },
            projection: VIDEO_PROJECTION.to_vec(),
            selection: None,
            order: Some(OrderHint::DateAddedDesc),
        }
    }

    #[test]
    fn test_video_rows_newest_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        touch(temp_dir.path(), "Movies/old.mp4", 1_000);
        touch(temp_dir.path(), "Movies/new.MKV", 3_000);
        touch(temp_dir.path(), "Movies/notes.txt", 2_000);
        let index = FsMediaIndex::new(vec![VolumeRoot::new("primary", temp_dir.path())]);

        let rows = index.query(&videos(None)).unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.text(Column::DisplayName).unwrap()).collect();
        assert_eq!(names, vec!["new.MKV", "old.mp4"]);
        assert_eq!(rows[0].text(Column::RelativePath).unwrap(), "Movies/");
        assert_eq!(rows[0].text(Column::BucketDisplayName).unwrap(), "Movies");
        assert_eq!(rows[0].int(Column::DateModified), Some(3_000));
        assert_eq!(rows[0].int(Column::Size), Some(4));
        assert_eq!(rows[0].int(Column::Duration), None);
        assert_eq!(
            rows[0].text(Column::BucketId),
            rows[1].text(Column::BucketId)
        );
    }

    #[test]
    fn test_ids_are_stable_and_resolve_to_file_uris() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        touch(temp_dir.path(), "a/clip.mp4", 1);
        let index = FsMediaIndex::new(vec![VolumeRoot::new("primary", temp_dir.path())]);

        let first = index.query(&videos(None)).unwrap()[0].int(Column::Id).unwrap();
        let second = index.query(&videos(None)).unwrap()[0].int(Column::Id).unwrap();
        assert_eq!(first, second);
        assert!(first > 0);

        let uri = index.content_uri(first);
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("a/clip.mp4"));
        assert_eq!(index.content_uri(first + 1), "");
    }

    #[test]
    fn test_files_location_sees_markers() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        touch(temp_dir.path(), "Private/.nomedia", 1);
        touch(temp_dir.path(), "Private/a.mp4", 1);
        let index = FsMediaIndex::new(vec![VolumeRoot::new("primary", temp_dir.path())]);

        let rows = index
            .query(&IndexQuery {
                location: Location::Files {
                    volume: "primary".to_string(),
                },
                projection: vec![Column::RelativePath],
                selection: Some(Selection::DisplayNameEquals(".nomedia".to_string())),
                order: None,
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(Column::RelativePath).unwrap(), "Private/");
        assert_eq!(rows[0].text(Column::DisplayName), None);
    }

    #[test]
    fn test_root_level_files_use_root_name_as_bucket() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        touch(temp_dir.path(), "loose.mp4", 1);
        let index = FsMediaIndex::new(vec![VolumeRoot::new("primary", temp_dir.path())]);

        let rows = index.query(&videos(None)).unwrap();
        assert_eq!(rows[0].text(Column::RelativePath).unwrap(), "");
        let root_name = temp_dir.path().file_name().unwrap().to_string_lossy();
        assert_eq!(rows[0].text(Column::BucketDisplayName).unwrap(), root_name);
    }

    #[test]
    fn test_selection_and_volume_restriction() {
        let internal = TempDir::new().expect("Failed to create temp dir");
        let sd = TempDir::new().expect("Failed to create temp dir");
        touch(internal.path(), "DCIM/Camera/a.mp4", 1);
        touch(internal.path(), "Movies/b.mp4", 1);
        touch(sd.path(), "DCIM/c.mp4", 1);
        let index = FsMediaIndex::new(vec![
            VolumeRoot::new("primary", internal.path()),
            VolumeRoot::new("sd", sd.path()),
        ]);

        let mut query = videos(None);
        query.selection = Some(Selection::RelativePathPrefix("DCIM/".to_string()));
        assert_eq!(index.query(&query).unwrap().len(), 2);

        query.location = Location::Videos {
            volume: Some("sd".to_string()),
        };
        assert_eq!(index.query(&query).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_volume_and_missing_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let index = FsMediaIndex::new(vec![VolumeRoot::new(
            "gone",
            temp_dir.path().join("missing"),
        )]);

        assert!(matches!(
            index.query(&videos(Some("other"))),
            Err(IndexError::VolumeNotFound { .. })
        ));
        assert!(matches!(
            index.query(&videos(None)),
            Err(IndexError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_unmounted_volume_keeps_other_volumes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let internal = temp_dir.path().join("internal");
        touch(&internal, "Movies/a.mp4", 100);
        let index = FsMediaIndex::new(vec![
            VolumeRoot::new("external_primary", &internal),
            VolumeRoot::new("sdcard", temp_dir.path().join("unmounted")),
        ]);

        let rows = index.query(&videos(None)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text(Column::DisplayName).as_deref(), Some("a.mp4"));
        assert!(matches!(
            index.query(&videos(Some("sdcard"))),
            Err(IndexError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_relative_dir() {
        assert_eq!(relative_dir(Path::new("a.mp4")), "");
        assert_eq!(relative_dir(Path::new("Movies/2024/a.mp4")), "Movies/2024/");
    }

    #[test]
    fn test_video_extensions() {
        assert!(is_video_file(Path::new("x.WebM")));
        assert!(!is_video_file(Path::new("x.srt")));
        assert!(!is_video_file(Path::new("mp4")));
    }
}
