//! Catalogue of buckets offered when choosing the search scope.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::filter::HiddenFolders;
use crate::hierarchy::UNKNOWN_NAME;
use crate::index::{IndexQueryAdapter, MediaIndex, VideoFilter};

/// One selectable bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Bucket id used by the scope filter.
    pub bucket_id: String,
    /// Bucket display name.
    pub name: String,
    /// First non-empty relative path seen for the bucket.
    pub relative_path: String,
    /// Volume of that path.
    pub volume: String,
    /// Number of videos in the bucket.
    pub count: usize,
}

/// Lists the buckets the index knows about.
#[derive(Clone)]
pub struct SearchFolderRepository {
    index: Arc<dyn MediaIndex>,
}

impl std::fmt::Debug for SearchFolderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchFolderRepository").finish_non_exhaustive()
    }
}

impl SearchFolderRepository {
    /// Catalogue over `index`.
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self { index }
    }

    /// Every bucket with at least one visible video, sorted by name then path.
    ///
    /// The scope filter is never applied here; with `nomedia_enabled`,
    /// videos under hidden folders are left out of the counts.
    #[instrument(skip(self))]
    pub fn load(&self, nomedia_enabled: bool) -> Result<Vec<FolderEntry>> {
        let adapter = IndexQueryAdapter::new(self.index.as_ref());
        let mut entries = adapter.query_videos(&VideoFilter::All)?;
        if nomedia_enabled {
            entries = HiddenFolders::build(&adapter, &entries).filter(entries);
        }

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut folders: Vec<FolderEntry> = Vec::new();
        for entry in &entries {
            let key = if entry.bucket_id.is_empty() {
                entry.relative_path.clone()
            } else {
                entry.bucket_id.clone()
            };
            if let Some(&idx) = positions.get(&key) {
                let folder = &mut folders[idx];
                folder.count += 1;
                if folder.relative_path.is_empty() && !entry.relative_path.is_empty() {
                    folder.relative_path.clone_from(&entry.relative_path);
                    folder.volume.clone_from(&entry.volume);
                }
                continue;
            }
            positions.insert(key.clone(), folders.len());
            folders.push(FolderEntry {
                bucket_id: key,
                name: if entry.bucket_name.is_empty() {
                    UNKNOWN_NAME.to_string()
                } else {
                    entry.bucket_name.clone()
                },
                relative_path: entry.relative_path.clone(),
                volume: entry.volume.clone(),
                count: 1,
            });
        }

        folders.sort_by_cached_key(|folder| (folder.name.to_lowercase(), folder.relative_path.clone()));
        debug!("Found {} search folders", folders.len());
        Ok(folders)
    }
}
