//! Video repository: the full query pipeline behind every browse view.
//!
//! Each load runs query, scope filter, hidden-folder filter, sort and
//! subtitle enrichment, then shapes the survivors into display entries.
//! Every call builds its own entry list; nothing is shared between calls.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::filter::{ExclusionSettings, HiddenFolders, apply_exclusions};
use crate::hierarchy::{HierarchyReconstructor, VolumeLabeler, folder_items, video_items};
use crate::index::{IndexQueryAdapter, MediaIndex, VideoFilter};
use crate::model::{BrowseMode, DisplayEntry, MediaEntry, SortMode, SortOrder};
use crate::sort::sort_entries;
use crate::subtitle::attach_subtitles;

/// Sort and exclusion settings shared by every query shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Sort key for videos.
    pub sort_mode: SortMode,
    /// Sort direction for videos.
    pub sort_order: SortOrder,
    /// Scope and hidden-folder settings.
    pub exclusions: ExclusionSettings,
}

impl QueryOptions {
    /// Options with the given sort and no exclusions beyond the defaults.
    #[must_use]
    pub fn sorted(sort_mode: SortMode, sort_order: SortOrder) -> Self {
        Self {
            sort_mode,
            sort_order,
            exclusions: ExclusionSettings::default(),
        }
    }

    /// Replace the exclusion settings.
    #[must_use]
    pub fn with_exclusions(mut self, exclusions: ExclusionSettings) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// The three ways the browser asks for entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryShape {
    /// A top-level view.
    Mode(BrowseMode),
    /// The videos of one bucket.
    Folder(String),
    /// One level of the hierarchy, `""` for the volume list.
    Hierarchy(String),
}

impl QueryShape {
    /// Run this shape against `repository`.
    pub fn run(&self, repository: &dyn VideoRepository, options: &QueryOptions) -> Result<Vec<DisplayEntry>> {
        match self {
            Self::Mode(mode) => repository.load(*mode, options),
            Self::Folder(bucket_id) => repository.load_videos_in_folder(bucket_id, options),
            Self::Hierarchy(path) => repository.load_hierarchy(path, options),
        }
    }
}

/// Source of display entries for the browser.
#[cfg_attr(test, mockall::automock)]
pub trait VideoRepository: Send + Sync {
    /// Entries for a top-level view. The hierarchy view starts at the volume list.
    fn load(&self, mode: BrowseMode, options: &QueryOptions) -> Result<Vec<DisplayEntry>>;

    /// Sorted videos of one bucket.
    fn load_videos_in_folder(
        &self,
        bucket_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<DisplayEntry>>;

    /// One level of the hierarchy at `path`.
    fn load_hierarchy(&self, path: &str, options: &QueryOptions) -> Result<Vec<DisplayEntry>>;

    /// Every video at or below `path`, flat and sorted.
    fn load_videos_under_hierarchy(
        &self,
        path: &str,
        options: &QueryOptions,
    ) -> Result<Vec<DisplayEntry>>;
}

/// [`VideoRepository`] backed by a [`MediaIndex`].
#[derive(Clone)]
pub struct IndexVideoRepository {
    index: Arc<dyn MediaIndex>,
    labeler: Arc<dyn VolumeLabeler>,
}

impl std::fmt::Debug for IndexVideoRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexVideoRepository").finish_non_exhaustive()
    }
}

impl IndexVideoRepository {
    /// Repository over `index`, labelling volumes with `labeler`.
    pub fn new(index: Arc<dyn MediaIndex>, labeler: Arc<dyn VolumeLabeler>) -> Self {
        Self { index, labeler }
    }

    /// Query, filter, optionally sort, then enrich.
    fn pipeline(
        &self,
        filter: &VideoFilter,
        options: &QueryOptions,
        sort: bool,
    ) -> Result<(Vec<MediaEntry>, HiddenFolders)> {
        let adapter = IndexQueryAdapter::new(self.index.as_ref());
        let entries = adapter.query_videos(filter)?;
        let queried = entries.len();
        let (mut entries, hidden) = apply_exclusions(&adapter, entries, &options.exclusions);
        if sort {
            sort_entries(&mut entries, options.sort_mode, options.sort_order);
        }
        let entries = attach_subtitles(&adapter, entries);
        debug!(
            "Pipeline done: queried={}, visible={}, hidden_prefixes={}",
            queried,
            entries.len(),
            hidden.len()
        );
        Ok((entries, hidden))
    }

    fn hierarchy_filter(path: &str) -> VideoFilter {
        if path.is_empty() {
            VideoFilter::All
        } else {
            VideoFilter::HierarchyPath(path.to_string())
        }
    }
}

impl VideoRepository for IndexVideoRepository {
    #[instrument(skip(self, options))]
    fn load(&self, mode: BrowseMode, options: &QueryOptions) -> Result<Vec<DisplayEntry>> {
        let (entries, hidden) = self.pipeline(&VideoFilter::All, options, true)?;
        Ok(match mode {
            BrowseMode::Videos => video_items(&entries),
            BrowseMode::Folders => folder_items(&entries),
            BrowseMode::Hierarchy => HierarchyReconstructor::new(self.labeler.as_ref(), &hidden)
                .with_sort(options.sort_mode, options.sort_order)
                .level(&entries, ""),
        })
    }

    #[instrument(skip(self, options))]
    fn load_videos_in_folder(
        &self,
        bucket_id: &str,
        options: &QueryOptions,
    ) -> Result<Vec<DisplayEntry>> {
        let filter = VideoFilter::Bucket(bucket_id.to_string());
        let (entries, _) = self.pipeline(&filter, options, true)?;
        Ok(video_items(&entries))
    }

    #[instrument(skip(self, options))]
    fn load_hierarchy(&self, path: &str, options: &QueryOptions) -> Result<Vec<DisplayEntry>> {
        let (entries, hidden) = self.pipeline(&Self::hierarchy_filter(path), options, false)?;
        Ok(HierarchyReconstructor::new(self.labeler.as_ref(), &hidden)
            .with_sort(options.sort_mode, options.sort_order)
            .level(&entries, path))
    }

    #[instrument(skip(self, options))]
    fn load_videos_under_hierarchy(
        &self,
        path: &str,
        options: &QueryOptions,
    ) -> Result<Vec<DisplayEntry>> {
        let (entries, hidden) = self.pipeline(&Self::hierarchy_filter(path), options, true)?;
        let under = HierarchyReconstructor::new(self.labeler.as_ref(), &hidden)
            .videos_under(&entries, path);
        Ok(video_items(&under))
    }
}
