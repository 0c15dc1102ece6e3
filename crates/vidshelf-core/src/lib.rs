//! `Vidshelf` Core Library
//!
//! This crate provides the media-indexing side of the `Vidshelf` video browser:
//! - Typed queries against a shared media index, with defaults for missing columns
//! - Scope and `.nomedia` exclusion filters
//! - Subtitle detection for caption files sitting next to videos
//! - Folder hierarchy reconstruction across storage volumes
//! - An on-disk result cache keyed by query shape and settings
//! - A browser orchestrator that serves cached results first, then the
//!   authoritative ones, and drops superseded work
//! - Application configuration and persistent user settings
//!
//! # Error Handling
//!
//! Most failures are absorbed where they happen and degrade to an empty
//! result or a cache miss. Permission errors are the exception; see the
//! [`error`] module.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vidshelf_core::{
//!     Browser, BrowserConfig, DefaultVolumeLabels, FsMediaIndex, IndexVideoRepository,
//!     LoadRequest, QueryOptions, QueryShape, ResultCache, VolumeRoot,
//! };
//!
//! let index = Arc::new(FsMediaIndex::new(vec![VolumeRoot::new("external_primary", "/sdcard")]));
//! let repository = Arc::new(IndexVideoRepository::new(index, Arc::new(DefaultVolumeLabels::new())));
//! let browser = Browser::new(repository, Arc::new(ResultCache::disabled()), BrowserConfig::default())?;
//! browser.load(LoadRequest::new(QueryShape::Hierarchy(String::new()), QueryOptions::default()));
//! ```

mod atomic_file;
pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod filter;
pub mod fs_index;
pub mod hierarchy;
pub mod index;
pub mod model;
pub mod navigation;
pub mod repository;
pub mod search_folders;
pub mod settings;
pub mod sort;
pub mod subtitle;
pub mod volume_path;
pub mod worker;

pub use browser::{
    AccessState, Browser, BrowserConfig, BrowserView, DEFAULT_PREFETCH_LIMIT, LoadRequest,
};
pub use cache::{CACHE_VERSION, CacheConfig, CacheKey, QueryType, ResultCache, default_cache_directory};
pub use config::{AppConfig, VolumeRoot};
pub use error::{CacheError, Error, ErrorKind, FileSystemError, IndexError, Result};
pub use filter::{ExclusionSettings, HiddenFolders, NOMEDIA_MARKER, SearchScope};
pub use fs_index::{FsMediaIndex, VIDEO_EXTENSIONS, is_video_file};
pub use hierarchy::{DefaultVolumeLabels, HierarchyReconstructor, VolumeLabeler};
pub use index::{IndexQuery, IndexQueryAdapter, IndexRow, MediaIndex, VideoFilter};
pub use model::{
    BrowseMode, DisplayEntry, DisplayMode, FolderCounts, FolderItem, HierarchyItem, MediaEntry,
    SortMode, SortOrder, VideoItem,
};
pub use navigation::{BrowserState, SelectOutcome};
pub use repository::{IndexVideoRepository, QueryOptions, QueryShape, VideoRepository};
pub use search_folders::{FolderEntry, SearchFolderRepository};
pub use settings::{Settings, SettingsRepository, default_settings_path};
pub use volume_path::{PRIMARY_VOLUME, VolumePath};
