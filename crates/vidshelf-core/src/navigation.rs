//! Navigation state of the browse screen.

use tracing::debug;

use crate::filter::ExclusionSettings;
use crate::model::{BrowseMode, DisplayEntry, SortMode, SortOrder};
use crate::repository::{QueryOptions, QueryShape};
use crate::volume_path;

/// What selecting an entry asks the caller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The state moved; reload with [`BrowserState::query_shape`].
    Navigate,
    /// Play the video behind this content locator.
    Play(String),
}

/// Where the user is and how the list is ordered and filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserState {
    /// Active top-level view.
    pub mode: BrowseMode,
    /// Inside a bucket of the folders view.
    pub in_folder: bool,
    /// Bucket opened from the folders view.
    pub selected_bucket_id: Option<String>,
    /// Display name of that bucket.
    pub selected_bucket_name: Option<String>,
    /// Current hierarchy path, `""` for the volume list.
    pub hierarchy_path: String,
    /// Sort key.
    pub sort_mode: SortMode,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Scope and hidden-folder settings.
    pub exclusions: ExclusionSettings,
}

impl BrowserState {
    /// State at the top of `mode`.
    #[must_use]
    pub fn new(mode: BrowseMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// React to the user picking `entry`.
    pub fn select(&mut self, entry: &DisplayEntry) -> SelectOutcome {
        match entry {
            DisplayEntry::Folder(folder) => {
                self.in_folder = true;
                self.selected_bucket_id = Some(folder.bucket_id.clone());
                self.selected_bucket_name = Some(folder.name.clone());
                SelectOutcome::Navigate
            }
            DisplayEntry::HierarchyNode(node) => {
                self.hierarchy_path.clone_from(&node.path);
                SelectOutcome::Navigate
            }
            DisplayEntry::Video(video) => SelectOutcome::Play(video.content_uri.clone()),
        }
    }

    /// Switch the top-level view, leaving any open folder.
    pub fn set_mode(&mut self, mode: BrowseMode) {
        debug!("Browse mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.leave_folder();
        self.hierarchy_path.clear();
    }

    /// Go up one level. Returns `false` when already at the top.
    pub fn back(&mut self) -> bool {
        if self.mode == BrowseMode::Hierarchy && !self.hierarchy_path.is_empty() {
            self.hierarchy_path = volume_path::parent(&self.hierarchy_path);
            return true;
        }
        if self.in_folder {
            self.leave_folder();
            return true;
        }
        false
    }

    fn leave_folder(&mut self) {
        self.in_folder = false;
        self.selected_bucket_id = None;
        self.selected_bucket_name = None;
    }

    /// Title for the current screen, if it differs from the mode name.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self.mode {
            BrowseMode::Folders if self.in_folder => self.selected_bucket_name.as_deref(),
            BrowseMode::Hierarchy if !self.hierarchy_path.is_empty() => {
                Some(volume_path::leaf_name(&self.hierarchy_path))
            }
            _ => None,
        }
    }

    /// Query the current screen needs.
    #[must_use]
    pub fn query_shape(&self) -> QueryShape {
        match (self.mode, &self.selected_bucket_id) {
            (BrowseMode::Folders, Some(bucket_id)) if self.in_folder => {
                QueryShape::Folder(bucket_id.clone())
            }
            (BrowseMode::Hierarchy, _) => QueryShape::Hierarchy(self.hierarchy_path.clone()),
            (mode, _) => QueryShape::Mode(mode),
        }
    }

    /// Sort and exclusion settings for queries.
    #[must_use]
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::sorted(self.sort_mode, self.sort_order).with_exclusions(self.exclusions.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{FolderCounts, FolderItem, HierarchyItem, VideoItem};

    fn folder(id: &str, name: &str) -> DisplayEntry {
        DisplayEntry::Folder(FolderItem {
            bucket_id: id.to_string(),
            name: name.to_string(),
            counts: FolderCounts::default(),
        })
    }

    fn node(path: &str) -> DisplayEntry {
        DisplayEntry::HierarchyNode(HierarchyItem {
            path: path.to_string(),
            name: volume_path::leaf_name(path).to_string(),
            counts: FolderCounts::default(),
        })
    }

    #[test]
    fn test_folder_round_trip() {
        let mut state = BrowserState::default();
        assert_eq!(state.query_shape(), QueryShape::Mode(BrowseMode::Folders));

        assert_eq!(state.select(&folder("b1", "Camera")), SelectOutcome::Navigate);
        assert_eq!(state.query_shape(), QueryShape::Folder("b1".to_string()));
        assert_eq!(state.title(), Some("Camera"));

        assert!(state.back());
        assert_eq!(state.query_shape(), QueryShape::Mode(BrowseMode::Folders));
        assert!(state.selected_bucket_id.is_none());
        assert!(!state.back());
    }

    #[test]
    fn test_hierarchy_descent_and_back() {
        let mut state = BrowserState::new(BrowseMode::Hierarchy);
        assert_eq!(state.query_shape(), QueryShape::Hierarchy(String::new()));

        state.select(&node("volume:external_primary/"));
        state.select(&node("volume:external_primary/Movies/"));
        state.select(&node("volume:external_primary/Movies/2024/"));
        assert_eq!(state.title(), Some("2024"));

        assert!(state.back());
        assert_eq!(
            state.query_shape(),
            QueryShape::Hierarchy("volume:external_primary/Movies/".to_string())
        );
        assert!(state.back());
        assert!(state.back());
        assert_eq!(state.query_shape(), QueryShape::Hierarchy(String::new()));
        assert!(!state.back());
    }

    #[test]
    fn test_video_selection_plays() {
        let mut state = BrowserState::new(BrowseMode::Videos);
        let video = DisplayEntry::Video(VideoItem {
            title: "clip.mp4".to_string(),
            duration_ms: 0,
            width: 0,
            height: 0,
            size_bytes: 0,
            modified_seconds: 0,
            frame_rate: 0.0,
            has_subtitle: false,
            content_uri: "content://media/external/video/media/7".to_string(),
        });
        assert_eq!(
            state.select(&video),
            SelectOutcome::Play("content://media/external/video/media/7".to_string())
        );
        assert_eq!(state.query_shape(), QueryShape::Mode(BrowseMode::Videos));
    }

    #[test]
    fn test_set_mode_resets_position() {
        let mut state = BrowserState::default();
        state.select(&folder("b1", "Camera"));
        state.set_mode(BrowseMode::Hierarchy);
        assert!(!state.in_folder);
        assert_eq!(state.hierarchy_path, "");

        state.select(&node("volume:x/"));
        state.set_mode(BrowseMode::Videos);
        assert_eq!(state.hierarchy_path, "");
        assert_eq!(state.query_shape(), QueryShape::Mode(BrowseMode::Videos));
    }

    #[test]
    fn test_query_options_follow_state() {
        let state = BrowserState {
            sort_mode: SortMode::Title,
            sort_order: SortOrder::Asc,
            ..BrowserState::default()
        };
        let options = state.query_options();
        assert_eq!(options.sort_mode, SortMode::Title);
        assert_eq!(options.sort_order, SortOrder::Asc);
    }
}
