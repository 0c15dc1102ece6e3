//! Persistent user preferences.
//!
//! Preferences live in a flat JSON object, one key per setting. Each key is
//! read on its own: a missing or malformed value falls back to that
//! setting's default without affecting the others.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::atomic_file::{RenameFallback, write_atomically};
use crate::error::Result;
use crate::filter::{ExclusionSettings, SearchScope};
use crate::model::{BrowseMode, DisplayMode, SortMode, SortOrder};
use crate::navigation::BrowserState;

const KEY_MODE: &str = "video_mode";
const KEY_DISPLAY: &str = "video_display";
const KEY_TILE_SPAN: &str = "video_tile_span";
const KEY_SORT: &str = "video_sort";
const KEY_SORT_ORDER: &str = "video_sort_order";
const KEY_NOMEDIA: &str = "nomedia_enabled";
const KEY_SEARCH_FOLDERS: &str = "search_folders";
const KEY_SEARCH_FOLDERS_USE_ALL: &str = "search_folders_use_all";

/// Tile spans the grid layout accepts.
pub const TILE_SPANS: [u32; 3] = [2, 3, 4];

/// Default tile span.
pub const DEFAULT_TILE_SPAN: u32 = 2;

/// Snapshot of every preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Top-level view.
    pub mode: BrowseMode,
    /// List or tile layout.
    pub display_mode: DisplayMode,
    /// Columns in tile layout.
    pub tile_span: u32,
    /// Sort key.
    pub sort_mode: SortMode,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Hide folders holding a `.nomedia` marker.
    pub nomedia_enabled: bool,
    /// Buckets to show.
    pub search_scope: SearchScope,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: BrowseMode::Folders,
            display_mode: DisplayMode::List,
            tile_span: DEFAULT_TILE_SPAN,
            sort_mode: SortMode::Modified,
            sort_order: SortOrder::Desc,
            nomedia_enabled: false,
            search_scope: SearchScope::all(),
        }
    }
}

impl Settings {
    /// Exclusion settings for queries.
    #[must_use]
    pub fn exclusions(&self) -> ExclusionSettings {
        ExclusionSettings {
            nomedia_enabled: self.nomedia_enabled,
            scope: self.search_scope.clone(),
        }
    }

    /// Navigation state at the top of the stored view.
    #[must_use]
    pub fn browser_state(&self) -> BrowserState {
        BrowserState {
            sort_mode: self.sort_mode,
            sort_order: self.sort_order,
            exclusions: self.exclusions(),
            ..BrowserState::new(self.mode)
        }
    }
}

/// Reads and writes [`Settings`] in a JSON file.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    path: PathBuf,
}

impl SettingsRepository {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location.
    #[must_use]
    pub fn at_default_location() -> Self {
        Self::new(default_settings_path())
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. Never fails: unreadable values become defaults.
    #[must_use]
    pub fn load(&self) -> Settings {
        let values = self.read_values();
        let defaults = Settings::default();

        let tile_span = match values.get(KEY_TILE_SPAN).and_then(Value::as_u64) {
            Some(span) if TILE_SPANS.iter().any(|&s| u64::from(s) == span) => span as u32,
            _ => DEFAULT_TILE_SPAN,
        };
        let search_scope = SearchScope {
            use_all: bool_value(&values, KEY_SEARCH_FOLDERS_USE_ALL)
                .unwrap_or(defaults.search_scope.use_all),
            allowed: values
                .get(KEY_SEARCH_FOLDERS)
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Settings {
            mode: keyword(&values, KEY_MODE).unwrap_or(defaults.mode),
            display_mode: keyword(&values, KEY_DISPLAY).unwrap_or(defaults.display_mode),
            tile_span,
            sort_mode: keyword(&values, KEY_SORT).unwrap_or(defaults.sort_mode),
            sort_order: keyword(&values, KEY_SORT_ORDER).unwrap_or(defaults.sort_order),
            nomedia_enabled: bool_value(&values, KEY_NOMEDIA).unwrap_or(defaults.nomedia_enabled),
            search_scope,
        }
    }

    /// Persist the browse mode.
    pub fn update_mode(&self, mode: BrowseMode) -> Result<()> {
        self.put(KEY_MODE, Value::from(mode.as_str()))
    }

    /// Persist the display mode.
    pub fn update_display_mode(&self, display_mode: DisplayMode) -> Result<()> {
        self.put(KEY_DISPLAY, Value::from(display_mode.as_str()))
    }

    /// Persist the tile span. Out-of-range values are stored as given and
    /// read back as the default.
    pub fn update_tile_span(&self, tile_span: u32) -> Result<()> {
        self.put(KEY_TILE_SPAN, Value::from(tile_span))
    }

    /// Persist the sort key.
    pub fn update_sort_mode(&self, sort_mode: SortMode) -> Result<()> {
        self.put(KEY_SORT, Value::from(sort_mode.as_str()))
    }

    /// Persist the sort direction.
    pub fn update_sort_order(&self, sort_order: SortOrder) -> Result<()> {
        self.put(KEY_SORT_ORDER, Value::from(sort_order.as_str()))
    }

    /// Persist the hidden-folder flag.
    pub fn update_nomedia_enabled(&self, enabled: bool) -> Result<()> {
        self.put(KEY_NOMEDIA, Value::from(enabled))
    }

    /// Persist the search scope.
    pub fn update_search_folders(&self, folders: &BTreeSet<String>, use_all: bool) -> Result<()> {
        self.update(|values| {
            values.insert(
                KEY_SEARCH_FOLDERS.to_string(),
                Value::from(folders.iter().cloned().collect::<Vec<_>>()),
            );
            values.insert(KEY_SEARCH_FOLDERS_USE_ALL.to_string(), Value::from(use_all));
        })
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn update(&self, edit: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let mut values = self.read_values();
        edit(&mut values);
        self.write_values(&values)
    }

    fn read_values(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!("Failed to read settings {}: {}", self.path.display(), e);
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(values)) => values,
            Ok(_) | Err(_) => {
                warn!("Ignoring malformed settings file {}", self.path.display());
                Map::new()
            }
        }
    }

    fn write_values(&self, values: &Map<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(values)?;
        write_atomically(&self.path, content.as_bytes(), RenameFallback::Fail)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

fn keyword<T: FromStr>(values: &Map<String, Value>, key: &str) -> Option<T> {
    values.get(key)?.as_str()?.parse().ok()
}

fn bool_value(values: &Map<String, Value>, key: &str) -> Option<bool> {
    values.get(key)?.as_bool()
}

/// Default settings file under the user's config directory.
#[must_use]
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidshelf")
        .join("settings.json")
}
