//! Application configuration management.
//!
//! Handles loading and saving the JSON configuration: cache and browser
//! settings plus the storage volumes the filesystem index scans.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::browser::BrowserConfig;
use crate::cache::CacheConfig;
use crate::error::{Error, FileSystemError, Result};
use crate::hierarchy::DefaultVolumeLabels;
use crate::volume_path::PRIMARY_VOLUME;

/// A storage volume mounted at a local directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeRoot {
    /// Volume name as used in synthetic paths.
    pub name: String,
    /// Directory holding the volume's files.
    pub root: PathBuf,
    /// Display label overriding the default one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl VolumeRoot {
    /// Volume `name` rooted at `root`.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            label: None,
        }
    }

    /// Set the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Result cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Orchestrator configuration.
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Volumes scanned by the filesystem index.
    #[serde(default)]
    pub volumes: Vec<VolumeRoot>,
    /// Volume labelled as internal storage.
    #[serde(default = "default_primary_volume")]
    pub primary_volume: String,
}

fn default_primary_volume() -> String {
    PRIMARY_VOLUME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            browser: BrowserConfig::default(),
            volumes: Vec::new(),
            primary_volume: default_primary_volume(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::FileSystem(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to read config file: {e}"),
            })
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        debug!("Configured volumes: {}", config.volumes.len());
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Error::FileSystem(FileSystemError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    reason: format!("Failed to create config directory: {e}"),
                })
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            Error::FileSystem(FileSystemError::WriteFailed {
                path: path.to_path_buf(),
                reason: format!("Failed to write config file: {e}"),
            })
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Check volume names are present and unique.
    pub fn validate(&self) -> Result<()> {
        if self.primary_volume.is_empty() {
            return Err(Error::Configuration(
                "Primary volume name must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for volume in &self.volumes {
            if volume.name.is_empty() {
                return Err(Error::Configuration(format!(
                    "Volume at {} has no name",
                    volume.root.display()
                )));
            }
            if !seen.insert(volume.name.as_str()) {
                return Err(Error::Configuration(format!(
                    "Duplicate volume name: {}",
                    volume.name
                )));
            }
        }
        Ok(())
    }

    /// Add or replace a volume.
    pub fn set_volume(&mut self, volume: VolumeRoot) {
        match self.volumes.iter_mut().find(|v| v.name == volume.name) {
            Some(existing) => *existing = volume,
            None => self.volumes.push(volume),
        }
    }

    /// Volume labels: the configured primary volume reads as internal
    /// storage, and explicit labels win over both defaults.
    #[must_use]
    pub fn volume_labels(&self) -> DefaultVolumeLabels {
        let mut labels = DefaultVolumeLabels::new();
        if self.primary_volume != PRIMARY_VOLUME {
            labels = labels.with_label(self.primary_volume.clone(), "Internal storage");
        }
        for volume in &self.volumes {
            if let Some(label) = &volume.label {
                labels = labels.with_label(volume.name.clone(), label.clone());
            }
        }
        labels
    }

    /// Path of the default config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("vidshelf")
        .join("config.json")
}
