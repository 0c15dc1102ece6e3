//! Synthetic hierarchy path keys.
//!
//! The media index only knows flat `(volume, relative_path)` pairs. Hierarchy
//! navigation encodes a position in the reconstructed tree as a single string
//! key: `volume:<volume>/<relative path>/`. The same key doubles as the opaque
//! id of a [`HierarchyNode`](crate::model::DisplayEntry::HierarchyNode), so
//! selecting a node hands its id straight back in as the next path.
//!
//! The empty string is the root level, which enumerates volumes instead of
//! directories. Keys without the `volume:` prefix are accepted as bare
//! relative paths on any volume.

use std::fmt;

/// Marker that starts the volume segment of a synthetic path.
pub const VOLUME_PREFIX: &str = "volume:";

/// Name of the primary shared-storage volume. Rows with no volume belong here.
pub const PRIMARY_VOLUME: &str = "external_primary";

/// A decoded synthetic path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumePath {
    /// Storage volume name.
    pub volume: String,
    /// Volume-scoped relative directory, normalized (empty or ending in `/`).
    pub relative: String,
}

impl VolumePath {
    /// Build a path from parts, normalizing the relative directory.
    pub fn new(volume: impl Into<String>, relative: &str) -> Self {
        Self {
            volume: volume.into(),
            relative: normalize(relative),
        }
    }

    /// The root directory of `volume`.
    pub fn volume_root(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            relative: String::new(),
        }
    }

    /// Decode a synthetic key. Returns `None` when the key carries no volume prefix.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(VOLUME_PREFIX)?;
        match rest.split_once('/') {
            Some((volume, relative)) => Some(Self::new(volume, relative)),
            None => Some(Self::volume_root(rest)),
        }
    }

    /// Encode back into a synthetic key.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{VOLUME_PREFIX}{}/{}", self.volume, self.relative)
    }

    /// Key of the direct child directory `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            volume: self.volume.clone(),
            relative: format!("{}{name}/", self.relative),
        }
    }

    /// Whether this is the root of its volume.
    #[must_use]
    pub fn is_volume_root(&self) -> bool {
        self.relative.is_empty()
    }
}

impl fmt::Display for VolumePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Normalize a relative directory: backslashes become `/` and a non-empty
/// path always ends with `/`.
#[must_use]
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut normalized = path.replace('\\', "/");
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Resolve an optional volume name, defaulting to [`PRIMARY_VOLUME`].
#[must_use]
pub fn resolve_volume(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => PRIMARY_VOLUME.to_string(),
    }
}

/// Split a synthetic key into the volume filter and normalized relative
/// prefix used to query and to match entries.
#[must_use]
pub fn split_key(key: &str) -> (Option<String>, String) {
    match VolumePath::parse(key) {
        Some(path) => (Some(path.volume), path.relative),
        None => (None, normalize(key)),
    }
}

/// Parent of a synthetic key. The parent of a volume root is the root level
/// (`""`), and the root level is its own parent.
#[must_use]
pub fn parent(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

/// Last path segment of a synthetic key, used as a display title.
#[must_use]
pub fn leaf_name(key: &str) -> &str {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_root() {
        let path = VolumePath::parse("volume:external_primary/").unwrap();
        assert_eq!(path.volume, "external_primary");
        assert_eq!(path.relative, "");
        assert!(path.is_volume_root());
    }

    #[test]
    fn test_parse_without_trailing_slash() {
        let path = VolumePath::parse("volume:1234-ABCD").unwrap();
        assert_eq!(path.volume, "1234-ABCD");
        assert!(path.is_volume_root());
    }

    #[test]
    fn test_parse_nested() {
        let path = VolumePath::parse("volume:primary/Movies/Action").unwrap();
        assert_eq!(path.volume, "primary");
        assert_eq!(path.relative, "Movies/Action/");
    }

    #[test]
    fn test_parse_rejects_plain_paths() {
        assert!(VolumePath::parse("Movies/").is_none());
        assert!(VolumePath::parse("").is_none());
    }

    #[test]
    fn test_encode_round_trip() {
        let key = "volume:primary/Movies/";
        assert_eq!(VolumePath::parse(key).unwrap().encode(), key);
        let child = VolumePath::parse(key).unwrap().child("Action");
        assert_eq!(child.encode(), "volume:primary/Movies/Action/");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("Movies"), "Movies/");
        assert_eq!(normalize("Movies/"), "Movies/");
        assert_eq!(normalize("DCIM\\Camera"), "DCIM/Camera/");
    }

    #[test]
    fn test_resolve_volume() {
        assert_eq!(resolve_volume(None), PRIMARY_VOLUME);
        assert_eq!(resolve_volume(Some("")), PRIMARY_VOLUME);
        assert_eq!(resolve_volume(Some("1234-ABCD")), "1234-ABCD");
    }

    #[test]
    fn test_split_key() {
        assert_eq!(
            split_key("volume:sd/DCIM"),
            (Some("sd".to_string()), "DCIM/".to_string())
        );
        assert_eq!(split_key("Movies"), (None, "Movies/".to_string()));
        assert_eq!(split_key(""), (None, String::new()));
    }

    #[test]
    fn test_parent_walks_up_to_root() {
        assert_eq!(parent("volume:primary/Movies/Action/"), "volume:primary/Movies/");
        assert_eq!(parent("volume:primary/Movies/"), "volume:primary/");
        assert_eq!(parent("volume:primary/"), "");
        assert_eq!(parent(""), "");
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("volume:primary/Movies/Action/"), "Action");
        assert_eq!(leaf_name("Movies/"), "Movies");
    }
}
