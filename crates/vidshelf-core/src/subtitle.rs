//! Subtitle presence enrichment.
//!
//! A video has a subtitle when a caption file in the same directory has the
//! same basename, or a basename that extends it with a dot-separated tag
//! (`movie.mp4` matches `movie.srt` and `movie.en.srt`). Lookups are batched
//! per directory, never per video.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::index::{Column, IndexQueryAdapter, Selection};
use crate::model::MediaEntry;

/// Caption file extensions, lowercase.
pub const SUBTITLE_EXTENSIONS: [&str; 5] = ["srt", "vtt", "ass", "ssa", "sub"];

/// Lowercased basename of `name` if it is a caption file.
fn caption_basename(name: &str) -> Option<String> {
    let (base, extension) = name.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    if base.is_empty() || !SUBTITLE_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }
    Some(base.to_lowercase())
}

fn has_matching_caption(video_base: &str, captions: &HashSet<String>) -> bool {
    let tagged_prefix = format!("{video_base}.");
    captions
        .iter()
        .any(|caption| caption == video_base || caption.starts_with(&tagged_prefix))
}

/// Return a copy of `entries` with the subtitle flag set from the caption
/// files found next to each video.
#[must_use]
pub fn attach_subtitles(adapter: &IndexQueryAdapter<'_>, entries: Vec<MediaEntry>) -> Vec<MediaEntry> {
    if entries.is_empty() {
        return entries;
    }

    let mut directories: Vec<(&str, &str)> = Vec::new();
    let mut seen = HashSet::new();
    for entry in &entries {
        if entry.relative_path.is_empty() {
            continue;
        }
        let key = (entry.volume.as_str(), entry.relative_path.as_str());
        if seen.insert(key) {
            directories.push(key);
        }
    }

    let mut captions: HashMap<(String, String), HashSet<String>> = HashMap::new();
    for (volume, relative_path) in directories {
        let rows = adapter.query_files(
            volume,
            vec![Column::DisplayName],
            Selection::RelativePathEquals(relative_path.to_string()),
        );
        let names: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.text(Column::DisplayName))
            .filter_map(|name| caption_basename(&name))
            .collect();
        if !names.is_empty() {
            captions.insert((volume.to_string(), relative_path.to_string()), names);
        }
    }
    debug!("Caption lookup found {} directories with captions", captions.len());

    if captions.is_empty() {
        return entries;
    }

    entries
        .into_iter()
        .map(|entry| {
            let base = entry.basename().to_lowercase();
            if base.is_empty() {
                return entry;
            }
            let found = captions
                .get(&(entry.volume.clone(), entry.relative_path.clone()))
                .is_some_and(|names| has_matching_caption(&base, names));
            if found == entry.has_subtitle {
                entry
            } else {
                entry.with_subtitle(found)
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::index::testing::MemoryIndex;
    use crate::index::{IndexRow, Location, MockMediaIndex, VideoFilter};

    fn names_of(entries: &[MediaEntry]) -> Vec<(String, bool)> {
        entries
            .iter()
            .map(|e| (e.display_name.clone(), e.has_subtitle))
            .collect()
    }

    #[test]
    fn test_caption_beside_video_sets_flag() {
        let index = MemoryIndex::new()
            .video("primary", "Movies/a.mp4")
            .file("primary", "Movies/a.srt")
            .video("primary", "Movies/b.mp4");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();

        let enriched = attach_subtitles(&adapter, entries);
        assert_eq!(
            names_of(&enriched),
            vec![("a.mp4".to_string(), true), ("b.mp4".to_string(), false)]
        );
    }

    #[test]
    fn test_language_tagged_and_case_insensitive() {
        let index = MemoryIndex::new()
            .video("primary", "Movies/Movie.MKV")
            .file("primary", "Movies/movie.EN.SRT")
            .video("primary", "Movies/movies.mp4");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();

        let enriched = attach_subtitles(&adapter, entries);
        assert!(enriched[0].has_subtitle);
        // "movie.en" does not start with "movies."
        assert!(!enriched[1].has_subtitle);
    }

    #[test]
    fn test_non_caption_files_are_ignored() {
        let index = MemoryIndex::new()
            .video("primary", "Movies/a.mp4")
            .file("primary", "Movies/a.txt");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        assert!(!attach_subtitles(&adapter, entries)[0].has_subtitle);
    }

    #[test]
    fn test_caption_in_other_directory_does_not_match() {
        let index = MemoryIndex::new()
            .video("primary", "Movies/a.mp4")
            .file("primary", "Other/a.srt");
        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        assert!(!attach_subtitles(&adapter, entries)[0].has_subtitle);
    }

    #[test]
    fn test_one_lookup_per_directory() {
        let mut index = MockMediaIndex::new();
        index.expect_supports_frame_rate().return_const(false);
        index.expect_content_uri().returning(|id| id.to_string());
        index
            .expect_query()
            .withf(|q| matches!(q.location, Location::Videos { .. }))
            .times(1)
            .returning(|_| {
                Ok((1..=5)
                    .map(|id| {
                        IndexRow::new()
                            .with_int(Column::Id, id)
                            .with_text(Column::DisplayName, format!("clip{id}.mp4"))
                            .with_text(Column::RelativePath, "Movies/")
                    })
                    .collect())
            });
        index
            .expect_query()
            .withf(|q| {
                matches!(q.location, Location::Files { .. })
                    && q.selection == Some(Selection::RelativePathEquals("Movies/".to_string()))
            })
            .times(1)
            .returning(|_| Ok(vec![IndexRow::new().with_text(Column::DisplayName, "clip3.srt")]));

        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        let enriched = attach_subtitles(&adapter, entries);

        let flagged: Vec<_> = enriched.iter().filter(|e| e.has_subtitle).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].display_name, "clip3.mp4");
    }

    #[test]
    fn test_lookup_failure_leaves_entries_unflagged() {
        let mut index = MockMediaIndex::new();
        index.expect_supports_frame_rate().return_const(false);
        index.expect_content_uri().returning(|id| id.to_string());
        index
            .expect_query()
            .withf(|q| matches!(q.location, Location::Videos { .. }))
            .returning(|_| {
                Ok(vec![
                    IndexRow::new()
                        .with_int(Column::Id, 1)
                        .with_text(Column::DisplayName, "a.mp4")
                        .with_text(Column::RelativePath, "Movies/"),
                ])
            });
        index
            .expect_query()
            .withf(|q| matches!(q.location, Location::Files { .. }))
            .returning(|_| {
                Err(IndexError::Unavailable {
                    reason: "busy".to_string(),
                })
            });

        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        assert!(!attach_subtitles(&adapter, entries)[0].has_subtitle);
    }

    #[test]
    fn test_entries_without_directory_are_skipped() {
        let mut index = MockMediaIndex::new();
        index.expect_supports_frame_rate().return_const(false);
        index.expect_content_uri().returning(|id| id.to_string());
        index
            .expect_query()
            .withf(|q| matches!(q.location, Location::Videos { .. }))
            .returning(|_| {
                Ok(vec![
                    IndexRow::new()
                        .with_int(Column::Id, 1)
                        .with_text(Column::DisplayName, "root.mp4"),
                ])
            });
        index
            .expect_query()
            .withf(|q| matches!(q.location, Location::Files { .. }))
            .times(0);

        let adapter = IndexQueryAdapter::new(&index);
        let entries = adapter.query_videos(&VideoFilter::All).unwrap();
        assert!(!attach_subtitles(&adapter, entries)[0].has_subtitle);
    }

    #[test]
    fn test_caption_basename() {
        assert_eq!(caption_basename("Movie.EN.srt"), Some("movie.en".to_string()));
        assert_eq!(caption_basename("movie.SUB"), Some("movie".to_string()));
        assert_eq!(caption_basename(".srt"), None);
        assert_eq!(caption_basename("movie"), None);
        assert_eq!(caption_basename("movie.mp4"), None);
    }
}
