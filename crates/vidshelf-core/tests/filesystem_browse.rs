//! Browse pipeline over real directories.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use filetime::{FileTime, set_file_mtime};
use tempfile::TempDir;
use vidshelf_core::{
    BrowseMode, DefaultVolumeLabels, DisplayEntry, ExclusionSettings, FsMediaIndex,
    IndexVideoRepository, QueryOptions, SearchFolderRepository, SearchScope, SortMode, SortOrder,
    VideoRepository, VolumeRoot,
};

fn touch(root: &Path, relative: &str, mtime: i64) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"data").unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

fn repository(root: &Path) -> (Arc<FsMediaIndex>, IndexVideoRepository) {
    let index = Arc::new(FsMediaIndex::new(vec![VolumeRoot::new("primary", root)]));
    let repository = IndexVideoRepository::new(index.clone(), Arc::new(DefaultVolumeLabels::new()));
    (index, repository)
}

fn titles(items: &[DisplayEntry]) -> Vec<&str> {
    items.iter().map(DisplayEntry::title).collect()
}

fn movies_library() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    touch(temp_dir.path(), "Movies/a.mp4", 300);
    touch(temp_dir.path(), "Movies/b.mp4", 200);
    touch(temp_dir.path(), "Movies/Action/c.mp4", 100);
    temp_dir
}

#[test]
fn test_hierarchy_walk_over_directories() {
    let temp_dir = movies_library();
    let (_, repo) = repository(temp_dir.path());
    let options = QueryOptions::sorted(SortMode::Title, SortOrder::Asc);

    let roots = repo.load_hierarchy("", &options).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id(), Some("volume:primary/"));
    assert_eq!(roots[0].title(), "External storage (primary)");

    let volume = repo.load_hierarchy("volume:primary/", &options).unwrap();
    assert_eq!(titles(&volume), vec!["Movies"]);
    let counts = volume[0].counts().unwrap();
    assert_eq!((counts.videos, counts.folders, counts.total), (2, 1, 3));

    let movies = repo.load_hierarchy("volume:primary/Movies/", &options).unwrap();
    assert_eq!(titles(&movies), vec!["Action", "a.mp4", "b.mp4"]);
    assert!(!movies[0].is_video());
    assert_eq!(movies[0].id(), Some("volume:primary/Movies/Action/"));
    assert!(movies[1].content_uri().unwrap().starts_with("file://"));
}

#[test]
fn test_subtitle_beside_video() {
    let temp_dir = movies_library();
    touch(temp_dir.path(), "Movies/A.SRT", 1);
    touch(temp_dir.path(), "Movies/Action/b.srt", 1);
    let (_, repo) = repository(temp_dir.path());

    let movies = repo
        .load_hierarchy("volume:primary/Movies/", &QueryOptions::default())
        .unwrap();
    for item in &movies {
        if let DisplayEntry::Video(video) = item {
            assert_eq!(video.has_subtitle, video.title == "a.mp4", "{}", video.title);
        }
    }
}

#[test]
fn test_scope_excludes_bucket_from_every_shape() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    touch(temp_dir.path(), "Keep/x.mp4", 1);
    touch(temp_dir.path(), "Drop/y.mp4", 2);
    let (index, repo) = repository(temp_dir.path());

    let folders = SearchFolderRepository::new(index).load(false).unwrap();
    let keep = folders.iter().find(|f| f.name == "Keep").unwrap();
    let drop = folders.iter().find(|f| f.name == "Drop").unwrap();
    let options = QueryOptions::default().with_exclusions(ExclusionSettings {
        nomedia_enabled: false,
        scope: SearchScope::only([keep.bucket_id.clone()]),
    });

    for mode in [BrowseMode::Folders, BrowseMode::Videos, BrowseMode::Hierarchy] {
        let items = repo.load(mode, &options).unwrap();
        assert!(!titles(&items).contains(&"Drop"));
        assert!(!titles(&items).contains(&"y.mp4"));
    }
    assert!(repo.load_videos_in_folder(&drop.bucket_id, &options).unwrap().is_empty());
    assert_eq!(repo.load_videos_in_folder(&keep.bucket_id, &options).unwrap().len(), 1);
    let top = repo.load_hierarchy("volume:primary/", &options).unwrap();
    assert_eq!(titles(&top), vec!["Keep"]);
}

#[test]
fn test_nomedia_hides_directory_and_descendants() {
    let temp_dir = movies_library();
    touch(temp_dir.path(), "Movies/Action/.nomedia", 1);
    let (_, repo) = repository(temp_dir.path());
    let options = QueryOptions::default().with_exclusions(ExclusionSettings {
        nomedia_enabled: true,
        scope: SearchScope::all(),
    });

    let movies = repo.load_hierarchy("volume:primary/Movies/", &options).unwrap();
    assert!(!titles(&movies).contains(&"Action"));
    let videos = repo.load(BrowseMode::Videos, &options).unwrap();
    assert_eq!(videos.len(), 2);

    let unfiltered = repo.load(BrowseMode::Videos, &QueryOptions::default()).unwrap();
    assert_eq!(unfiltered.len(), 3);
}

#[test]
fn test_videos_mode_sorted_by_modification_time() {
    let temp_dir = movies_library();
    let (_, repo) = repository(temp_dir.path());

    let newest_first = repo.load(BrowseMode::Videos, &QueryOptions::default()).unwrap();
    assert_eq!(titles(&newest_first), vec!["a.mp4", "b.mp4", "c.mp4"]);

    let oldest_first = repo
        .load(
            BrowseMode::Videos,
            &QueryOptions::sorted(SortMode::Modified, SortOrder::Asc),
        )
        .unwrap();
    assert_eq!(titles(&oldest_first), vec!["c.mp4", "b.mp4", "a.mp4"]);
}

#[test]
fn test_missing_volume_root_degrades_to_empty() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let (_, repo) = repository(&temp_dir.path().join("unmounted"));
    let items = repo.load(BrowseMode::Folders, &QueryOptions::default()).unwrap();
    assert!(items.is_empty());
}

#[test]
fn test_unmounted_volume_does_not_hide_mounted_one() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let internal = temp_dir.path().join("internal");
    touch(&internal, "Movies/a.mp4", 100);
    let index = Arc::new(FsMediaIndex::new(vec![
        VolumeRoot::new("external_primary", &internal),
        VolumeRoot::new("sdcard", temp_dir.path().join("unmounted")),
    ]));
    let repo = IndexVideoRepository::new(index, Arc::new(DefaultVolumeLabels::new()));

    let videos = repo.load(BrowseMode::Videos, &QueryOptions::default()).unwrap();
    assert_eq!(titles(&videos), vec!["a.mp4"]);
    let roots = repo.load_hierarchy("", &QueryOptions::default()).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id(), Some("volume:external_primary/"));
}
