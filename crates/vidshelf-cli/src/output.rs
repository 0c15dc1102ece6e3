//! Printing of listings.

use anyhow::Result;
use serde_json::{Value, json};
use vidshelf_core::{DisplayEntry, FolderEntry, Settings};

use crate::cli::OutputFormat;

/// Format a millisecond duration as `h:mm:ss` or `m:ss`.
pub fn format_duration(duration_ms: i64) -> String {
    let total = duration_ms.max(0) / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

fn entry_line(entry: &DisplayEntry) -> String {
    match entry {
        DisplayEntry::Folder(folder) => {
            format!("[F] {}  ({})  {}", folder.name, folder.counts.summary(), folder.bucket_id)
        }
        DisplayEntry::HierarchyNode(node) => {
            format!("[D] {}  ({})  {}", node.name, node.counts.summary(), node.path)
        }
        DisplayEntry::Video(video) => {
            let subtitle = if video.has_subtitle { "  [sub]" } else { "" };
            format!(
                "[V] {}  {}  {}x{}{}  {}",
                video.title,
                format_duration(video.duration_ms),
                video.width,
                video.height,
                subtitle,
                video.content_uri
            )
        }
    }
}

fn entry_json(entry: &DisplayEntry) -> Value {
    match entry {
        DisplayEntry::Folder(folder) => json!({
            "type": "folder",
            "bucketId": folder.bucket_id,
            "name": folder.name,
            "videoCount": folder.counts.videos,
            "summary": folder.counts.summary(),
        }),
        DisplayEntry::HierarchyNode(node) => json!({
            "type": "directory",
            "path": node.path,
            "name": node.name,
            "videoCount": node.counts.videos,
            "folderCount": node.counts.folders,
            "totalCount": node.counts.total,
            "summary": node.counts.summary(),
        }),
        DisplayEntry::Video(video) => json!({
            "type": "video",
            "title": video.title,
            "durationMs": video.duration_ms,
            "width": video.width,
            "height": video.height,
            "sizeBytes": video.size_bytes,
            "modifiedSeconds": video.modified_seconds,
            "hasSubtitle": video.has_subtitle,
            "contentUri": video.content_uri,
        }),
    }
}

/// Print display entries.
pub fn print_entries(format: OutputFormat, entries: &[DisplayEntry]) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            for entry in entries {
                println!("{}", entry_line(entry));
            }
        }
        OutputFormat::Json => {
            let values: Vec<Value> = entries.iter().map(entry_json).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
    }
    Ok(())
}

/// Print the search folder catalogue.
pub fn print_folders(format: OutputFormat, folders: &[FolderEntry]) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            for folder in folders {
                println!(
                    "{}  {}  {}:{}  ({})",
                    folder.bucket_id, folder.name, folder.volume, folder.relative_path, folder.count
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(folders)?),
    }
    Ok(())
}

/// Print stored preferences.
pub fn print_settings(format: OutputFormat, settings: &Settings) -> Result<()> {
    let scope: Vec<&str> = settings.search_scope.allowed.iter().map(String::as_str).collect();
    match format {
        OutputFormat::Plain => {
            println!("mode: {}", settings.mode);
            println!("display: {}", settings.display_mode);
            println!("tile span: {}", settings.tile_span);
            println!("sort: {} {}", settings.sort_mode, settings.sort_order);
            println!("nomedia filter: {}", settings.nomedia_enabled);
            if settings.search_scope.use_all {
                println!("search folders: all");
            } else {
                println!("search folders: {}", scope.join(", "));
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "mode": settings.mode.as_str(),
                "display": settings.display_mode.as_str(),
                "tileSpan": settings.tile_span,
                "sort": settings.sort_mode.as_str(),
                "order": settings.sort_order.as_str(),
                "nomediaEnabled": settings.nomedia_enabled,
                "searchFoldersUseAll": settings.search_scope.use_all,
                "searchFolders": scope,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidshelf_core::{FolderCounts, HierarchyItem, VideoItem};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(61_500), "1:01");
        assert_eq!(format_duration(3_723_000), "1:02:03");
        assert_eq!(format_duration(-5), "0:00");
    }

    #[test]
    fn test_entry_lines() {
        let node = DisplayEntry::HierarchyNode(HierarchyItem {
            path: "volume:sd/Movies/".to_string(),
            name: "Movies".to_string(),
            counts: FolderCounts {
                videos: 3,
                folders: 1,
                total: 4,
            },
        });
        assert_eq!(
            entry_line(&node),
            "[D] Movies  (Video 3, Folder 1)  volume:sd/Movies/"
        );

        let video = DisplayEntry::Video(VideoItem {
            title: "a.mp4".to_string(),
            duration_ms: 90_000,
            width: 1280,
            height: 720,
            size_bytes: 1,
            modified_seconds: 0,
            frame_rate: 0.0,
            has_subtitle: true,
            content_uri: "file:///a.mp4".to_string(),
        });
        assert_eq!(entry_line(&video), "[V] a.mp4  1:30  1280x720  [sub]  file:///a.mp4");
        assert_eq!(entry_json(&video)["hasSubtitle"], json!(true));
    }
}
