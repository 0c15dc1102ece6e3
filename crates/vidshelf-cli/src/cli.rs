//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vidshelf_core::{BrowseMode, DisplayMode, SortMode, SortOrder, VolumeRoot};

/// Browse the videos on local storage volumes.
#[derive(Parser, Debug)]
#[command(name = "vidshelf", version, about = "Browse videos by folder, directory tree or flat list")]
pub struct Cli {
    /// Configuration file (default: the user config directory).
    #[arg(short, long, value_name = "FILE", env = "VIDSHELF_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Settings file (default: the user config directory).
    #[arg(long, value_name = "FILE", env = "VIDSHELF_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Extra volume to scan, as NAME=DIR. Repeatable; overrides configured volumes of the same name.
    #[arg(long = "volume", value_name = "NAME=DIR", value_parser = parse_volume, global = true)]
    pub volumes: Vec<VolumeRoot>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain, global = true)]
    pub output: OutputFormat,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not write a log file.
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Directory for log files (default: the user data directory).
    #[arg(long, value_name = "DIR", env = "VIDSHELF_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List one screen of the browser.
    Browse(BrowseArgs),
    /// List every video at or below a hierarchy path.
    PlayAll {
        /// Hierarchy path, e.g. `volume:external_primary/Movies/`.
        path: String,
        /// Override the stored sort key.
        #[arg(long)]
        sort: Option<SortMode>,
        /// Override the stored sort direction.
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// List the folders offered for the search scope.
    Folders,
    /// Show or change stored preferences.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Arguments of `browse`.
#[derive(Args, Debug, Default)]
pub struct BrowseArgs {
    /// View to list (default: the stored browse mode).
    #[arg(long)]
    pub mode: Option<BrowseMode>,
    /// Open this bucket of the folders view.
    #[arg(long, value_name = "BUCKET_ID", conflicts_with = "path")]
    pub folder: Option<String>,
    /// Open this hierarchy path.
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,
    /// Override the stored sort key.
    #[arg(long)]
    pub sort: Option<SortMode>,
    /// Override the stored sort direction.
    #[arg(long)]
    pub order: Option<SortOrder>,
    /// Skip the cached snapshot and wait for a fresh query.
    #[arg(long)]
    pub no_cache: bool,
}

/// Subcommands of `settings`.
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print every preference.
    Show,
    /// Store the browse mode.
    Mode {
        /// New value.
        mode: BrowseMode,
    },
    /// Store the list layout.
    Display {
        /// New value.
        display: DisplayMode,
    },
    /// Store the tile span (2-4).
    TileSpan {
        /// New value.
        span: u32,
    },
    /// Store the sort key and direction.
    Sort {
        /// Sort key.
        sort: SortMode,
        /// Sort direction.
        order: Option<SortOrder>,
    },
    /// Turn the `.nomedia` filter on or off.
    Nomedia {
        /// New state.
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Restrict browsing to these bucket ids; no ids means every folder.
    Scope {
        /// Allowed bucket ids.
        bucket_ids: Vec<String>,
    },
}

/// On/off argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    /// Enabled.
    On,
    /// Disabled.
    Off,
}

impl Toggle {
    /// As a flag.
    pub const fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

/// How listings are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per entry.
    Plain,
    /// A JSON array.
    Json,
}

fn parse_volume(value: &str) -> Result<VolumeRoot, String> {
    let (name, dir) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DIR, got `{value}`"))?;
    if name.is_empty() || dir.is_empty() {
        return Err(format!("expected NAME=DIR, got `{value}`"));
    }
    Ok(VolumeRoot::new(name, dir))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_arguments() {
        let cli = Cli::try_parse_from([
            "vidshelf",
            "browse",
            "--mode",
            "hierarchy",
            "--path",
            "volume:external_primary/Movies/",
            "--sort",
            "title",
            "--order",
            "asc",
            "--volume",
            "external_primary=/sdcard",
        ])
        .unwrap();

        assert_eq!(cli.volumes, vec![VolumeRoot::new("external_primary", "/sdcard")]);
        let Command::Browse(args) = cli.command else {
            panic!("expected browse");
        };
        assert_eq!(args.mode, Some(BrowseMode::Hierarchy));
        assert_eq!(args.path.as_deref(), Some("volume:external_primary/Movies/"));
        assert_eq!(args.sort, Some(SortMode::Title));
        assert_eq!(args.order, Some(SortOrder::Asc));
        assert!(!args.no_cache);
    }

    #[test]
    fn test_folder_and_path_conflict() {
        let result = Cli::try_parse_from([
            "vidshelf", "browse", "--folder", "b1", "--path", "volume:x/",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_subcommands() {
        let cli = Cli::try_parse_from(["vidshelf", "settings", "nomedia", "on"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Settings(SettingsCommand::Nomedia { state: Toggle::On })
        ));

        let cli = Cli::try_parse_from(["vidshelf", "settings", "scope", "b1", "b2"]).unwrap();
        let Command::Settings(SettingsCommand::Scope { bucket_ids }) = cli.command else {
            panic!("expected scope");
        };
        assert_eq!(bucket_ids, vec!["b1", "b2"]);
    }

    #[test]
    fn test_parse_volume() {
        assert_eq!(
            parse_volume("sd=/mnt/sd").unwrap(),
            VolumeRoot::new("sd", "/mnt/sd")
        );
        assert!(parse_volume("/mnt/sd").is_err());
        assert!(parse_volume("=/mnt/sd").is_err());
    }
}
