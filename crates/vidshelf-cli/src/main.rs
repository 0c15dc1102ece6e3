//! `vidshelf` command-line front end.

mod cli;
mod logging;
mod output;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{Level, debug, info};
use vidshelf_core::{
    AccessState, AppConfig, BrowseMode, Browser, BrowserState, FsMediaIndex, IndexVideoRepository,
    LoadRequest, ResultCache, SearchFolderRepository, SettingsRepository, VideoRepository,
};

use cli::{BrowseArgs, Cli, Command, SettingsCommand};
use logging::LoggingConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::auto();
    if cli.verbose {
        logging_config = logging_config.with_console_level(Level::DEBUG);
    }
    if let Some(dir) = &cli.log_dir {
        logging_config = logging_config.with_log_directory(dir.clone());
    }
    if cli.no_log_file {
        logging_config = logging_config.without_file();
    }
    let _guard = logging::init(&logging_config)?;

    let settings = match &cli.settings {
        Some(path) => SettingsRepository::new(path.clone()),
        None => SettingsRepository::at_default_location(),
    };

    match &cli.command {
        Command::Settings(command) => run_settings(&cli, &settings, command),
        Command::Browse(args) => run_browse(&cli, &settings, args).await,
        Command::PlayAll { path, sort, order } => {
            let mut state = settings.load().browser_state();
            if let Some(sort) = sort {
                state.sort_mode = *sort;
            }
            if let Some(order) = order {
                state.sort_order = *order;
            }
            let (config, index) = open_index(&cli)?;
            let repository = IndexVideoRepository::new(index, Arc::new(config.volume_labels()));
            let path = path.clone();
            let options = state.query_options();
            let entries = tokio::task::spawn_blocking(move || {
                repository.load_videos_under_hierarchy(&path, &options)
            })
            .await??;
            output::print_entries(cli.output, &entries)
        }
        Command::Folders => {
            let nomedia_enabled = settings.load().nomedia_enabled;
            let (_, index) = open_index(&cli)?;
            let catalogue = SearchFolderRepository::new(index);
            let folders =
                tokio::task::spawn_blocking(move || catalogue.load(nomedia_enabled)).await??;
            output::print_folders(cli.output, &folders)
        }
    }
}

/// Load the configuration and build an index over its volumes plus any
/// given on the command line.
fn open_index(cli: &Cli) -> Result<(AppConfig, Arc<FsMediaIndex>)> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    for volume in &cli.volumes {
        config.set_volume(volume.clone());
    }
    if config.volumes.is_empty() {
        bail!("No volumes configured; pass --volume NAME=DIR or add one to the config file");
    }
    debug!("Scanning {} volumes", config.volumes.len());
    let index = Arc::new(FsMediaIndex::new(config.volumes.clone()));
    Ok((config, index))
}

/// Position the navigation state on the screen the arguments ask for.
fn browse_state(mut state: BrowserState, args: &BrowseArgs) -> BrowserState {
    if let Some(mode) = args.mode {
        state.set_mode(mode);
    }
    if let Some(bucket_id) = &args.folder {
        state.set_mode(BrowseMode::Folders);
        state.in_folder = true;
        state.selected_bucket_id = Some(bucket_id.clone());
    }
    if let Some(path) = &args.path {
        state.set_mode(BrowseMode::Hierarchy);
        state.hierarchy_path.clone_from(path);
    }
    if let Some(sort) = args.sort {
        state.sort_mode = sort;
    }
    if let Some(order) = args.order {
        state.sort_order = order;
    }
    state
}

async fn run_browse(cli: &Cli, settings: &SettingsRepository, args: &BrowseArgs) -> Result<()> {
    let (config, index) = open_index(cli)?;
    let cache = Arc::new(ResultCache::new(config.cache.clone())?);
    let repository = Arc::new(IndexVideoRepository::new(
        index,
        Arc::new(config.volume_labels()),
    ));
    let browser = Browser::new(repository, cache, config.browser.clone())?;
    let view = browser.subscribe();

    let state = browse_state(settings.load().browser_state(), args);
    let mut request = LoadRequest::new(state.query_shape(), state.query_options());
    request = if args.no_cache {
        request.refreshing()
    } else {
        request.with_cache()
    };
    info!("Browsing {:?}", request.shape);

    browser.load(request);
    browser.settle().await;

    if *view.access.borrow() == AccessState::Denied {
        bail!("Access to the media index was denied");
    }
    let entries = browser.items().unwrap_or_default();
    output::print_entries(cli.output, &entries)
}

fn run_settings(cli: &Cli, settings: &SettingsRepository, command: &SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {}
        SettingsCommand::Mode { mode } => settings.update_mode(*mode)?,
        SettingsCommand::Display { display } => settings.update_display_mode(*display)?,
        SettingsCommand::TileSpan { span } => settings.update_tile_span(*span)?,
        SettingsCommand::Sort { sort, order } => {
            settings.update_sort_mode(*sort)?;
            if let Some(order) = order {
                settings.update_sort_order(*order)?;
            }
        }
        SettingsCommand::Nomedia { state } => settings.update_nomedia_enabled(state.enabled())?,
        SettingsCommand::Scope { bucket_ids } => {
            let folders: BTreeSet<String> = bucket_ids.iter().cloned().collect();
            settings.update_search_folders(&folders, folders.is_empty())?;
        }
    }
    output::print_settings(cli.output, &settings.load())
}
