//! Structured logging for the command-line front end.
//!
//! - Human-readable console output on stderr, so listings on stdout stay clean
//! - Optional JSON file output with rotation, written off the calling thread
//! - `RUST_LOG` overrides the console filter

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events pass the console filter at the configured level.
const OWN_TARGETS: [&str; 2] = ["vidshelf", "vidshelf_core"];

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are stored.
    pub log_directory: PathBuf,
    /// Maximum level printed on stderr.
    pub console_level: Level,
    /// Maximum level written to the log file.
    pub file_level: Level,
    /// How often the log file rotates.
    pub rotation: Rotation,
    /// Write the JSON log file at all.
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LoggingConfig {
    /// Verbose logging for local debugging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_level: Level::DEBUG,
            file_level: Level::TRACE,
            rotation: Rotation::HOURLY,
            file_enabled: true,
        }
    }

    /// Quiet console, file logs at debug.
    #[must_use]
    pub fn production() -> Self {
        Self {
            log_directory: default_log_directory(),
            console_level: Level::WARN,
            file_level: Level::DEBUG,
            rotation: Rotation::DAILY,
            file_enabled: true,
        }
    }

    /// Development config in debug builds, production otherwise.
    #[must_use]
    pub fn auto() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_directory(mut self, path: PathBuf) -> Self {
        self.log_directory = path;
        self
    }

    /// Set the console log level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// Turn the log file off.
    #[must_use]
    pub const fn without_file(mut self) -> Self {
        self.file_enabled = false;
        self
    }

    /// Console filter used when `RUST_LOG` is unset.
    fn console_directive(&self) -> String {
        let level = level_to_directive(self.console_level);
        std::iter::once("warn".to_string())
            .chain(OWN_TARGETS.iter().map(|target| format!("{target}={level}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Keeps file logging alive. Drop it to flush pending entries.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_directive()));

    // Module paths only help once debug output is on.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(config.console_level >= Level::DEBUG)
        .with_filter(console_filter);

    let (file_layer, file_guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory).map_err(|e| {
            LoggingError::DirectoryCreationFailed {
                path: config.log_directory.clone(),
                reason: e.to_string(),
            }
        })?;
        let file_appender =
            RollingFileAppender::new(config.rotation.clone(), &config.log_directory, "vidshelf");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let file_filter = EnvFilter::new(level_to_directive(config.file_level));
        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(file_filter);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Default log directory.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidshelf")
        .join("logs")
}

fn level_to_directive(level: Level) -> &'static str {
    if level == Level::TRACE {
        "trace"
    } else if level == Level::DEBUG {
        "debug"
    } else if level == Level::INFO {
        "info"
    } else if level == Level::WARN {
        "warn"
    } else {
        "error"
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create the log directory.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
