//! Tracing setup for processes embedding the engine.
//!
//! The library itself only emits events; a host binary decides where they
//! go. `LogSettings::from_env` reads the `STUDYTRACK_*` variables and
//! `init_tracing` installs a stdout layer plus, when a directory is
//! configured, a daily-rolling file layer.

use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "studytrack-engine.log";
const DEFAULT_LOG_DIR: &str = "./logs";

/// Keeps the file appender's worker alive; dropping it flushes pending
/// writes, so hold it for the life of the process.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// An `EnvFilter` directive string such as "info" or
    /// "studytrack_engine=debug".
    pub filter: String,
    /// When set, events are also written to daily-rolling files here.
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    /// `STUDYTRACK_LOG` for the filter, `STUDYTRACK_FILE_LOGS` to switch
    /// file output on, `STUDYTRACK_LOG_DIR` to place it.
    pub fn from_env() -> Self {
        let filter = std::env::var("STUDYTRACK_LOG").unwrap_or_else(|_| "info".to_string());
        let file_dir = if truthy(std::env::var("STUDYTRACK_FILE_LOGS").ok().as_deref()) {
            let dir = std::env::var("STUDYTRACK_LOG_DIR")
                .unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
            Some(PathBuf::from(dir))
        } else {
            None
        };
        Self { filter, file_dir }
    }
}

fn truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

fn daily_appender(dir: &Path) -> RollingFileAppender {
    RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX)
}

/// Install the global subscriber. Safe to call more than once (later calls
/// leave the first subscriber in place), which keeps it usable from tests.
pub fn init_tracing(settings: &LogSettings) -> io::Result<Option<FileLogGuard>> {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match &settings.file_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let (file_writer, guard) = tracing_appender::non_blocking(daily_appender(dir));
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true);
            let _ = registry.with(file_layer).try_init();
            Ok(Some(FileLogGuard { _guard: guard }))
        }
        None => {
            let _ = registry.try_init();
            Ok(None)
        }
    }
}
