//! Tracing setup for export runs.
//!
//! A run logs to stdout and to [`RUN_LOG_FILE_NAME`] inside its output
//! directory, so the log of an export sits next to the `examples.jsonl` it
//! describes. Each run starts the file afresh.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use time::{UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// File name of the run log inside the output directory.
pub const RUN_LOG_FILE_NAME: &str = "clipprep-export.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create run log at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Open run log. Buffered lines are flushed when it is dropped.
#[must_use = "dropping the run log stops writing to its file"]
pub struct RunLog {
    path: PathBuf,
    _guard: WorkerGuard,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Route tracing output to stdout and to the run log in `out_dir`.
///
/// Installs the global subscriber, so it succeeds once per process.
pub fn init(out_dir: &Path) -> Result<RunLog, LoggingError> {
    let log_path = start_run_log(out_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::never(out_dir, RUN_LOG_FILE_NAME));

    let timer = build_timer();
    let stdout_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stdout);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_timer(timer)
        .with_writer(file_writer);

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(stdout_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;

    tracing::info!(
        "clipprep {} writing into {}",
        env!("CARGO_PKG_VERSION"),
        out_dir.display()
    );
    Ok(RunLog {
        path: log_path,
        _guard: guard,
    })
}

/// Create `out_dir` if needed and truncate any log left by an earlier run.
fn start_run_log(out_dir: &Path) -> Result<PathBuf, LoggingError> {
    fs::create_dir_all(out_dir).map_err(|source| LoggingError::CreateDir {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let path = out_dir.join(RUN_LOG_FILE_NAME);
    File::create(&path).map_err(|source| LoggingError::CreateLogFile {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
