//! File logging bootstrap.
//!
//! The returned [`LoggerHandle`] is the logger's lifetime: keep it alive in
//! `main` and drop it on exit to flush buffered lines.

use std::path::Path;

use flexi_logger::{FileSpec, FlexiLoggerError, Logger, LoggerHandle, WriteMode};
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "evcal";

/// Logger setup failure.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Level other than trace, debug, info, warn or error.
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    InvalidLevel(String),
    /// Log directory could not be created.
    #[error("failed to create log directory `{path}`: {source}")]
    Directory {
        /// Directory path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Backend refused to start.
    #[error("failed to start logger: {0}")]
    Backend(#[from] FlexiLoggerError),
}

/// Starts appending log lines to `<log_dir>/evcal_*.log`.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<LoggerHandle, LoggingError> {
    let level = normalize_level(level)?;
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::Directory {
        path: log_dir.display().to_string(),
        source,
    })?;

    let handle = Logger::try_with_str(level)?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    log::info!(
        target: "system",
        "app started version={} level={level} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(handle)
}

/// Maps accepted spellings onto the canonical level names.
pub fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::InvalidLevel(other.to_string())),
    }
}
