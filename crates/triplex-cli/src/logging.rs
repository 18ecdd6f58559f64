//! Log subscriber setup.
//!
//! Events go to two places: stderr (warnings only unless verbose) and the
//! log file, which receives everything the `RUST_LOG` filter lets through
//! (default `info`).

use crate::error::{CliError, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// The log file is appended to and never rotated; missing parent directories
/// are created. File output goes through a background writer, so the
/// returned guard must be held until the run is over or buffered lines are
/// lost.
pub fn init(log_file: &Path, verbose: bool) -> Result<WorkerGuard> {
    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::InvalidInput(format!("Invalid log file: {}", log_file.display())))?;
    fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| CliError::Config(format!("Failed to open log file {}: {}", log_file.display(), e)))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_level = if verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    // A second init (e.g. in tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(stderr_level),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_log_directory() {
        let dir = TempDir::new().unwrap();
        let log_file = dir.path().join("logs").join("nested").join("triplex.log");

        let _guard = init(&log_file, false).unwrap();

        assert!(log_file.exists());
    }

    #[test]
    fn test_rejects_log_path_without_file_name() {
        let result = init(Path::new("/"), false);

        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
