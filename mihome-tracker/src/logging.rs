//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for the version lines and the
//! progress bar. An optional log file receives the same events without ANSI
//! colors through a non-blocking writer; keep the returned guard alive until
//! exit or buffered lines are lost.
//!
//! The filter comes from `MIHOME_TRACKER_LOG` when set, otherwise from the
//! verbosity level.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the log filter.
pub const LOG_ENV_VAR: &str = "MIHOME_TRACKER_LOG";

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),

    /// The log file could not be opened.
    #[error("failed to open log file {}: {reason}", path.display())]
    File { path: PathBuf, reason: String },
}

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// 0 = warn, 1 = info, 2 = debug, 3+ = trace.
    pub verbosity: u8,
    /// Optional file receiving a copy of every event.
    pub file: Option<PathBuf>,
}

/// Filter directive for a verbosity level.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_filter(verbosity: u8) -> EnvFilter {
    match env::var(LOG_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::new(value),
        _ => EnvFilter::new(level_for(verbosity)),
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when a log file is configured.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let timer = LocalTime::new(Rfc3339);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let writer = match config.file.as_deref() {
        Some(path) => Some(file_writer(path)?),
        None => None,
    };

    let (file_layer, guard) = match writer {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(config.verbosity))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let file_error = |reason: String| LoggingError::File {
        path: path.to_path_buf(),
        reason,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| file_error("not a file path".to_string()))?
        .to_string_lossy()
        .into_owned();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| file_error(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }

    #[test]
    fn test_file_writer_requires_file_name() {
        assert!(matches!(
            file_writer(Path::new("/")),
            Err(LoggingError::File { .. })
        ));
    }

    #[test]
    fn test_file_writer_in_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let (_writer, _guard) = file_writer(&temp.path().join("tracker.log")).unwrap();
    }
}
