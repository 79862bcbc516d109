//! CLI error type.

use std::fmt;

use mihome_tracker::config::ConfigError;
use mihome_tracker::logging::LoggingError;
use mihome_tracker::TrackerError;

/// Errors surfaced to the user before exiting with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, resolved, or written.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// A run, probe, or status query failed.
    Tracker(TrackerError),
    /// Output could not be rendered.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Tracker(e) => write!(f, "{}", e),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<TrackerError> for CliError {
    fn from(e: TrackerError) -> Self {
        CliError::Tracker(e)
    }
}
