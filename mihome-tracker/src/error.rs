//! Top-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::store::StoreError;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors that abort a run.
///
/// Network problems with individual builds never surface here; they degrade
/// the affected probe to not-found.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store files could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A worker could not create its HTTP client.
    #[error("HTTP client error: {0}")]
    Client(#[from] FetchError),
}
