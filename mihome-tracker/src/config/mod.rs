//! Tracker configuration.
//!
//! [`TrackerConfig`] is the single configuration surface handed to the
//! [`Tracker`](crate::tracker::Tracker). It is usually built from a
//! [`ConfigFile`] and then adjusted with CLI overrides through the `with_*`
//! setters.

mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::fetch::RetryPolicy;
use crate::store::{MergePolicy, StorePaths};

pub use file::{default_config_path, ConfigFile};

/// Placeholder substituted with the build number in the manifest template.
pub const BUILD_NUMBER_PLACEHOLDER: &str = "{build_number}";

/// Manifest URL template for the MiHome iOS feature builds.
pub const DEFAULT_URL_TEMPLATE: &str = "https://cdn.cnbj1.fds.api.mi-img.com/mijia-ios-adhoc/AppStore/adhoc/plist/MiHome-ios-Feature-build{build_number}.plist";

/// Bundle identifier of the daily build.
pub const DEFAULT_BUNDLE_IDENTIFIER: &str = "com.xiaomi.mihome.dailybuild";

/// Default number of build numbers probed per run.
pub const DEFAULT_WINDOW_SIZE: u64 = 1000;

/// Default number of concurrent probe workers.
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Default timeout for manifest GET requests.
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for package HEAD requests.
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_secs(5);

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest URL template has no build number placeholder.
    #[error("url template {0:?} does not contain {{build_number}}")]
    MissingPlaceholder(String),

    /// A numeric setting is outside its valid range.
    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange { key: String, value: u64, min: u64 },

    /// A value in the config file could not be parsed.
    #[error("invalid value {value:?} for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// The config file could not be read or parsed.
    #[error("failed to load config {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// The config file could not be written.
    #[error("failed to save config {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Manifest URL with a `{build_number}` placeholder.
    pub url_template: String,

    /// Only manifest items with this identifier are considered.
    pub bundle_identifier: String,

    /// Number of build numbers probed after the cursor.
    pub window_size: u64,

    /// Number of concurrent workers.
    pub concurrency: usize,

    /// Retry policy for transport failures.
    pub retry: RetryPolicy,

    /// Timeout for each manifest GET.
    pub manifest_timeout: Duration,

    /// Timeout for each package HEAD.
    pub asset_timeout: Duration,

    /// Locations of the three persisted files.
    pub store: StorePaths,

    /// How new findings are merged into the persisted files.
    pub merge_policy: MergePolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            bundle_identifier: DEFAULT_BUNDLE_IDENTIFIER.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            manifest_timeout: DEFAULT_MANIFEST_TIMEOUT,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            store: StorePaths::in_dir(Path::new(".")),
            merge_policy: MergePolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Set the manifest URL template.
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    /// Set the target bundle identifier.
    pub fn with_bundle_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.bundle_identifier = identifier.into();
        self
    }

    /// Set the scan window size.
    pub fn with_window_size(mut self, size: u64) -> Self {
        self.window_size = size;
        self
    }

    /// Set the worker count.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Place the default-named store files in `dir`.
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.store = StorePaths::in_dir(dir);
        self
    }

    /// Set explicit store paths.
    pub fn with_store(mut self, store: StorePaths) -> Self {
        self.store = store;
        self
    }

    /// Set the merge policy.
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Manifest URL for one build.
    pub fn manifest_url(&self, build_number: u64) -> String {
        self.url_template
            .replace(BUILD_NUMBER_PLACEHOLDER, &build_number.to_string())
    }

    /// Check invariants the scan relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url_template.contains(BUILD_NUMBER_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder(self.url_template.clone()));
        }
        check_min("window_size", self.window_size, 1)?;
        check_min("concurrency", self.concurrency as u64, 1)?;
        check_min("retries", u64::from(self.retry.max_attempts), 1)?;
        Ok(())
    }
}

fn check_min(key: &str, value: u64, min: u64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value,
            min,
        });
    }
    Ok(())
}
