//! INI configuration file.
//!
//! ```ini
//! [source]
//! url_template = https://cdn.example/plist/MiHome-ios-Feature-build{build_number}.plist
//! bundle_identifier = com.xiaomi.mihome.dailybuild
//!
//! [scan]
//! window = 1000
//! concurrency = 64
//! retries = 3
//! retry_delay_ms = 1000
//! manifest_timeout_secs = 10
//! asset_timeout_secs = 5
//!
//! [store]
//! directory = ~/mihome-feed
//! all_file = MiHome-iOS.all.txt
//! cursor_file = MiHome-iOS.cache.txt
//! latest_file = MiHome-iOS.latest.txt
//! merge_policy = full
//! ```
//!
//! Every key is optional. A missing file yields the defaults.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::debug;

use super::{
    ConfigError, TrackerConfig, DEFAULT_ASSET_TIMEOUT, DEFAULT_BUNDLE_IDENTIFIER,
    DEFAULT_CONCURRENCY, DEFAULT_MANIFEST_TIMEOUT, DEFAULT_URL_TEMPLATE, DEFAULT_WINDOW_SIZE,
};
use crate::fetch::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use crate::store::{
    MergePolicy, StorePaths, DEFAULT_ALL_FILE, DEFAULT_CURSOR_FILE, DEFAULT_LATEST_FILE,
};

const SOURCE: &str = "source";
const SCAN: &str = "scan";
const STORE: &str = "store";

/// Default config file location: `<config_dir>/mihome-tracker/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mihome-tracker").join("config.ini"))
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub url_template: String,
    pub bundle_identifier: String,
}

/// `[scan]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub window: u64,
    pub concurrency: usize,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub manifest_timeout_secs: u64,
    pub asset_timeout_secs: u64,
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub directory: PathBuf,
    pub all_file: String,
    pub cursor_file: String,
    pub latest_file: String,
    pub merge_policy: MergePolicy,
}

/// Parsed configuration file with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub scan: ScanSettings,
    pub store: StoreSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceSettings {
                url_template: DEFAULT_URL_TEMPLATE.to_string(),
                bundle_identifier: DEFAULT_BUNDLE_IDENTIFIER.to_string(),
            },
            scan: ScanSettings {
                window: DEFAULT_WINDOW_SIZE,
                concurrency: DEFAULT_CONCURRENCY,
                retries: DEFAULT_MAX_ATTEMPTS,
                retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
                manifest_timeout_secs: DEFAULT_MANIFEST_TIMEOUT.as_secs(),
                asset_timeout_secs: DEFAULT_ASSET_TIMEOUT.as_secs(),
            },
            store: StoreSettings {
                directory: PathBuf::from("."),
                all_file: DEFAULT_ALL_FILE.to_string(),
                cursor_file: DEFAULT_CURSOR_FILE.to_string(),
                latest_file: DEFAULT_LATEST_FILE.to_string(),
                merge_policy: MergePolicy::default(),
            },
        }
    }
}

impl ConfigFile {
    /// Load from the default location, or defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), "loaded config file");
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SOURCE)) {
            if let Some(v) = section.get("url_template") {
                config.source.url_template = v.trim().to_string();
            }
            if let Some(v) = section.get("bundle_identifier") {
                config.source.bundle_identifier = v.trim().to_string();
            }
        }

        if let Some(section) = ini.section(Some(SCAN)) {
            let scan = &mut config.scan;
            read(section, SCAN, "window", &mut scan.window)?;
            read(section, SCAN, "concurrency", &mut scan.concurrency)?;
            read(section, SCAN, "retries", &mut scan.retries)?;
            read(section, SCAN, "retry_delay_ms", &mut scan.retry_delay_ms)?;
            read(section, SCAN, "manifest_timeout_secs", &mut scan.manifest_timeout_secs)?;
            read(section, SCAN, "asset_timeout_secs", &mut scan.asset_timeout_secs)?;
        }

        if let Some(section) = ini.section(Some(STORE)) {
            let store = &mut config.store;
            if let Some(v) = section.get("directory") {
                store.directory = expand_tilde(v.trim());
            }
            if let Some(v) = section.get("all_file") {
                store.all_file = v.trim().to_string();
            }
            if let Some(v) = section.get("cursor_file") {
                store.cursor_file = v.trim().to_string();
            }
            if let Some(v) = section.get("latest_file") {
                store.latest_file = v.trim().to_string();
            }
            read(section, STORE, "merge_policy", &mut store.merge_policy)?;
        }

        Ok(config)
    }

    /// Write every setting to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_error = |reason: String| ConfigError::Save {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| save_error(e.to_string()))?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|e| save_error(e.to_string()))
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SOURCE))
            .set("url_template", self.source.url_template.as_str())
            .set("bundle_identifier", self.source.bundle_identifier.as_str());
        ini.with_section(Some(SCAN))
            .set("window", self.scan.window.to_string())
            .set("concurrency", self.scan.concurrency.to_string())
            .set("retries", self.scan.retries.to_string())
            .set("retry_delay_ms", self.scan.retry_delay_ms.to_string())
            .set("manifest_timeout_secs", self.scan.manifest_timeout_secs.to_string())
            .set("asset_timeout_secs", self.scan.asset_timeout_secs.to_string());
        ini.with_section(Some(STORE))
            .set("directory", self.store.directory.to_string_lossy().into_owned())
            .set("all_file", self.store.all_file.as_str())
            .set("cursor_file", self.store.cursor_file.as_str())
            .set("latest_file", self.store.latest_file.as_str())
            .set("merge_policy", self.store.merge_policy.to_string());
        ini
    }

    /// Build the runtime configuration. Validation is left to the caller.
    pub fn to_tracker_config(&self) -> TrackerConfig {
        let dir = &self.store.directory;
        TrackerConfig {
            url_template: self.source.url_template.clone(),
            bundle_identifier: self.source.bundle_identifier.clone(),
            window_size: self.scan.window,
            concurrency: self.scan.concurrency,
            retry: RetryPolicy::new(
                self.scan.retries,
                Duration::from_millis(self.scan.retry_delay_ms),
            ),
            manifest_timeout: Duration::from_secs(self.scan.manifest_timeout_secs),
            asset_timeout: Duration::from_secs(self.scan.asset_timeout_secs),
            store: StorePaths {
                all: dir.join(&self.store.all_file),
                cursor: dir.join(&self.store.cursor_file),
                latest: dir.join(&self.store.latest_file),
            },
            merge_policy: self.store.merge_policy,
        }
    }
}

fn read<T>(section: &Properties, name: &str, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = section.get(key) {
        *target = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            section: name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
