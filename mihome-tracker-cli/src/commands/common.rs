//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use mihome_tracker::config::{default_config_path, ConfigFile, TrackerConfig};
use mihome_tracker::store::MergePolicy;

use crate::error::CliError;

/// Merge policy selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PolicyArg {
    /// Union with the prior list, re-sort, rewrite only what changed
    Full,
    /// Prepend this run's discoveries to the prior list
    Append,
}

impl From<PolicyArg> for MergePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Full => MergePolicy::FullRebuild,
            PolicyArg::Append => MergePolicy::Append,
        }
    }
}

/// Resolve the config file path from `--config` or the default location.
pub fn config_path(cli_path: Option<&Path>) -> Result<PathBuf, CliError> {
    match cli_path {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or_else(|| {
            CliError::Config(
                "could not determine the config directory; pass --config".to_string(),
            )
        }),
    }
}

/// Load the config file. A missing file yields the defaults.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match cli_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub window: Option<u64>,
    pub concurrency: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub policy: Option<PolicyArg>,
}

/// Resolve the runtime configuration: CLI over config file over defaults.
pub fn resolve_config(file: &ConfigFile, overrides: &Overrides) -> TrackerConfig {
    let mut config = file.to_tracker_config();

    if let Some(window) = overrides.window {
        config = config.with_window_size(window);
    }
    if let Some(concurrency) = overrides.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(dir) = overrides.data_dir.as_deref() {
        config = config.with_data_dir(dir);
    }
    if let Some(policy) = overrides.policy {
        config = config.with_merge_policy(policy.into());
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_values_used_without_overrides() {
        let file = ConfigFile::parse("[scan]\nwindow = 250\n[store]\nmerge_policy = append\n")
            .unwrap();
        let config = resolve_config(&file, &Overrides::default());
        assert_eq!(config.window_size, 250);
        assert_eq!(config.merge_policy, MergePolicy::Append);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = ConfigFile::parse("[scan]\nwindow = 250\nconcurrency = 8\n").unwrap();
        let overrides = Overrides {
            window: Some(10),
            concurrency: Some(2),
            data_dir: Some(PathBuf::from("/tmp/feed")),
            policy: Some(PolicyArg::Full),
        };

        let config = resolve_config(&file, &overrides);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.merge_policy, MergePolicy::FullRebuild);
        assert_eq!(
            config.store.all,
            PathBuf::from("/tmp/feed").join("MiHome-iOS.all.txt")
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = config_path(Some(Path::new("/etc/tracker.ini"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/tracker.ini"));
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = load_config(Some(&temp.path().join("absent.ini"))).unwrap();
        assert_eq!(file, ConfigFile::default());
    }
}
