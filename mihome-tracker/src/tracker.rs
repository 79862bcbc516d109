//! Run orchestration.
//!
//! A run loads the store, derives the next window from the cursor, scans it,
//! merges the discoveries according to the configured policy, and writes
//! whatever the merge plan marks as changed.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::fetch::{ClientFactory, ReqwestClientFactory, ResilientFetcher};
use crate::probe::{ManifestProber, ProbeOutcome, ProbeSettings};
use crate::scan::{ScanObserver, ScanWindow, WindowScanner};
use crate::store::{merge, MergePolicy, ResultStore, StoreState};

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Window that was scanned.
    pub window: ScanWindow,
    /// Merge policy in effect.
    pub policy: MergePolicy,
    /// Probes completed.
    pub probed: u64,
    /// Probes that yielded a record.
    pub found: usize,
    /// Probes degraded by transport or parse failures.
    pub degraded: u64,
    /// Records whose package URL was not known before.
    pub new_records: usize,
    /// Store files written.
    pub files_written: usize,
    /// Cursor before the run.
    pub cursor_before: u64,
    /// Cursor after the run.
    pub cursor_after: u64,
    /// Whether the newest package URL changed.
    pub latest_changed: bool,
    /// Package URL at the top of the list after the run.
    pub latest: Option<String>,
}

/// Snapshot of the store for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub cursor: u64,
    pub latest: Option<String>,
    pub records: usize,
    pub top_version: Option<String>,
    pub top_url: Option<String>,
    pub next_window_start: u64,
    pub next_window_end: u64,
}

impl Status {
    /// Pretty-printed JSON for machine consumers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Wires fetcher, scanner, and store together.
pub struct Tracker<F = ReqwestClientFactory> {
    config: TrackerConfig,
    store: ResultStore,
    factory: F,
    start: Option<u64>,
}

impl Tracker {
    /// Create a tracker using real HTTP clients.
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        Self::with_factory(config, ReqwestClientFactory)
    }
}

impl<F: ClientFactory> Tracker<F> {
    /// Create a tracker with a custom client factory.
    pub fn with_factory(config: TrackerConfig, factory: F) -> TrackerResult<Self> {
        config.validate()?;
        let store = ResultStore::new(config.store.clone());
        Ok(Self {
            config,
            store,
            factory,
            start: None,
        })
    }

    /// Start the next scan at `start` instead of right after the cursor.
    ///
    /// Used to backfill a range below the cursor. The cursor itself still
    /// only moves forward.
    pub fn with_start(mut self, start: Option<u64>) -> Self {
        self.start = start;
        self
    }

    /// The configuration in effect.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Window the next run scans given the store state.
    pub fn next_window(&self, state: &StoreState) -> ScanWindow {
        match self.start {
            Some(start) => ScanWindow::new(start, self.config.window_size),
            None => ScanWindow::after_cursor(state.cursor, self.config.window_size),
        }
    }

    /// Execute one complete run.
    pub fn run(&self, observer: &dyn ScanObserver) -> TrackerResult<RunSummary> {
        let state = self.store.load()?;
        let window = self.next_window(&state);
        info!(
            cursor = state.cursor,
            known = state.records.len(),
            policy = %self.config.merge_policy,
            "starting run"
        );

        let report =
            WindowScanner::from_config(&self.config).scan(&self.factory, window, observer)?;

        let plan = merge(&state, &report.discoveries, self.config.merge_policy);
        if plan.is_noop() {
            debug!("feed unchanged, nothing to write");
        }
        let files_written = self.store.apply(&plan)?;

        let summary = RunSummary {
            window,
            policy: self.config.merge_policy,
            probed: report.probed,
            found: report.discoveries.len(),
            degraded: report.degraded,
            new_records: plan.new_records,
            files_written,
            cursor_before: state.cursor,
            cursor_after: plan.cursor.unwrap_or(state.cursor),
            latest_changed: plan.latest_changed,
            latest: plan.records.first().map(|r| r.package_url.clone()),
        };

        if summary.latest_changed {
            info!(latest = summary.latest.as_deref().unwrap_or("-"), "latest version changed");
        } else {
            info!("no new latest version");
        }
        Ok(summary)
    }

    /// Probe a single build without touching the store.
    pub fn probe_one(&self, build_number: u64) -> TrackerResult<ProbeOutcome> {
        let client = self.factory.create()?;
        let prober = ManifestProber::new(
            ResilientFetcher::new(client, self.config.retry),
            ProbeSettings::from(&self.config),
        );
        Ok(prober.probe(build_number))
    }

    /// Summarize the store without scanning.
    pub fn status(&self) -> TrackerResult<Status> {
        let state = self.store.load()?;
        let window = self.next_window(&state);
        let top = state.top();
        Ok(Status {
            cursor: state.cursor,
            latest: state.latest.clone(),
            records: state.records.len(),
            top_version: top.map(|r| r.version.to_string()),
            top_url: top.map(|r| r.package_url.clone()),
            next_window_start: window.start,
            next_window_end: window.last().unwrap_or(window.start),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::store::StorePaths;
    use std::path::Path;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrackerConfig::default().with_url_template("http://static");
        assert!(Tracker::new(config).is_err());
    }

    #[test]
    fn test_next_window_follows_cursor() {
        let tracker = Tracker::new(TrackerConfig::default().with_window_size(10)).unwrap();
        let state = StoreState {
            cursor: 500,
            ..StoreState::default()
        };
        assert_eq!(tracker.next_window(&state), ScanWindow::new(501, 10));
    }

    #[test]
    fn test_start_override() {
        let tracker = Tracker::new(TrackerConfig::default().with_window_size(10))
            .unwrap()
            .with_start(Some(42));
        let state = StoreState {
            cursor: 500,
            ..StoreState::default()
        };
        assert_eq!(tracker.next_window(&state), ScanWindow::new(42, 10));
    }

    #[test]
    fn test_status_on_empty_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = TrackerConfig::default()
            .with_store(StorePaths::in_dir(temp.path()))
            .with_window_size(1000);
        let factory = || -> Result<crate::fetch::ReqwestClient, FetchError> {
            Err(FetchError::ClientBuild("unused".to_string()))
        };
        let tracker = Tracker::with_factory(config, factory).unwrap();

        let status = tracker.status().unwrap();
        assert_eq!(status.cursor, 0);
        assert_eq!(status.records, 0);
        assert_eq!(status.next_window_start, 1);
        assert_eq!(status.next_window_end, 1000);
        assert!(!Path::new(&temp.path().join("MiHome-iOS.all.txt")).exists());
    }

    #[test]
    fn test_status_json_fields() {
        let status = Status {
            cursor: 12,
            latest: Some("https://cdn.test/a.ipa".to_string()),
            records: 1,
            top_version: Some("1.2.3".to_string()),
            top_url: Some("https://cdn.test/a.ipa".to_string()),
            next_window_start: 13,
            next_window_end: 22,
        };

        let value: serde_json::Value = serde_json::from_str(&status.to_json().unwrap()).unwrap();
        assert_eq!(value["cursor"], 12);
        assert_eq!(value["top_version"], "1.2.3");
        assert_eq!(value["next_window_end"], 22);
    }
}
