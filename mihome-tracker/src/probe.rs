//! Probing a single build number.
//!
//! A probe fetches the build's manifest, picks the items carrying the target
//! bundle identifier, and accepts the first one whose version parses and whose
//! package URL answers a HEAD request with a 2xx status. A stale asset only
//! disqualifies its own item: later items in the same manifest are still
//! tried.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::fetch::{HttpClient, ResilientFetcher};
use crate::manifest::Manifest;
use crate::version::{BundleVersion, VersionRecord};

/// Why a build produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Every attempt to fetch the manifest failed at the transport level.
    Unreachable,
    /// The manifest request returned a status other than 200.
    Status(u16),
    /// The manifest body is not a property list.
    Malformed(String),
    /// No item passed every check.
    NoCandidate,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::Unreachable => write!(f, "manifest unreachable"),
            NotFoundReason::Status(status) => write!(f, "manifest returned HTTP {}", status),
            NotFoundReason::Malformed(reason) => write!(f, "malformed manifest: {}", reason),
            NotFoundReason::NoCandidate => write!(f, "no item with a reachable package"),
        }
    }
}

/// Result of probing one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(VersionRecord),
    NotFound(NotFoundReason),
}

/// Settings a prober needs, borrowed from the tracker configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings<'a> {
    pub url_template: &'a str,
    pub bundle_identifier: &'a str,
    pub manifest_timeout: Duration,
    pub asset_timeout: Duration,
}

impl<'a> From<&'a TrackerConfig> for ProbeSettings<'a> {
    fn from(config: &'a TrackerConfig) -> Self {
        Self {
            url_template: &config.url_template,
            bundle_identifier: &config.bundle_identifier,
            manifest_timeout: config.manifest_timeout,
            asset_timeout: config.asset_timeout,
        }
    }
}

impl ProbeSettings<'_> {
    fn manifest_url(&self, build_number: u64) -> String {
        self.url_template.replace(
            crate::config::BUILD_NUMBER_PLACEHOLDER,
            &build_number.to_string(),
        )
    }
}

/// Probes build numbers through one worker's fetcher.
pub struct ManifestProber<'a, C> {
    fetcher: ResilientFetcher<C>,
    settings: ProbeSettings<'a>,
}

impl<'a, C: HttpClient> ManifestProber<'a, C> {
    /// Create a prober owning the worker's fetcher.
    pub fn new(fetcher: ResilientFetcher<C>, settings: ProbeSettings<'a>) -> Self {
        Self { fetcher, settings }
    }

    /// Probe one build number.
    pub fn probe(&self, build_number: u64) -> ProbeOutcome {
        let url = self.settings.manifest_url(build_number);

        let response = match self.fetcher.get(&url, self.settings.manifest_timeout) {
            Some(response) => response,
            None => return ProbeOutcome::NotFound(NotFoundReason::Unreachable),
        };
        if response.status != 200 {
            return ProbeOutcome::NotFound(NotFoundReason::Status(response.status));
        }

        let manifest = match Manifest::parse(&response.body) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(build_number, error = %e, "manifest is not a property list");
                return ProbeOutcome::NotFound(NotFoundReason::Malformed(e.to_string()));
            }
        };

        match self.select(build_number, &manifest) {
            Some(record) => {
                info!(
                    build_number,
                    version = %record.version,
                    url = %record.package_url,
                    "found build"
                );
                ProbeOutcome::Found(record)
            }
            None => ProbeOutcome::NotFound(NotFoundReason::NoCandidate),
        }
    }

    fn select(&self, build_number: u64, manifest: &Manifest) -> Option<VersionRecord> {
        for item in manifest.items_for(self.settings.bundle_identifier) {
            let raw_version = item.bundle_version.as_str();
            if raw_version.is_empty() {
                continue;
            }
            let version: BundleVersion = match raw_version.parse() {
                Ok(version) => version,
                Err(e) => {
                    warn!(build_number, version = raw_version, error = %e, "skipping item");
                    continue;
                }
            };

            let package_url = match item.package_url.as_deref() {
                Some(url) => url,
                None => continue,
            };

            if self.is_reachable(package_url) {
                return Some(VersionRecord::new(version, package_url));
            }
            debug!(build_number, url = package_url, "package unreachable, trying next item");
        }
        None
    }

    fn is_reachable(&self, package_url: &str) -> bool {
        self.fetcher
            .head(package_url, self.settings.asset_timeout)
            .map(|response| response.is_success())
            .unwrap_or(false)
    }
}
