//! MiHome Tracker - version feed for the MiHome iOS daily build
//!
//! The vendor publishes ad-hoc install manifests at predictable URLs keyed by
//! a sequential build number, but offers no release API. This library probes
//! a window of build numbers concurrently, validates each manifest's package
//! URL, and merges the discoveries into three plain-text files:
//!
//! - the cumulative version list (`"<version> <url>"` per line, newest first)
//! - the cursor (highest build number already processed)
//! - the latest pointer (package URL of the newest known version)
//!
//! # Example
//!
//! ```ignore
//! use mihome_tracker::config::TrackerConfig;
//! use mihome_tracker::scan::NoopObserver;
//! use mihome_tracker::tracker::Tracker;
//!
//! let tracker = Tracker::new(TrackerConfig::default())?;
//! let summary = tracker.run(&NoopObserver)?;
//! println!("{} new versions", summary.new_records);
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod manifest;
pub mod probe;
pub mod scan;
pub mod store;
pub mod tracker;
pub mod version;

pub use error::{TrackerError, TrackerResult};
pub use version::{BundleVersion, VersionRecord};
