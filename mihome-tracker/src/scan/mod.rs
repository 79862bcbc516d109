//! Concurrent scanning of a build-number window.
//!
//! - `window`: the contiguous range of build numbers to probe
//! - `observer`: progress hooks for the UI
//! - `scanner`: the fixed-size worker pool
//!
//! # Architecture
//!
//! ```text
//! WindowScanner
//!     │
//!     ├── worker 0 ── own HttpClient ── ManifestProber ──┐
//!     ├── worker 1 ── own HttpClient ── ManifestProber ──┤ (build, outcome)
//!     │   ...                                            │  in completion order
//!     └── worker N ── own HttpClient ── ManifestProber ──┤
//!                                                        ▼
//!                                  calling thread → ScanObserver, ScanReport
//! ```
//!
//! Workers claim build numbers from a shared counter, so the only state they
//! share is the counter and the read-only settings.

mod observer;
mod scanner;
mod window;

use crate::version::VersionRecord;

pub use observer::{NoopObserver, ScanObserver};
pub use scanner::{ScanReport, WindowScanner};
pub use window::ScanWindow;

/// A record found at a specific build number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub build_number: u64,
    pub record: VersionRecord,
}

impl Discovery {
    /// Create a new discovery.
    pub fn new(build_number: u64, record: VersionRecord) -> Self {
        Self {
            build_number,
            record,
        }
    }
}
