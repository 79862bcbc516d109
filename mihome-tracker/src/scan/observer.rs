//! Progress hooks for a running scan.

use super::{Discovery, ScanReport, ScanWindow};

/// Receives scan progress.
///
/// All hooks run on the thread that called
/// [`WindowScanner::scan`](super::WindowScanner::scan), in completion order.
/// They are a display concern only and cannot influence the result.
pub trait ScanObserver {
    /// Called once before any probe is issued.
    fn on_start(&self, _window: ScanWindow) {}

    /// Called for every successful probe, before the matching `on_progress`.
    fn on_found(&self, _discovery: &Discovery) {}

    /// Called after each probe completes.
    fn on_progress(&self, _completed: u64, _total: u64) {}

    /// Called once after every worker has finished.
    fn on_finish(&self, _report: &ScanReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}
