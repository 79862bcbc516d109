//! Fixed-size worker pool over a scan window.

use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{Discovery, ScanObserver, ScanWindow};
use crate::config::TrackerConfig;
use crate::fetch::{ClientFactory, FetchError, ResilientFetcher, RetryPolicy};
use crate::probe::{ManifestProber, NotFoundReason, ProbeOutcome, ProbeSettings};

/// Outcome of scanning one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// The window that was scanned.
    pub window: ScanWindow,
    /// Successful probes, in completion order.
    pub discoveries: Vec<Discovery>,
    /// Number of probes that completed.
    pub probed: u64,
    /// Probes that ended in transport exhaustion or a malformed manifest.
    pub degraded: u64,
    /// Wall-clock duration of the scan.
    pub elapsed: Duration,
}

impl ScanReport {
    fn empty(window: ScanWindow) -> Self {
        Self {
            window,
            discoveries: Vec::new(),
            probed: 0,
            degraded: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Probes every build number of a window with a fixed number of workers.
#[derive(Debug, Clone, Copy)]
pub struct WindowScanner<'a> {
    settings: ProbeSettings<'a>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl<'a> WindowScanner<'a> {
    /// Create a scanner.
    pub fn new(settings: ProbeSettings<'a>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            settings,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Create a scanner from the tracker configuration.
    pub fn from_config(config: &'a TrackerConfig) -> Self {
        Self::new(
            ProbeSettings::from(config),
            config.retry,
            config.concurrency,
        )
    }

    /// Number of workers.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every build number in `window`.
    ///
    /// Runs to completion: individual probe failures only turn into
    /// not-found results. The only error is a worker failing to create its
    /// HTTP client.
    pub fn scan<F: ClientFactory>(
        &self,
        factory: &F,
        window: ScanWindow,
        observer: &dyn ScanObserver,
    ) -> Result<ScanReport, FetchError> {
        observer.on_start(window);

        let total = window.count;
        if total == 0 {
            let report = ScanReport::empty(window);
            observer.on_finish(&report);
            return Ok(report);
        }

        let workers = (self.concurrency as u64).min(total) as usize;
        info!(%window, workers, "scanning window");

        let started = Instant::now();
        let next = AtomicU64::new(0);
        let (tx, rx) = mpsc::channel::<(u64, ProbeOutcome)>();

        let mut report = ScanReport::empty(window);
        let mut worker_error = None;

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let tx = tx.clone();
                    let next = &next;
                    let scanner = *self;
                    scope.spawn(move || scanner.run_worker(worker, factory, window, next, tx))
                })
                .collect();

            // Only the workers' clones keep the channel open.
            drop(tx);

            for (build_number, outcome) in rx {
                report.probed += 1;
                match outcome {
                    ProbeOutcome::Found(record) => {
                        let discovery = Discovery::new(build_number, record);
                        observer.on_found(&discovery);
                        report.discoveries.push(discovery);
                    }
                    ProbeOutcome::NotFound(NotFoundReason::Unreachable)
                    | ProbeOutcome::NotFound(NotFoundReason::Malformed(_)) => {
                        report.degraded += 1;
                    }
                    ProbeOutcome::NotFound(_) => {}
                }
                observer.on_progress(report.probed, total);
            }

            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        worker_error.get_or_insert(e);
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        });

        if let Some(e) = worker_error {
            return Err(e);
        }

        report.elapsed = started.elapsed();
        info!(
            probed = report.probed,
            found = report.discoveries.len(),
            degraded = report.degraded,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan complete"
        );
        if report.degraded > 0 {
            warn!(
                degraded = report.degraded,
                "some builds could not be fetched or parsed"
            );
        }

        observer.on_finish(&report);
        Ok(report)
    }

    fn run_worker<F: ClientFactory>(
        self,
        worker: usize,
        factory: &F,
        window: ScanWindow,
        next: &AtomicU64,
        tx: mpsc::Sender<(u64, ProbeOutcome)>,
    ) -> Result<(), FetchError> {
        let claim = || {
            let offset = next.fetch_add(1, Ordering::Relaxed);
            (offset < window.count).then(|| window.start + offset)
        };

        // Claim before creating the client so idle workers never open one.
        let mut build_number = match claim() {
            Some(build_number) => build_number,
            None => return Ok(()),
        };

        let client = factory.create()?;
        let prober = ManifestProber::new(ResilientFetcher::new(client, self.retry), self.settings);
        debug!(worker, "worker started");

        loop {
            let outcome = prober.probe(build_number);
            if tx.send((build_number, outcome)).is_err() {
                break;
            }
            build_number = match claim() {
                Some(build_number) => build_number,
                None => break,
            };
        }

        Ok(())
    }
}
