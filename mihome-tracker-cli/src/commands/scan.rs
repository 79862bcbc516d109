//! `scan` command: probe the next window and update the feed.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mihome_tracker::scan::{Discovery, ScanObserver, ScanReport, ScanWindow};
use mihome_tracker::tracker::{RunSummary, Tracker};

use super::common::{load_config, resolve_config, Overrides, PolicyArg};
use crate::error::CliError;

/// Arguments for `scan`.
#[derive(Debug, Clone, Default, Args)]
pub struct ScanArgs {
    /// Number of build numbers to probe
    #[arg(long)]
    pub window: Option<u64>,

    /// Number of concurrent workers
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// First build number to probe instead of the one after the cursor
    #[arg(long)]
    pub start: Option<u64>,

    /// Directory holding the feed files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// How discoveries are merged into the feed
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl ScanArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            window: self.window,
            concurrency: self.concurrency,
            data_dir: self.data_dir.clone(),
            policy: self.policy,
        }
    }
}

/// Run a scan.
pub fn run(args: ScanArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let file = load_config(config_path.as_deref())?;
    let config = resolve_config(&file, &args.overrides());
    let tracker = Tracker::new(config)?.with_start(args.start);

    let observer = ProgressObserver::new(!args.no_progress);
    let summary = tracker.run(&observer)?;

    print_summary(&summary);
    Ok(())
}

/// Draws a progress bar and prints each discovery above it.
struct ProgressObserver {
    bar: Option<ProgressBar>,
}

impl ProgressObserver {
    fn new(enabled: bool) -> Self {
        Self {
            bar: enabled.then(|| ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr())),
        }
    }
}

impl ScanObserver for ProgressObserver {
    fn on_start(&self, window: ScanWindow) {
        if let Some(bar) = &self.bar {
            bar.set_length(window.count);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            bar.set_message(format!("builds {}", window));
            bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    fn on_found(&self, discovery: &Discovery) {
        let line = discovery.record.to_string();
        match &self.bar {
            // A hidden bar swallows println, so fall back to stdout.
            Some(bar) if !bar.is_hidden() => bar.println(line),
            _ => println!("{}", line),
        }
    }

    fn on_progress(&self, completed: u64, _total: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(completed);
        }
    }

    fn on_finish(&self, _report: &ScanReport) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", style("Scan complete").bold());
    println!("  Window:    {} ({} policy)", summary.window, summary.policy);
    println!(
        "  Probed:    {} ({} found, {} degraded)",
        summary.probed, summary.found, summary.degraded
    );
    println!("  New:       {}", summary.new_records);
    println!(
        "  Cursor:    {} -> {}",
        summary.cursor_before, summary.cursor_after
    );

    let latest = summary.latest.as_deref().unwrap_or("(none)");
    if summary.latest_changed {
        println!("  Latest:    {}", style(latest).green().bold());
    } else {
        println!("  Latest:    {} {}", latest, style("(unchanged)").dim());
    }

    if summary.degraded > 0 {
        println!(
            "  {}",
            style(format!(
                "{} builds could not be fetched or parsed",
                summary.degraded
            ))
            .yellow()
        );
    }
}
