//! `status` command: summarize the feed without scanning.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use mihome_tracker::tracker::{Status, Tracker};

use super::common::{load_config, resolve_config, Overrides};
use crate::error::CliError;

/// Arguments for `status`.
#[derive(Debug, Clone, Default, Args)]
pub struct StatusArgs {
    /// Directory holding the feed files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Show the feed status.
pub fn run(args: StatusArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let file = load_config(config_path.as_deref())?;
    let overrides = Overrides {
        data_dir: args.data_dir,
        ..Overrides::default()
    };
    let tracker = Tracker::new(resolve_config(&file, &overrides))?;
    let status = tracker.status()?;

    if args.json {
        let json = status
            .to_json()
            .map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", json);
    } else {
        print_status(&status, &tracker.config().store.all);
    }
    Ok(())
}

fn print_status(status: &Status, feed: &Path) {
    println!("{}", style("Feed status").bold());
    println!("  Feed:        {}", feed.display());
    println!("  Records:     {}", status.records);
    println!("  Cursor:      {}", status.cursor);
    match (&status.top_version, &status.top_url) {
        (Some(version), Some(url)) => println!("  Newest:      {} {}", style(version).green(), url),
        _ => println!("  Newest:      (none)"),
    }
    println!(
        "  Latest file: {}",
        status.latest.as_deref().unwrap_or("(not written)")
    );
    println!(
        "  Next window: {}..={}",
        status.next_window_start, status.next_window_end
    );
}
