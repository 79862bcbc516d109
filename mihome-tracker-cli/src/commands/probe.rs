//! `probe` command: check a single build number.

use std::path::PathBuf;

use console::style;
use mihome_tracker::probe::ProbeOutcome;
use mihome_tracker::tracker::Tracker;

use super::common::{load_config, resolve_config, Overrides};
use crate::error::CliError;

/// Probe one build and print what it resolves to. The feed is not touched.
pub fn run(build_number: u64, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let file = load_config(config_path.as_deref())?;
    let config = resolve_config(&file, &Overrides::default());
    let tracker = Tracker::new(config)?;

    println!(
        "Probing {}",
        style(tracker.config().manifest_url(build_number)).dim()
    );

    match tracker.probe_one(build_number)? {
        ProbeOutcome::Found(record) => println!("{}", record),
        ProbeOutcome::NotFound(reason) => {
            println!("build {}: {} ({})", build_number, style("not found").yellow(), reason)
        }
    }
    Ok(())
}
