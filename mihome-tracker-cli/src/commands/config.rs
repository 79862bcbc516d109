//! Configuration management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use mihome_tracker::config::ConfigFile;

use super::common::{config_path, load_config};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a config file with every default setting
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, cli_path: Option<PathBuf>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(cli_path, force),
        ConfigCommands::Show => run_show(cli_path),
    }
}

fn run_init(cli_path: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = config_path(cli_path.as_deref())?;
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_show(cli_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path(cli_path.as_deref())?;
    let config = load_config(Some(&path))?;

    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not found, showing defaults)", path.display());
    }
    println!();

    println!("[source]");
    println!("  url_template = {}", config.source.url_template);
    println!("  bundle_identifier = {}", config.source.bundle_identifier);
    println!();

    println!("[scan]");
    println!("  window = {}", config.scan.window);
    println!("  concurrency = {}", config.scan.concurrency);
    println!("  retries = {}", config.scan.retries);
    println!("  retry_delay_ms = {}", config.scan.retry_delay_ms);
    println!("  manifest_timeout_secs = {}", config.scan.manifest_timeout_secs);
    println!("  asset_timeout_secs = {}", config.scan.asset_timeout_secs);
    println!();

    println!("[store]");
    println!("  directory = {}", config.store.directory.display());
    println!("  all_file = {}", config.store.all_file);
    println!("  cursor_file = {}", config.store.cursor_file);
    println!("  latest_file = {}", config.store.latest_file);
    println!("  merge_policy = {}", config.store.merge_policy);

    Ok(())
}
