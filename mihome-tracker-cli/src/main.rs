//! MiHome Tracker CLI
//!
//! Probes the MiHome iOS daily-build manifests and keeps a version feed up
//! to date. Running without a subcommand performs a scan.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use mihome_tracker::logging::{self, LogConfig};
use tracing::debug;

use commands::config::ConfigCommands;
use commands::scan::ScanArgs;
use commands::status::StatusArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "mihome-tracker")]
#[command(version, about = "Track MiHome iOS daily builds", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/mihome-tracker/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Probe the next window of builds and update the feed (default)
    Scan(ScanArgs),

    /// Probe a single build number without touching the feed
    Probe {
        /// Build number to probe
        build: u64,
    },

    /// Show the feed status
    Status(StatusArgs),

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let _guard = logging::init(&LogConfig {
        verbosity: cli.verbose,
        file: cli.log_file,
    })?;

    let config = cli.config;
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Scan(ScanArgs::default()));
    debug!(?command, config = ?config, "dispatching command");

    match command {
        Commands::Scan(args) => commands::scan::run(args, config),
        Commands::Probe { build } => commands::probe::run(build, config),
        Commands::Status(args) => commands::status::run(args, config),
        Commands::Config { command } => commands::config::run(command, config),
    }
}
