//! CLI subcommands.

pub mod common;
pub mod config;
pub mod probe;
pub mod scan;
pub mod status;
