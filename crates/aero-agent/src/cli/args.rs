//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Node agent for the aero port-forwarding panel
///
/// Keeps this host's nftables NAT table in sync with the rules assigned
/// to it on the panel, and reports host telemetry through heartbeats.
#[derive(Parser, Debug)]
#[command(name = "aero-agent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (.toml is read as TOML, anything else as JSON)
    #[arg(short, long, env = "AERO_CONFIG", default_value = "config.json", global = true)]
    pub config: PathBuf,

    /// Log filter, e.g. "debug" or "aero_agent=trace" (overrides RUST_LOG)
    #[arg(short, long, env = "AERO_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the sync loop until interrupted (default)
    Run,

    /// Check the config file and exit
    Validate,

    /// Download the current rules and print the compiled nftables document
    Render,

    /// Print one telemetry sample as heartbeat JSON
    Stats,
}
