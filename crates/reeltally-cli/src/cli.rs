//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

/// Reel/pallet scan reconciliation station
#[derive(Debug, Parser)]
#[command(name = "reeltally", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Controller host, overriding the configuration file
    #[arg(long)]
    pub host: Option<String>,

    /// Scanner device node, overriding the configuration file
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
