//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "alertstate", about = "alert instance state tracking cache")]
pub struct Cli {
    /// Tracker config file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "ALERTSTATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a scenario file and print the final cache snapshot (JSON)
    Replay(ReplayOpts),
    /// Host a tracker with its pruner until ctrl-c / SIGTERM
    Run(RunOpts),
    /// Print the effective tracker configuration (TOML)
    Config,
}

#[derive(clap::Args)]
pub struct ReplayOpts {
    /// Scenario file: a rule plus ordered evaluation cycles
    pub scenario: PathBuf,

    /// Pretty-print the JSON snapshot
    #[arg(long)]
    pub pretty: bool,
}

#[derive(clap::Args)]
pub struct RunOpts {
    /// Seed the cache by replaying this scenario before waiting
    #[arg(long)]
    pub scenario: Option<PathBuf>,
}
