//! alertstate: hosts the alert instance state tracker.
//! Replays evaluation scenarios through it or keeps it running with its
//! background pruner.

use std::path::Path;

use alertstate_core::config::TrackerConfig;
use alertstate_tracker::StateTracker;
use anyhow::Context;
use clap::Parser;

mod cli;
mod daemon;
mod replay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("ALERTSTATE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        cli::Command::Replay(opts) => {
            let scenario = replay::Scenario::load(&opts.scenario)?;
            let tracker = StateTracker::new(config);
            replay::replay(&tracker, &scenario).await;
            let out = replay::snapshot_json(tracker.get_all().await, opts.pretty)?;
            println!("{out}");
        }
        cli::Command::Run(opts) => {
            daemon::run(opts, config).await?;
        }
        cli::Command::Config => {
            let out = toml::to_string(&config).context("failed to encode config")?;
            print!("{out}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(TrackerConfig::default()),
    }
}
