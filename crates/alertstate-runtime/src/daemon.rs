//! Long-running host: owns a tracker, keeps its pruner alive and shuts it
//! down on ctrl-c / SIGTERM.

use alertstate_core::config::TrackerConfig;
use alertstate_tracker::StateTracker;
use tokio_util::sync::CancellationToken;

use crate::cli::RunOpts;
use crate::replay::{Scenario, replay};

pub async fn run(opts: RunOpts, config: TrackerConfig) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let tracker = StateTracker::with_cancel(config, cancel.clone());

    // The cache is volatile: always start from an empty store.
    tracker.reset_cache().await;
    let pruner = tracker.spawn_pruner();
    tracing::info!(
        prune_interval_secs = tracker.config().prune_interval_secs,
        max_history = tracker.config().max_history,
        "state tracker started"
    );

    if let Some(path) = opts.scenario.as_deref() {
        let scenario = Scenario::load(path)?;
        replay(&tracker, &scenario).await;
        tracing::info!(instances = tracker.get_all().await.len(), "cache seeded");
    }

    wait_for_shutdown().await;

    cancel.cancel();
    if let Some(handle) = pruner {
        if let Err(e) = handle.await {
            tracing::warn!("pruner task failed: {e}");
        }
    }
    tracing::info!("state tracker stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}
