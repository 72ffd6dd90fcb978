//! Scenario files: a rule and the evaluation cycles a scheduler would feed
//! the tracker, one batch per cycle.

use std::path::Path;
use std::time::Duration;

use alertstate_core::types::{AlertInstance, AlertRule, EvalResult};
use alertstate_tracker::StateTracker;
use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub rule: AlertRule,
    pub cycles: Vec<Cycle>,
}

#[derive(Debug, Deserialize)]
pub struct Cycle {
    #[serde(default)]
    pub processing_ms: u64,
    pub results: Vec<EvalResult>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }
}

/// Feed every cycle of `scenario` to `tracker`. Returns the number of
/// results processed.
pub async fn replay(tracker: &StateTracker, scenario: &Scenario) -> usize {
    let mut processed = 0;
    for cycle in &scenario.cycles {
        let states = tracker
            .process_eval_results(
                &scenario.rule,
                &cycle.results,
                Duration::from_millis(cycle.processing_ms),
            )
            .await;
        processed += states.len();
    }
    tracing::info!(
        scenario = %scenario.name,
        cycles = scenario.cycles.len(),
        processed,
        "scenario replayed"
    );
    processed
}

/// Render records as JSON, ordered by cache id with object keys sorted.
pub fn snapshot_json(mut records: Vec<AlertInstance>, pretty: bool) -> anyhow::Result<String> {
    records.sort_by(|a, b| a.cache_id.cmp(&b.cache_id));
    let value = serde_json::to_value(&records).context("failed to encode snapshot")?;
    let out = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(out)
}
