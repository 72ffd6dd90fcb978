//! Public entry point: batch processing of evaluation results plus the
//! lifecycle of the background pruner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alertstate_core::config::TrackerConfig;
use alertstate_core::transition::Transition;
use alertstate_core::types::{AlertInstance, AlertRule, EvalResult};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::StateCache;
use crate::pruner::Pruner;

pub struct StateTracker {
    cache: Arc<StateCache>,
    config: TrackerConfig,
    /// Cancellation token for the pruner.
    cancel: CancellationToken,
    pruner_started: AtomicBool,
}

impl StateTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_cancel(config, CancellationToken::new())
    }

    /// Create a tracker whose pruner also stops when `parent` fires.
    /// Stopping or dropping the tracker never cancels `parent`.
    pub fn with_cancel(config: TrackerConfig, parent: CancellationToken) -> Self {
        Self {
            cache: Arc::new(StateCache::new()),
            config,
            cancel: parent.child_token(),
            pruner_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Spawn the periodic pruner on the current tokio runtime.
    ///
    /// Only the first call spawns a task; later calls return `None`.
    pub fn spawn_pruner(&self) -> Option<JoinHandle<()>> {
        if self.pruner_started.swap(true, Ordering::AcqRel) {
            warn!("pruner already running, not spawning another");
            return None;
        }
        let pruner = Pruner::new(
            Arc::clone(&self.cache),
            self.config.prune_interval(),
            self.config.max_history,
            self.cancel.clone(),
        );
        Some(tokio::spawn(pruner.run()))
    }

    /// Signal the pruner to stop. Takes effect on its next wait.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run every result of one evaluation cycle through the state machine,
    /// in order, and return the resulting records in the same order.
    pub async fn process_eval_results(
        &self,
        rule: &AlertRule,
        results: &[EvalResult],
        processing_time: Duration,
    ) -> Vec<AlertInstance> {
        info!(
            uid = %rule.uid,
            result_count = results.len(),
            "state tracker processing evaluation results"
        );
        let mut states = Vec::with_capacity(results.len());
        for result in results {
            states.push(self.set_next_state(rule, result, processing_time).await);
        }
        debug!(count = states.len(), "returning changed states to scheduler");
        states
    }

    /// Apply a single result and return the updated record.
    pub async fn set_next_state(
        &self,
        rule: &AlertRule,
        result: &EvalResult,
        processing_time: Duration,
    ) -> AlertInstance {
        let (state, transition) = self.cache.apply(rule, result, processing_time).await;
        match transition {
            Transition::Unchanged => {
                debug!(
                    cache_id = %state.cache_id,
                    transition = transition.as_str(),
                    state = %state.state,
                    "no state transition"
                );
            }
            Transition::Fired | Transition::Resolved => {
                debug!(
                    cache_id = %state.cache_id,
                    transition = transition.as_str(),
                    to = %state.state,
                    "state transition"
                );
            }
            Transition::Ignored => {
                debug!(
                    cache_id = %state.cache_id,
                    transition = transition.as_str(),
                    current = %state.state,
                    incoming = %result.state,
                    "ignoring unsupported state combination"
                );
            }
        }
        state
    }

    pub async fn get(&self, cache_id: &str) -> AlertInstance {
        self.cache.get(cache_id).await
    }

    pub async fn get_all(&self) -> Vec<AlertInstance> {
        self.cache.get_all().await
    }

    /// Write records back under their own keys, e.g. to seed a fresh tracker.
    pub async fn put(&self, states: Vec<AlertInstance>) {
        self.cache.put(states).await;
    }

    /// Clear every record. Meant for startup.
    pub async fn reset_cache(&self) {
        self.cache.reset().await;
    }

    /// Run one pruning sweep now instead of waiting for the next tick.
    pub async fn prune_now(&self) -> usize {
        self.cache.prune(self.config.max_history).await
    }
}

impl Drop for StateTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
