//! Lock-protected record store keyed by instance key.
//!
//! Every method takes the single store lock for the whole of its map access
//! and never awaits while holding it. Records leave the store only as clones.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use alertstate_core::identity::{instance_key, resolve_labels};
use alertstate_core::transition::{Transition, next_state};
use alertstate_core::types::{AlertInstance, AlertRule, EvalResult, EvalState};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct StateCache {
    records: Mutex<HashMap<String, AlertInstance>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for the instance `result` describes, creating and
    /// storing a fresh one if the key is unseen.
    pub async fn get_or_create(
        &self,
        rule: &AlertRule,
        result: &EvalResult,
        processing_time: Duration,
    ) -> AlertInstance {
        let mut records = self.records.lock().await;
        get_or_create_locked(&mut records, rule, result, processing_time)
    }

    /// Fetch-or-create, run the state machine and store the outcome, all
    /// under one lock acquisition.
    pub async fn apply(
        &self,
        rule: &AlertRule,
        result: &EvalResult,
        processing_time: Duration,
    ) -> (AlertInstance, Transition) {
        let mut records = self.records.lock().await;
        let current = get_or_create_locked(&mut records, rule, result, processing_time);
        let (next, transition) = next_state(current, rule, result, processing_time);
        if transition != Transition::Ignored {
            records.insert(next.cache_id.clone(), next.clone());
        }
        (next, transition)
    }

    /// Clone of the record stored under `cache_id`, or the empty record.
    pub async fn get(&self, cache_id: &str) -> AlertInstance {
        self.records
            .lock()
            .await
            .get(cache_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of every stored record, in no particular order.
    pub async fn get_all(&self) -> Vec<AlertInstance> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Store `record` under its own key, replacing whatever was there.
    pub async fn set(&self, record: AlertInstance) {
        let mut records = self.records.lock().await;
        records.insert(record.cache_id.clone(), record);
    }

    /// Bulk [`set`](Self::set) under a single lock acquisition.
    pub async fn put<I>(&self, batch: I)
    where
        I: IntoIterator<Item = AlertInstance>,
    {
        let mut records = self.records.lock().await;
        for record in batch {
            records.insert(record.cache_id.clone(), record);
        }
    }

    /// Drop every record.
    pub async fn reset(&self) {
        *self.records.lock().await = HashMap::new();
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Truncate every history longer than `max_history` to its newest
    /// `max_history` entries. Returns how many records were trimmed.
    pub async fn prune(&self, max_history: usize) -> usize {
        let mut records = self.records.lock().await;
        let mut trimmed = 0;
        for record in records.values_mut() {
            let dropped = record.truncate_history(max_history);
            if dropped > 0 {
                debug!(cache_id = %record.cache_id, dropped, "trimmed evaluation history");
                trimmed += 1;
            }
        }
        trimmed
    }
}

fn get_or_create_locked(
    records: &mut HashMap<String, AlertInstance>,
    rule: &AlertRule,
    result: &EvalResult,
    processing_time: Duration,
) -> AlertInstance {
    let labels = resolve_labels(rule, result);
    let cache_id = instance_key(&labels);

    match records.entry(cache_id) {
        Entry::Occupied(entry) => entry.get().clone(),
        Entry::Vacant(entry) => {
            debug!(
                cache_id = %entry.key(),
                state = %result.state,
                evaluated_at = %result.evaluated_at,
                "adding new alert state cache entry"
            );
            let record = AlertInstance {
                rule_uid: rule.uid.clone(),
                org_id: rule.org_id,
                cache_id: entry.key().clone(),
                labels,
                state: result.state,
                results: Vec::new(),
                starts_at: (result.state == EvalState::Alerting).then_some(result.evaluated_at),
                ends_at: None,
                last_evaluation_time: None,
                processing_time,
                annotations: rule.annotations.clone(),
            };
            entry.insert(record).clone()
        }
    }
}
