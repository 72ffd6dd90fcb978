//! Background task that bounds per-instance evaluation history.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::cache::StateCache;

pub struct Pruner {
    cache: Arc<StateCache>,
    period: Duration,
    max_history: usize,
    /// Cancellation token for graceful shutdown.
    cancel: CancellationToken,
}

impl Pruner {
    pub fn new(
        cache: Arc<StateCache>,
        period: Duration,
        max_history: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cache,
            period,
            max_history,
            cancel,
        }
    }

    /// Sweep the cache every `period` until cancelled. The first sweep runs
    /// one full period after start; a sweep in progress always completes.
    pub async fn run(self) {
        let mut ticker = interval_at(first_tick(self.period), self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.period.as_secs(),
            max_history = self.max_history,
            "starting cleanup process"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = self.cancel.cancelled() => {
                    tracing::info!("pruner: cancellation requested, stopping cleanup process");
                    break;
                }
            }
        }
    }

    pub async fn sweep(&self) -> usize {
        tracing::info!(max_history = self.max_history, "trimming alert state cache");
        self.cache.prune(self.max_history).await
    }
}

/// Deadline of the first sweep. Periods too long to add to the clock push it
/// to a far-off instant instead of overflowing.
fn first_tick(period: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(period)
        .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
}

/// About thirty years.
const FAR_FUTURE_SECS: u64 = 86400 * 365 * 30;

#[cfg(test)]
mod tests {
    use super::*;
    use alertstate_core::types::{AlertInstance, EvalState, StateEvaluation};
    use chrono::{TimeZone, Utc};

    fn record_with_history(key: &str, len: usize) -> AlertInstance {
        AlertInstance {
            cache_id: key.into(),
            state: EvalState::Alerting,
            results: (0..len as i64)
                .map(|i| StateEvaluation {
                    evaluation_time: Utc.timestamp_opt(i, 0).unwrap(),
                    evaluation_state: EvalState::Alerting,
                })
                .collect(),
            ..AlertInstance::default()
        }
    }

    async fn history_len(cache: &StateCache, key: &str) -> usize {
        cache.get(key).await.results.len()
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_after_each_period() {
        let cache = Arc::new(StateCache::new());
        cache.set(record_with_history("{a=1}", 10)).await;

        let cancel = CancellationToken::new();
        let pruner = Pruner::new(Arc::clone(&cache), Duration::from_secs(60), 4, cancel.clone());
        let handle = tokio::spawn(pruner.run());

        // Nothing happens before the first period elapses.
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(history_len(&cache, "{a=1}").await, 10);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(history_len(&cache, "{a=1}").await, 4);

        // New growth is trimmed again on the next tick.
        cache.set(record_with_history("{a=1}", 7)).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(history_len(&cache, "{a=1}").await, 4);

        cancel.cancel();
        handle.await.expect("pruner task");
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancel_without_sweeping() {
        let cache = Arc::new(StateCache::new());
        cache.set(record_with_history("{a=1}", 10)).await;

        let cancel = CancellationToken::new();
        let pruner = Pruner::new(Arc::clone(&cache), Duration::from_secs(60), 4, cancel.clone());
        let handle = tokio::spawn(pruner.run());

        cancel.cancel();
        handle.await.expect("pruner task");

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(history_len(&cache, "{a=1}").await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_period_does_not_overflow_the_clock() {
        let cache = Arc::new(StateCache::new());
        cache.set(record_with_history("{a=1}", 10)).await;

        let cancel = CancellationToken::new();
        let pruner = Pruner::new(
            Arc::clone(&cache),
            Duration::from_secs(i64::MAX as u64),
            4,
            cancel.clone(),
        );
        let handle = tokio::spawn(pruner.run());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!handle.is_finished());
        assert_eq!(history_len(&cache, "{a=1}").await, 10);

        cancel.cancel();
        handle.await.expect("pruner task");
    }

    #[tokio::test]
    async fn sweep_reports_trimmed_records() {
        let cache = Arc::new(StateCache::new());
        cache
            .put(vec![
                record_with_history("{a=1}", 101),
                record_with_history("{a=2}", 100),
                record_with_history("{a=3}", 250),
            ])
            .await;

        let pruner = Pruner::new(
            Arc::clone(&cache),
            Duration::from_secs(3600),
            100,
            CancellationToken::new(),
        );
        assert_eq!(pruner.sweep().await, 2);

        for key in ["{a=1}", "{a=2}", "{a=3}"] {
            assert_eq!(history_len(&cache, key).await, 100);
        }
        let newest = cache.get("{a=3}").await;
        assert_eq!(
            newest.results.first().map(|e| e.evaluation_time),
            Some(Utc.timestamp_opt(150, 0).unwrap())
        );
    }
}
