use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Unordered label set. Keys are unique; iteration order carries no meaning.
pub type Labels = HashMap<String, String>;

// ─── Evaluation state ─────────────────────────────────────────────

/// Outcome of evaluating one alert instance.
///
/// Only `Normal` and `Alerting` drive transitions. `NoData` and `Error` are
/// accepted as inputs but leave an instance in another state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalState {
    #[default]
    Normal,
    Alerting,
    NoData,
    Error,
}

impl EvalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Alerting => "alerting",
            Self::NoData => "no_data",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EvalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Inputs ───────────────────────────────────────────────────────

/// Rule definition as handed over by the rule store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub uid: String,
    pub org_id: i64,
    pub namespace_uid: String,
    pub title: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// How long an alerting instance stays valid after each firing evaluation.
    #[serde(default)]
    pub for_secs: u64,
}

impl AlertRule {
    pub fn for_duration(&self) -> TimeDelta {
        i64::try_from(self.for_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

/// One instance's outcome from a single evaluation of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Dynamic labels identifying the instance.
    #[serde(default)]
    pub instance: Labels,
    pub state: EvalState,
    pub evaluated_at: DateTime<Utc>,
}

// ─── Tracked record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvaluation {
    pub evaluation_time: DateTime<Utc>,
    pub evaluation_state: EvalState,
}

/// Tracked lifecycle of one alert instance.
///
/// The default value is the empty record returned for unknown keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertInstance {
    pub rule_uid: String,
    pub org_id: i64,
    /// Canonical key of `labels`, fixed at creation.
    pub cache_id: String,
    pub labels: Labels,
    pub state: EvalState,
    /// Evaluation history, oldest first.
    pub results: Vec<StateEvaluation>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub last_evaluation_time: Option<DateTime<Utc>>,
    pub processing_time: Duration,
    pub annotations: HashMap<String, String>,
}

impl AlertInstance {
    /// True for the placeholder returned when a key is not tracked.
    pub fn is_empty(&self) -> bool {
        self.cache_id.is_empty()
    }

    /// Compare identity, labels, state and validity window.
    ///
    /// History, annotations and processing time are ignored, so two records
    /// that only differ by an extra same-state evaluation in the history are
    /// still equivalent as long as their timestamps match.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.rule_uid == other.rule_uid
            && self.org_id == other.org_id
            && self.cache_id == other.cache_id
            && self.labels == other.labels
            && self.state == other.state
            && self.starts_at == other.starts_at
            && self.ends_at == other.ends_at
            && self.last_evaluation_time == other.last_evaluation_time
    }

    /// Drop the oldest history entries so at most `max` remain.
    ///
    /// Returns how many entries were dropped.
    pub fn truncate_history(&mut self, max: usize) -> usize {
        let excess = self.results.len().saturating_sub(max);
        if excess > 0 {
            self.results.drain(..excess);
        }
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample() -> AlertInstance {
        AlertInstance {
            rule_uid: "r1".into(),
            org_id: 1,
            cache_id: "{a=b}".into(),
            labels: Labels::from([("a".to_string(), "b".to_string())]),
            state: EvalState::Alerting,
            results: vec![],
            starts_at: Some(ts(0)),
            ends_at: Some(ts(60)),
            last_evaluation_time: Some(ts(0)),
            processing_time: Duration::from_millis(5),
            annotations: HashMap::new(),
        }
    }

    #[test]
    fn default_record_is_empty() {
        let rec = AlertInstance::default();
        assert!(rec.is_empty());
        assert_eq!(rec.state, EvalState::Normal);
        assert!(rec.results.is_empty());
        assert!(!sample().is_empty());
    }

    #[test]
    fn equivalence_ignores_history_and_annotations() {
        let a = sample();
        let mut b = sample();
        b.results.push(StateEvaluation {
            evaluation_time: ts(0),
            evaluation_state: EvalState::Alerting,
        });
        b.annotations.insert("alerting".into(), "now".into());
        b.processing_time = Duration::from_secs(3);
        assert!(a.is_equivalent(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn equivalence_detects_window_change() {
        let a = sample();
        let mut b = sample();
        b.ends_at = Some(ts(90));
        assert!(!a.is_equivalent(&b));

        let mut c = sample();
        c.state = EvalState::Normal;
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn truncate_history_keeps_newest() {
        let mut rec = sample();
        rec.results = (0..5)
            .map(|i| StateEvaluation {
                evaluation_time: ts(i),
                evaluation_state: EvalState::Alerting,
            })
            .collect();

        assert_eq!(rec.truncate_history(3), 2);
        let times: Vec<_> = rec.results.iter().map(|r| r.evaluation_time).collect();
        assert_eq!(times, vec![ts(2), ts(3), ts(4)]);

        assert_eq!(rec.truncate_history(3), 0);
        assert_eq!(rec.results.len(), 3);
    }

    #[test]
    fn eval_state_display_matches_serde_name() {
        let states = [
            EvalState::Normal,
            EvalState::Alerting,
            EvalState::NoData,
            EvalState::Error,
        ];
        for state in states {
            let json = serde_json::to_string(&state).expect("serialize");
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn eval_state_serde_is_snake_case() {
        let json = serde_json::to_string(&EvalState::NoData).expect("serialize");
        assert_eq!(json, "\"no_data\"");
        let back: EvalState = serde_json::from_str("\"alerting\"").expect("deserialize");
        assert_eq!(back, EvalState::Alerting);
    }

    #[test]
    fn rule_for_duration_saturates() {
        let rule = AlertRule {
            for_secs: 60,
            ..AlertRule::default()
        };
        assert_eq!(rule.for_duration(), TimeDelta::seconds(60));

        let huge = AlertRule {
            for_secs: u64::MAX,
            ..AlertRule::default()
        };
        assert_eq!(huge.for_duration(), TimeDelta::MAX);
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let rule: AlertRule = serde_json::from_str(
            r#"{"uid":"r1","org_id":1,"namespace_uid":"ns","title":"High CPU"}"#,
        )
        .expect("deserialize");
        assert!(rule.labels.is_empty());
        assert!(rule.annotations.is_empty());
        assert_eq!(rule.for_secs, 0);
    }
}
