//! Firing/resolved state machine for a single alert instance.
//!
//! Transition table, keyed on `(current.state, result.state)`:
//!
//! - **same → same**: record the evaluation; an alerting instance has its
//!   `ends_at` pushed to `evaluated_at + for`.
//! - **Normal → Alerting**: fire. `starts_at` and `ends_at` open a new window
//!   and the `alerting` annotation records when.
//! - **Alerting → Normal**: resolve. `ends_at` snaps to `evaluated_at`.
//! - anything else: ignored, record returned as-is.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::{AlertInstance, AlertRule, EvalResult, EvalState, StateEvaluation};

/// Annotation written when an instance starts firing.
pub const ALERTING_ANNOTATION: &str = "alerting";

/// Which branch of the state machine an evaluation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Incoming state equals the current one.
    Unchanged,
    /// Normal → Alerting.
    Fired,
    /// Alerting → Normal.
    Resolved,
    /// Combination the state machine does not model.
    Ignored,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Fired => "fired",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }
}

/// Apply `result` to `current` and return the next record.
pub fn next_state(
    mut current: AlertInstance,
    rule: &AlertRule,
    result: &EvalResult,
    processing_time: Duration,
) -> (AlertInstance, Transition) {
    let at = result.evaluated_at;

    let transition = match (current.state, result.state) {
        (from, to) if from == to => {
            if current.state == EvalState::Alerting {
                current.ends_at = Some(window_end(at, rule));
            }
            Transition::Unchanged
        }
        (EvalState::Normal, EvalState::Alerting) => {
            current.state = EvalState::Alerting;
            current.starts_at = Some(at);
            current.ends_at = Some(window_end(at, rule));
            current
                .annotations
                .insert(ALERTING_ANNOTATION.to_string(), at.to_rfc3339());
            Transition::Fired
        }
        (EvalState::Alerting, EvalState::Normal) => {
            current.state = EvalState::Normal;
            current.ends_at = Some(at);
            Transition::Resolved
        }
        _ => return (current, Transition::Ignored),
    };

    current.last_evaluation_time = Some(at);
    current.processing_time = processing_time;
    current.results.push(StateEvaluation {
        evaluation_time: at,
        evaluation_state: result.state,
    });

    (current, transition)
}

fn window_end(at: DateTime<Utc>, rule: &AlertRule) -> DateTime<Utc> {
    at.checked_add_signed(rule.for_duration())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
