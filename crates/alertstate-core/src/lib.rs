//! alertstate-core: alert instance model, identity resolution and the
//! firing/resolved state machine. No IO, no locking, no async.

pub mod config;
pub mod identity;
pub mod transition;
pub mod types;

pub use config::{ConfigError, TrackerConfig};
pub use identity::{instance_key, merge_labels, resolve_labels};
pub use transition::{Transition, next_state};
pub use types::{AlertInstance, AlertRule, EvalResult, EvalState, Labels, StateEvaluation};
