//! alertstate-tracker: in-memory alert instance cache.
//! One lock-protected record per instance key, a batch entry point that runs
//! evaluation results through the state machine, and a background pruner
//! that bounds evaluation history.

pub mod cache;
pub mod pruner;
pub mod tracker;

pub use cache::StateCache;
pub use pruner::Pruner;
pub use tracker::StateTracker;
