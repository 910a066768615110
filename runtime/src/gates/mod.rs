//! The per-record gate chain: normalize, scope/dedup, liveness, classify.

pub mod classifier;
pub mod liveness;
pub mod normalize;
pub mod scope;

pub use classifier::Classifier;
pub use liveness::{LivenessGate, Probe};
pub use normalize::normalize;
pub use scope::ScopeGate;

/// Outcome of a pass/drop gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Drop,
}
