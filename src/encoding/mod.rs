//! Observation and reward encoding of world snapshots.

pub mod observation;
pub mod reward;

pub use observation::{Observation, ObservationEncoder, ObservationSpace};
pub use reward::{RewardEvaluator, Termination};
