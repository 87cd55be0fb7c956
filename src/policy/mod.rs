//! Policy trait and stand-in implementations.
//!
//! Real training loops live outside the crate and drive [`GameEnv`](crate::bridge::GameEnv)
//! directly; these policies exist for smoke runs, baselines, and tests.

pub mod build_order;
pub mod heuristic;
pub mod random;
pub mod trait_;

pub use build_order::BuildOrderPolicy;
pub use heuristic::HeuristicPolicy;
pub use random::RandomPolicy;
pub use trait_::Policy;
