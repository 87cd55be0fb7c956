//! Policy trait for the environment bridge.

use crate::action::Action;
use crate::encoding::Observation;

/// Chooses the next high-level action from the latest observation.
pub trait Policy: Send {
    /// Selects one action for the observation returned by the previous step.
    fn select_action(&mut self, observation: &Observation) -> Action;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}
