//! Fixed build-order policy.

use super::trait_::Policy;
use crate::action::Action;
use crate::encoding::Observation;

/// Cycles through a fixed action sequence, ignoring observations.
pub struct BuildOrderPolicy {
    order: Vec<Action>,
    next: usize,
}

impl BuildOrderPolicy {
    /// The default opening: supply, economy, stargate chain, void rays, attack.
    pub const DEFAULT_ORDER: [Action; 8] = [
        Action::BuildSupply,
        Action::Expand,
        Action::BuildMilitaryStructure,
        Action::Expand,
        Action::BuildSupply,
        Action::BuildMilitaryUnit,
        Action::BuildMilitaryUnit,
        Action::Attack,
    ];

    /// Creates a policy cycling through `order`; an empty order always no-ops.
    pub fn new(order: Vec<Action>) -> Self {
        Self { order, next: 0 }
    }
}

impl Default for BuildOrderPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ORDER.to_vec())
    }
}

impl Policy for BuildOrderPolicy {
    fn select_action(&mut self, _observation: &Observation) -> Action {
        let Some(&action) = self.order.get(self.next) else {
            return Action::NoOp;
        };
        self.next = (self.next + 1) % self.order.len();
        action
    }

    fn name(&self) -> &str {
        "build_order"
    }
}
