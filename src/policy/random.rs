//! Random policy for smoke runs and baselines.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::action::Action;
use crate::encoding::Observation;

/// Uniformly random action selection over all [`Action`]s.
///
/// Used as a lower-bound baseline.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a random policy; `None` seeds from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Policy for RandomPolicy {
    fn select_action(&mut self, _observation: &Observation) -> Action {
        let index = self.rng.gen_range(0..Action::COUNT);
        Action::from_index(index).unwrap_or(Action::NoOp)
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use std::collections::HashSet;

    #[test]
    fn covers_every_action() {
        let mut policy = RandomPolicy::new(Some(5));
        let obs = Observation::Features(Array1::zeros(9));
        let seen: HashSet<Action> = (0..500).map(|_| policy.select_action(&obs)).collect();
        assert_eq!(seen.len(), Action::COUNT);
    }

    #[test]
    fn seeded_policies_agree() {
        let obs = Observation::Features(Array1::zeros(9));
        let mut a = RandomPolicy::new(Some(42));
        let mut b = RandomPolicy::new(Some(42));
        for _ in 0..20 {
            assert_eq!(a.select_action(&obs), b.select_action(&obs));
        }
    }
}
