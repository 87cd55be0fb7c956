//! Rule-based policy over feature observations.
//!
//! Reads the scalar features and picks the first applicable rule: relieve
//! supply pressure, finish the stargate chain, saturate the economy, mass
//! void rays, then attack once the army is large enough. Raster
//! observations carry no counts, so the policy falls back to a build order.

use super::build_order::BuildOrderPolicy;
use super::trait_::Policy;
use crate::action::Action;
use crate::config::feature;
use crate::encoding::Observation;

/// Greedy rule-based baseline.
pub struct HeuristicPolicy {
    /// Attack once this many combat units exist.
    pub attack_threshold: u8,
    /// Expand while workers per nexus are below this.
    pub workers_per_nexus: u8,
    /// Build supply once free supply drops below this.
    pub supply_margin: u8,
    fallback: BuildOrderPolicy,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            attack_threshold: 8,
            workers_per_nexus: 16,
            supply_margin: 5,
            fallback: BuildOrderPolicy::default(),
        }
    }
}

impl Policy for HeuristicPolicy {
    fn select_action(&mut self, observation: &Observation) -> Action {
        let Some(f) = observation.as_features() else {
            return self.fallback.select_action(observation);
        };
        let nexuses = u32::from(f[feature::NEXUSES]).max(1);

        if f[feature::SUPPLY_LEFT] < self.supply_margin {
            Action::BuildSupply
        } else if f[feature::STARGATES] == 0 && f[feature::PYLONS] > 0 {
            Action::BuildMilitaryStructure
        } else if u32::from(f[feature::WORKERS]) < nexuses * u32::from(self.workers_per_nexus) {
            Action::Expand
        } else if f[feature::COMBAT_UNITS] >= self.attack_threshold {
            Action::Attack
        } else {
            Action::BuildMilitaryUnit
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
