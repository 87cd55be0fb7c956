//! Reward function for the environment bridge.
//!
//! Per-tick shaping rewards engaged combat units; the terminal reward depends
//! only on how the session ended.

use qtty::{Quantity, Second};

use crate::config::EnvConfig;
use crate::world::{closer_than, WorldState};

/// How a session ended, from the policy's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    Victory,
    Defeat,
    /// The time ceiling was exceeded.
    Timeout,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Victory => "victory",
            Termination::Defeat => "defeat",
            Termination::Timeout => "timeout",
        }
    }
}

/// Computes rewards from world snapshots.
#[derive(Debug, Clone)]
pub struct RewardEvaluator {
    baseline: f64,
    engagement_bonus: f64,
    engagement_radius: f64,
    victory_reward: f64,
    defeat_reward: f64,
    victory_time_bonus: bool,
    time_ceiling: Quantity<Second>,
}

impl RewardEvaluator {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            baseline: config.reward_baseline,
            engagement_bonus: config.engagement_bonus,
            engagement_radius: config.engagement_radius,
            victory_reward: config.victory_reward,
            defeat_reward: config.defeat_reward,
            victory_time_bonus: config.victory_time_bonus,
            time_ceiling: config.time_ceiling,
        }
    }

    /// Computes the reward of one decision tick.
    ///
    /// `baseline + bonus × n`, where `n` counts own combat units that are
    /// attacking, have their target in range, and are strictly within the
    /// engagement radius of an enemy unit or structure.
    pub fn evaluate(&self, world: &WorldState) -> f64 {
        let engaged = world
            .own_units
            .iter()
            .filter(|u| u.kind.is_combat() && u.attacking && u.target_in_range)
            .filter(|u| {
                !closer_than(&world.enemy_units, self.engagement_radius, &u.position).is_empty()
                    || !closer_than(&world.enemy_structures, self.engagement_radius, &u.position)
                        .is_empty()
            })
            .count();

        self.baseline + self.engagement_bonus * engaged as f64
    }

    /// Computes the terminal reward for a session that ended at `elapsed`.
    ///
    /// With the time bonus enabled a victory earns
    /// `victory × (1 + max(0, ceiling − elapsed) / ceiling)`.
    pub fn terminal(&self, termination: Termination, elapsed: Quantity<Second>) -> f64 {
        match termination {
            Termination::Victory if self.victory_time_bonus => {
                let ceiling = self.time_ceiling.value();
                let remaining = (ceiling - elapsed.value()).clamp(0.0, ceiling);
                self.victory_reward * (1.0 + remaining / ceiling)
            }
            Termination::Victory => self.victory_reward,
            Termination::Defeat | Termination::Timeout => self.defeat_reward,
        }
    }
}
