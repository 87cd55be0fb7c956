//! Configuration for the environment bridge.
//!
//! One immutable [`EnvConfig`] is built up front and shared (behind an `Arc`)
//! by the facade, its driver, the observation encoder and the reward
//! evaluator.

use std::path::PathBuf;
use std::time::Duration;

use qtty::{Quantity, Second};

use crate::bridge::error::EnvError;

/// Number of fields in a feature-mode observation.
pub const FEATURE_DIM: usize = 9;

/// Field order of a feature-mode observation.
pub mod feature {
    pub const WORKERS: usize = 0;
    pub const COMBAT_UNITS: usize = 1;
    pub const ATTACKING_UNITS: usize = 2;
    pub const NEXUSES: usize = 3;
    pub const ASSIMILATORS: usize = 4;
    pub const STARGATES: usize = 5;
    pub const PYLONS: usize = 6;
    pub const SUPPLY_LEFT: usize = 7;
    pub const GAME_MINUTES: usize = 8;
}

/// Which observation encoding the encoder produces.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObservationMode {
    /// Top-down `height × width × 3` image, one pixel per entity.
    Raster { height: usize, width: usize },
    /// Short vector of counts, each clamped to its maximum.
    Features { maxima: [u8; FEATURE_DIM] },
}

impl ObservationMode {
    pub const RASTER_CHANNELS: usize = 3;

    /// Default per-field maxima for feature mode, in [`feature`] order.
    pub const DEFAULT_FEATURE_MAXIMA: [u8; FEATURE_DIM] = [100, 100, 100, 10, 20, 10, 50, 199, 30];

    pub fn default_raster() -> Self {
        ObservationMode::Raster {
            height: 224,
            width: 224,
        }
    }

    pub fn default_features() -> Self {
        ObservationMode::Features {
            maxima: Self::DEFAULT_FEATURE_MAXIMA,
        }
    }

    /// Shape of the observation array.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            ObservationMode::Raster { height, width } => {
                vec![*height, *width, Self::RASTER_CHANNELS]
            }
            ObservationMode::Features { .. } => vec![FEATURE_DIM],
        }
    }
}

/// Configuration for the environment bridge.
///
/// Simulated-time quantities are game seconds; `Duration` fields are wall
/// clock.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvConfig {
    // --- Observation ---
    pub observation: ObservationMode,
    /// Health fraction used when an entity reports zero max health.
    pub health_epsilon: f64,

    // --- Decision pacing ---
    /// Minimum game time between processed ticks.
    pub decision_interval: Quantity<Second>,
    /// Game time after which the session is forfeited as a timeout.
    pub time_ceiling: Quantity<Second>,

    // --- Reward shaping ---
    /// Reward of every tick before engagement bonuses.
    pub reward_baseline: f64,
    /// Added per combat unit engaging an enemy.
    pub engagement_bonus: f64,
    /// An engaging unit must be strictly closer than this to an enemy.
    pub engagement_radius: f64,
    pub victory_reward: f64,
    /// Terminal reward for defeat and timeout. Must not be positive.
    pub defeat_reward: f64,
    /// Scale the victory reward up to 2× for faster wins.
    pub victory_time_bonus: bool,

    // --- Rendezvous ---
    /// How long `reset` waits for the previous driver to exit.
    pub reset_grace: Duration,
    /// How long `step` waits for a result.
    pub step_timeout: Duration,
    /// How long the driver waits for an action.
    pub action_timeout: Duration,

    // --- Bookkeeping ---
    /// Append-only CSV of episode totals; `None` disables it.
    pub episode_log: Option<PathBuf>,
    /// Seed for effector randomness; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl EnvConfig {
    /// Checks the invariants the bridge relies on.
    pub fn validate(&self) -> Result<(), EnvError> {
        let invalid = |msg: &str| Err(EnvError::InvalidConfig(msg.to_string()));

        match &self.observation {
            ObservationMode::Raster { height, width } if *height == 0 || *width == 0 => {
                return invalid("raster dimensions must be non-zero");
            }
            _ => {}
        }
        if !(self.decision_interval.value() > 0.0) {
            return invalid("decision_interval must be positive");
        }
        if !(self.time_ceiling.value() > self.decision_interval.value()) {
            return invalid("time_ceiling must exceed decision_interval");
        }
        let rewards = [
            self.reward_baseline,
            self.engagement_bonus,
            self.engagement_radius,
            self.victory_reward,
            self.defeat_reward,
            self.health_epsilon,
        ];
        if rewards.iter().any(|r| !r.is_finite()) {
            return invalid("reward parameters must be finite");
        }
        if self.defeat_reward > 0.0 {
            return invalid("defeat_reward must not be positive");
        }
        if self.health_epsilon <= 0.0 {
            return invalid("health_epsilon must be positive");
        }
        if self.step_timeout.is_zero() || self.action_timeout.is_zero() {
            return invalid("rendezvous timeouts must be non-zero");
        }
        Ok(())
    }

    /// Number of discrete actions.
    pub fn action_count(&self) -> usize {
        crate::action::Action::COUNT
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            observation: ObservationMode::default_raster(),
            health_epsilon: 1e-4,
            decision_interval: Quantity::new(0.5),
            time_ceiling: Quantity::new(30.0 * 60.0),
            reward_baseline: -0.2,
            engagement_bonus: 0.15,
            engagement_radius: 12.0,
            victory_reward: 500.0,
            defeat_reward: -500.0,
            victory_time_bonus: false,
            reset_grace: Duration::from_secs(5),
            step_timeout: Duration::from_secs(120),
            action_timeout: Duration::from_secs(600),
            episode_log: None,
            seed: None,
        }
    }
}

/// Configuration for [`EnvPool`](crate::bridge::pool::EnvPool).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Number of parallel environments.
    pub size: usize,
    /// Reset a member right after it reports `done`.
    pub auto_reset: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 5,
            auto_reset: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.action_count(), 6);
        assert_eq!(cfg.observation.shape(), vec![224, 224, 3]);
    }

    #[test]
    fn feature_shape() {
        assert_eq!(ObservationMode::default_features().shape(), vec![FEATURE_DIM]);
    }

    #[test]
    fn positive_defeat_reward_rejected() {
        let cfg = EnvConfig {
            defeat_reward: 1.0,
            ..EnvConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn ceiling_must_exceed_interval() {
        let cfg = EnvConfig {
            time_ceiling: Quantity::new(0.25),
            ..EnvConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_raster_rejected() {
        let cfg = EnvConfig {
            observation: ObservationMode::Raster {
                height: 0,
                width: 10,
            },
            ..EnvConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serializes() {
        let cfg = EnvConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EnvConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
