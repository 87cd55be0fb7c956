//! Rollout metrics for policies played through the bridge.
//!
//! Plays whole episodes through a [`GameEnv`] and aggregates their totals,
//! lengths and outcomes.

use std::fmt;

use crate::bridge::channel::INFO_TERMINATION;
use crate::bridge::{EnvError, GameEnv, RewardHistory};
use crate::encoding::Termination;
use crate::policy::Policy;

/// Aggregated metrics over several rollout episodes.
#[derive(Debug, Clone)]
pub struct RolloutMetrics {
    /// Mean total reward per episode.
    pub mean_episode_reward: f64,
    pub best_episode_reward: f64,
    pub worst_episode_reward: f64,
    /// Mean number of steps per episode, terminal step included.
    pub mean_steps: f64,
    pub victories: usize,
    pub defeats: usize,
    pub timeouts: usize,
    /// Number of episodes evaluated.
    pub n_episodes: usize,
}

impl RolloutMetrics {
    /// Plays `n_episodes` episodes with `policy` and aggregates the results.
    ///
    /// The first error from the environment aborts the evaluation.
    pub fn evaluate(
        env: &mut GameEnv,
        policy: &mut dyn Policy,
        n_episodes: usize,
    ) -> Result<Self, EnvError> {
        let mut totals = RewardHistory::default();
        let mut steps = 0usize;
        let (mut victories, mut defeats, mut timeouts) = (0, 0, 0);

        for _ in 0..n_episodes {
            let (mut obs, _) = env.reset()?;
            let mut total = 0.0;
            loop {
                let action = policy.select_action(&obs);
                let result = env.step(action)?;
                steps += 1;
                total += result.reward;
                if result.done {
                    match result.info.get(INFO_TERMINATION).map(String::as_str) {
                        Some(t) if t == Termination::Victory.as_str() => victories += 1,
                        Some(t) if t == Termination::Timeout.as_str() => timeouts += 1,
                        _ => defeats += 1,
                    }
                    break;
                }
                obs = result.observation;
            }
            totals.push(total);
        }

        let n = n_episodes.max(1) as f64;
        Ok(Self {
            mean_episode_reward: totals.mean().unwrap_or(0.0),
            best_episode_reward: totals.max().unwrap_or(0.0),
            worst_episode_reward: totals.min().unwrap_or(0.0),
            mean_steps: steps as f64 / n,
            victories,
            defeats,
            timeouts,
            n_episodes,
        })
    }

    /// Fraction of episodes won.
    pub fn win_rate(&self) -> f64 {
        if self.n_episodes == 0 {
            return 0.0;
        }
        self.victories as f64 / self.n_episodes as f64
    }
}

impl fmt::Display for RolloutMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Rollout Metrics ({} episodes) ===", self.n_episodes)?;
        writeln!(
            f,
            "  Mean episode reward:     {:.2}",
            self.mean_episode_reward
        )?;
        writeln!(
            f,
            "  Best / worst reward:     {:.2} / {:.2}",
            self.best_episode_reward, self.worst_episode_reward
        )?;
        writeln!(f, "  Mean steps:              {:.1}", self.mean_steps)?;
        writeln!(
            f,
            "  Victories / defeats / timeouts: {} / {} / {}",
            self.victories, self.defeats, self.timeouts
        )?;
        write!(f, "  Win rate:                {:.1}%", self.win_rate() * 100.0)
    }
}
