//! Synchronous `reset`/`step` facade over a session driver.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::config::EnvConfig;
use crate::encoding::{Observation, ObservationEncoder, ObservationSpace};
use crate::world::EngineFactory;

use super::channel::{rendezvous, ActionMessage, FacadeEnd, Info, StepResult};
use super::driver::{DriverHandle, DriverReport, SessionDriver};
use super::episode_log::{EpisodeLog, RewardHistory};
use super::error::EnvError;

/// The facade's view of the current driver.
struct Session {
    channel: FacadeEnd,
    driver: DriverHandle,
    /// Cleared after `done`, a stall, or a disconnect.
    live: bool,
}

/// A game session exposed as a blocking environment.
///
/// Each `step` round-trips one action through the driver and waits for its
/// one result. Methods take `&mut self`, so one facade never has two steps in
/// flight.
pub struct GameEnv {
    config: Arc<EnvConfig>,
    factory: EngineFactory,
    space: ObservationSpace,
    blank: Observation,
    log: Option<EpisodeLog>,
    session: Option<Session>,
    episode_reward: f64,
    history: RewardHistory,
}

impl GameEnv {
    /// Validates `config` and opens the episode log if one is configured.
    ///
    /// No driver runs until [`reset`](Self::reset).
    pub fn new(config: EnvConfig, factory: EngineFactory) -> Result<Self, EnvError> {
        config.validate()?;
        let log = match &config.episode_log {
            Some(path) => match EpisodeLog::open(path) {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "episode log unavailable");
                    None
                }
            },
            None => None,
        };
        let encoder = ObservationEncoder::new(&config);
        Ok(Self {
            space: encoder.space(),
            blank: encoder.blank(),
            config: Arc::new(config),
            factory,
            log,
            session: None,
            episode_reward: 0.0,
            history: RewardHistory::default(),
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.space
    }

    pub fn action_count(&self) -> usize {
        self.config.action_count()
    }

    /// Reward accumulated so far in the running episode.
    pub fn episode_reward(&self) -> f64 {
        self.episode_reward
    }

    /// Totals of the episodes this facade completed.
    pub fn history(&self) -> &RewardHistory {
        &self.history
    }

    /// True between `reset` and the end of the episode.
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.live)
    }

    /// Session id of the current driver, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.driver.session())
    }

    /// Retires any previous driver and starts a fresh session.
    ///
    /// Returns a blank observation; the first real one arrives with the
    /// first `step`.
    pub fn reset(&mut self) -> Result<(Observation, Info), EnvError> {
        self.retire();
        self.episode_reward = 0.0;

        let (channel, driver_end) = rendezvous();
        let driver = SessionDriver::spawn(self.config.clone(), self.factory.clone(), driver_end)?;
        info!(session = driver.session(), "episode reset");
        self.session = Some(Session {
            channel,
            driver,
            live: true,
        });
        Ok((self.blank.clone(), Info::new()))
    }

    pub fn step(&mut self, action: Action) -> Result<StepResult, EnvError> {
        self.step_message(ActionMessage::Act(action))
    }

    /// Steps with an integer action, or `-1` for "no action yet".
    ///
    /// Out-of-range values are rejected before anything is sent.
    pub fn step_index(&mut self, index: i64) -> Result<StepResult, EnvError> {
        let message = ActionMessage::from_index(index)?;
        self.step_message(message)
    }

    pub fn step_message(&mut self, message: ActionMessage) -> Result<StepResult, EnvError> {
        let session = match self.session.as_mut() {
            Some(session) if session.live => session,
            _ => return Err(EnvError::NotRunning),
        };

        let received = session.channel.exchange(message, self.config.step_timeout);
        let mut result = match received {
            Ok(result) => result,
            Err(e) => {
                session.live = false;
                warn!(session = session.driver.session(), error = %e, "step failed");
                return Err(e);
            }
        };

        result.observation.clamp_to(&self.space);
        self.episode_reward += result.reward;
        if result.done {
            session.live = false;
            self.close_episode();
        }
        Ok(result)
    }

    /// Records the finished episode and zeroes the running total.
    fn close_episode(&mut self) {
        let total = self.episode_reward;
        self.episode_reward = 0.0;
        self.history.push(total);
        info!(total, episodes = self.history.count(), "episode finished");
        if let Some(log) = &self.log {
            if let Err(e) = log.append(total) {
                warn!(path = %log.path().display(), error = %e, "failed to record episode total");
            }
        }
    }

    /// Drops the channel to the current driver and waits for it to exit.
    fn retire(&mut self) -> Option<DriverReport> {
        let Session { channel, driver, .. } = self.session.take()?;
        drop(channel);
        let report = driver.retire(self.config.reset_grace);
        if let Some(report) = &report {
            debug!(
                session = %report.session,
                termination = ?report.termination,
                decisions = report.decisions,
                "driver retired"
            );
        }
        report
    }
}

impl Drop for GameEnv {
    fn drop(&mut self) {
        self.retire();
    }
}
