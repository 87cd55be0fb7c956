//! The session driver: one thread owning one game session.
//!
//! The driver advances its engine one native tick at a time. On each decision
//! tick it waits for one action, applies it through the effectors, and pushes
//! back the encoded observation and reward. When the session ends it pushes a
//! single final result and stops touching the channel.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use qtty::Quantity;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, info_span, warn};

use crate::action::Action;
use crate::config::EnvConfig;
use crate::effectors::{self, EffectorContext};
use crate::encoding::{ObservationEncoder, RewardEvaluator, Termination};
use crate::world::{
    Command, CommandError, CommandSink, EngineFactory, EngineStatus, GameEngine, Outcome, TechTree,
};
use crate::{generate_id, Id};

use super::channel::{ActionMessage, DriverEnd, Info, StepResult, INFO_GAME_TIME, INFO_TERMINATION};
use super::clock::DecisionClock;
use super::error::EnvError;

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Thread started, engine not yet running.
    Starting,
    Running,
    Terminated(Termination),
}

/// What a driver thread returns when it ends.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverReport {
    pub session: Id,
    /// `None` when the driver was retired or stalled before the game ended.
    pub termination: Option<Termination>,
    /// Decision ticks that consumed an action.
    pub decisions: u64,
}

/// Maps an engine outcome onto the policy's view; ties count as defeats.
fn termination_of(outcome: Outcome) -> Termination {
    match outcome {
        Outcome::Victory => Termination::Victory,
        Outcome::Defeat | Outcome::Tie => Termination::Defeat,
    }
}

/// Command sink forwarding to the engine.
struct EngineSink<'a>(&'a mut dyn GameEngine);

impl CommandSink for EngineSink<'_> {
    fn issue(&mut self, command: Command) -> Result<(), CommandError> {
        self.0.issue(command)
    }
}

/// Owns one game session inside its own thread.
pub struct SessionDriver {
    session: Id,
    config: Arc<EnvConfig>,
    engine: Box<dyn GameEngine>,
    channel: DriverEnd,
    encoder: ObservationEncoder,
    rewards: RewardEvaluator,
    tech: TechTree,
    clock: DecisionClock,
    rng: StdRng,
    state: DriverState,
    decisions: u64,
}

impl SessionDriver {
    /// Starts a driver thread for a fresh session.
    ///
    /// The engine is built inside the new thread from `factory`.
    pub fn spawn(
        config: Arc<EnvConfig>,
        factory: EngineFactory,
        channel: DriverEnd,
    ) -> Result<DriverHandle, EnvError> {
        let session = generate_id();
        let (exit_guard, exited) = bounded::<()>(1);
        let name = format!("driver-{}", &session[..8]);

        let id = session.clone();
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || {
                // Dropped on return or unwind, which wakes `retire`.
                let _exit_guard: Sender<()> = exit_guard;
                let span = info_span!("driver", session = %id);
                let _entered = span.enter();
                Self::launch(id, config, factory, channel)
            })
            .map_err(EnvError::Spawn)?;

        Ok(DriverHandle {
            session,
            thread: Some(thread),
            exited,
        })
    }

    fn launch(
        session: Id,
        config: Arc<EnvConfig>,
        factory: EngineFactory,
        channel: DriverEnd,
    ) -> DriverReport {
        debug!("starting engine");
        let engine = match factory() {
            Ok(engine) => engine,
            Err(e) => {
                error!(error = %e, "engine failed to start");
                let encoder = ObservationEncoder::new(&config);
                let rewards = RewardEvaluator::new(&config);
                let mut info = Info::new();
                info.insert(INFO_TERMINATION.into(), Termination::Defeat.as_str().into());
                info.insert(INFO_GAME_TIME.into(), "0.0".into());
                channel.send(StepResult::terminal(
                    encoder.blank(),
                    rewards.terminal(Termination::Defeat, Quantity::new(0.0)),
                    info,
                ));
                return DriverReport {
                    session,
                    termination: Some(Termination::Defeat),
                    decisions: 0,
                };
            }
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let driver = SessionDriver {
            session,
            encoder: ObservationEncoder::new(&config),
            rewards: RewardEvaluator::new(&config),
            tech: TechTree::protoss(),
            clock: DecisionClock::new(config.decision_interval, config.time_ceiling),
            config,
            engine,
            channel,
            rng,
            state: DriverState::Starting,
            decisions: 0,
        };
        driver.run()
    }

    fn run(mut self) -> DriverReport {
        self.state = DriverState::Running;
        info!("session running");

        loop {
            match self.engine.advance() {
                Ok(EngineStatus::Running) => {}
                Ok(EngineStatus::Ended(outcome)) => {
                    return self.finish(termination_of(outcome));
                }
                Err(e) => {
                    error!(error = %e, "engine failed mid-session");
                    return self.finish(Termination::Defeat);
                }
            }

            let now = self.engine.game_time();
            if !self.clock.tick(now) {
                continue;
            }
            if self.clock.exceeded(now) {
                self.engine.leave();
                return self.finish(Termination::Timeout);
            }

            let message = match self.channel.recv(self.config.action_timeout) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    debug!("facade gone, retiring");
                    self.engine.leave();
                    return self.report();
                }
                Err(e) => {
                    warn!(error = %e, "no action arrived, leaving the game");
                    self.engine.leave();
                    return self.report();
                }
            };
            self.decisions += 1;

            if let ActionMessage::Act(action) = message {
                self.dispatch(action);
            }

            let world = self.engine.snapshot();
            let observation = self.encoder.encode(&world);
            let reward = self.rewards.evaluate(&world);
            debug!(game_time = now.value(), reward, "decision tick");

            if !self.channel.send(StepResult::tick(observation, reward)) {
                debug!("facade gone, retiring");
                self.engine.leave();
                return self.report();
            }
        }
    }

    /// Runs the effectors of `action` against a fresh snapshot.
    ///
    /// A failing routine turns the rest of the tick into a no-op.
    fn dispatch(&mut self, action: Action) {
        let world = self.engine.snapshot();
        let mut sink = EngineSink(self.engine.as_mut());
        let mut ctx = EffectorContext::new(&world, &self.tech, &mut sink, &mut self.rng);
        match effectors::apply(action, &mut ctx) {
            Ok(()) => debug!(action = ?action, issued = ctx.issued().len(), "action applied"),
            Err(e) => warn!(action = ?action, error = %e, "action failed, treated as no-op"),
        }
    }

    /// Pushes the final result and ends the session.
    fn finish(mut self, termination: Termination) -> DriverReport {
        let elapsed = self.engine.game_time();
        let reward = self.rewards.terminal(termination, elapsed);
        let mut info = Info::new();
        info.insert(INFO_TERMINATION.into(), termination.as_str().into());
        info.insert(INFO_GAME_TIME.into(), format!("{:.1}", elapsed.value()));

        info!(
            termination = termination.as_str(),
            game_time = elapsed.value(),
            reward,
            decisions = self.decisions,
            "session ended"
        );
        self.channel
            .send(StepResult::terminal(self.encoder.blank(), reward, info));
        self.state = DriverState::Terminated(termination);
        self.report()
    }

    fn report(self) -> DriverReport {
        let termination = match self.state {
            DriverState::Terminated(t) => Some(t),
            DriverState::Starting | DriverState::Running => None,
        };
        DriverReport {
            session: self.session,
            termination,
            decisions: self.decisions,
        }
    }
}

/// Handle on a running driver thread.
#[derive(Debug)]
pub struct DriverHandle {
    session: Id,
    thread: Option<JoinHandle<DriverReport>>,
    exited: Receiver<()>,
}

impl DriverHandle {
    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits up to `grace` for the thread to exit and joins it.
    ///
    /// The caller must have dropped its channel half first, or the driver
    /// will only notice at its next timeout. Returns `None` if the thread
    /// panicked or was detached.
    pub fn retire(mut self, grace: Duration) -> Option<DriverReport> {
        let thread = self.thread.take()?;
        match self.exited.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match thread.join() {
                Ok(report) => Some(report),
                Err(_) => {
                    warn!(session = %self.session, "driver thread panicked");
                    None
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(session = %self.session, ?grace, "driver did not exit in time, detaching");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::channel::{rendezvous, FacadeEnd};
    use crate::config::ObservationMode;
    use crate::test_support::{base_world, ScriptedEngine};
    use crate::world::{engine_factory, EngineError};

    const WAIT: Duration = Duration::from_secs(5);

    fn config() -> Arc<EnvConfig> {
        Arc::new(EnvConfig {
            observation: ObservationMode::default_features(),
            time_ceiling: Quantity::new(2.0),
            seed: Some(3),
            ..EnvConfig::default()
        })
    }

    fn start(config: Arc<EnvConfig>, factory: EngineFactory) -> (FacadeEnd, DriverHandle) {
        let (facade, driver) = rendezvous();
        let handle = SessionDriver::spawn(config, factory, driver).unwrap();
        (facade, handle)
    }

    /// Steps with no-ops until `done`, returning every result.
    fn play_out(facade: &FacadeEnd) -> Vec<StepResult> {
        let mut results = Vec::new();
        loop {
            let result = facade.exchange(ActionMessage::NoAction, WAIT).unwrap();
            let done = result.done;
            results.push(result);
            if done {
                return results;
            }
        }
    }

    #[test]
    fn timeout_after_ceiling() {
        let factory = engine_factory(|| Ok(ScriptedEngine::new(base_world())));
        let (facade, handle) = start(config(), factory);

        let results = play_out(&facade);
        // Decisions at 0.5, 1.0, 1.5 and 2.0; 2.5 is past the ceiling.
        assert_eq!(results.len(), 5);
        let last = results.last().unwrap();
        assert!(last.observation.is_blank());
        assert_eq!(last.reward, -500.0);
        assert_eq!(last.info[INFO_TERMINATION], "timeout");
        assert_eq!(last.info[INFO_GAME_TIME], "2.5");
        assert!(results[..4].iter().all(|r| !r.done && r.info.is_empty()));

        assert!(matches!(facade.recv(WAIT), Err(EnvError::DriverDisconnected)));
        let report = handle.retire(WAIT).unwrap();
        assert_eq!(report.termination, Some(Termination::Timeout));
        assert_eq!(report.decisions, 4);
    }

    #[test]
    fn victory_pays_terminal_reward() {
        let factory =
            engine_factory(|| Ok(ScriptedEngine::new(base_world()).ending_at(1.2, Outcome::Victory)));
        let (facade, handle) = start(config(), factory);

        let results = play_out(&facade);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].reward, 500.0);
        assert_eq!(results[2].info[INFO_TERMINATION], "victory");
        drop(facade);
        assert_eq!(
            handle.retire(WAIT).unwrap().termination,
            Some(Termination::Victory)
        );
    }

    #[test]
    fn tie_counts_as_defeat() {
        let factory =
            engine_factory(|| Ok(ScriptedEngine::new(base_world()).ending_at(0.75, Outcome::Tie)));
        let (facade, _handle) = start(config(), factory);
        let results = play_out(&facade);
        assert_eq!(results.last().unwrap().info[INFO_TERMINATION], "defeat");
    }

    #[test]
    fn engaged_units_earn_shaping_reward() {
        let factory = engine_factory(|| Ok(ScriptedEngine::engaged()));
        let (facade, _handle) = start(config(), factory);
        facade.send(Action::Attack.into()).unwrap();
        let result = facade.recv(WAIT).unwrap();
        assert!(!result.done);
        assert!((result.reward - -0.05).abs() < 1e-9);
    }

    #[test]
    fn engine_crash_ends_in_defeat() {
        let factory = engine_factory(|| {
            let mut engine = ScriptedEngine::new(base_world());
            engine.crash_at = Some(1.0);
            Ok(engine)
        });
        let (facade, handle) = start(config(), factory);
        let results = play_out(&facade);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].info[INFO_TERMINATION], "defeat");
        assert_eq!(results[1].reward, -500.0);
        assert_eq!(
            handle.retire(WAIT).unwrap().termination,
            Some(Termination::Defeat)
        );
    }

    #[test]
    fn launch_failure_sends_terminal_defeat() {
        let factory =
            engine_factory::<ScriptedEngine, _>(|| Err(EngineError::Launch("no game client".into())));
        let (facade, handle) = start(config(), factory);
        let result = facade.recv(WAIT).unwrap();
        assert!(result.done);
        assert!(result.observation.is_blank());
        assert_eq!(result.info[INFO_TERMINATION], "defeat");
        assert_eq!(handle.retire(WAIT).unwrap().decisions, 0);
    }

    #[test]
    fn dropped_facade_retires_driver() {
        let factory = engine_factory(|| Ok(ScriptedEngine::new(base_world())));
        let (facade, handle) = start(config(), factory);
        facade.send(ActionMessage::NoAction).unwrap();
        facade.recv(WAIT).unwrap();
        drop(facade);
        let report = handle.retire(WAIT).unwrap();
        assert_eq!(report.termination, None);
        assert_eq!(report.decisions, 1);
    }

    #[test]
    fn missing_action_stalls_driver() {
        let config = Arc::new(EnvConfig {
            action_timeout: Duration::from_millis(30),
            ..(*config()).clone()
        });
        let factory = engine_factory(|| Ok(ScriptedEngine::new(base_world())));
        let (facade, handle) = start(config, factory);
        let report = handle.retire(WAIT).unwrap();
        assert_eq!(report.termination, None);
        assert!(matches!(facade.recv(WAIT), Err(EnvError::DriverDisconnected)));
    }

    #[test]
    fn panicking_engine_disconnects() {
        let factory = engine_factory(|| {
            let mut engine = ScriptedEngine::new(base_world());
            engine.panic_at = Some(0.75);
            Ok(engine)
        });
        let (facade, handle) = start(config(), factory);
        facade.exchange(ActionMessage::NoAction, WAIT).unwrap();
        assert!(matches!(
            facade.exchange(ActionMessage::NoAction, WAIT),
            Err(EnvError::DriverDisconnected)
        ));
        assert!(handle.retire(WAIT).is_none());
    }

    #[test]
    fn final_result_waits_for_a_slow_facade() {
        let factory = engine_factory(|| {
            Ok(ScriptedEngine::new(base_world()).ending_at(0.75, Outcome::Victory))
        });
        let (facade, handle) = start(config(), factory);
        let first = facade.exchange(ActionMessage::NoAction, WAIT).unwrap();
        assert!(!first.done);

        // The driver ends and exits while the facade is busy elsewhere.
        thread::sleep(Duration::from_millis(200));
        assert!(handle.is_finished());
        let last = facade.exchange(ActionMessage::NoAction, WAIT).unwrap();
        assert!(last.done);
        assert_eq!(last.info[INFO_TERMINATION], "victory");

        // Nothing is queued behind the final result.
        assert!(matches!(
            facade.recv(Duration::from_millis(50)),
            Err(EnvError::DriverDisconnected)
        ));
        assert_eq!(handle.retire(WAIT).unwrap().decisions, 1);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let factory = engine_factory(|| Ok(ScriptedEngine::new(base_world())));
        let (a, ha) = start(config(), factory.clone());
        let (b, hb) = start(config(), factory);
        assert_ne!(ha.session(), hb.session());
        drop((a, b));
        ha.retire(WAIT);
        hb.retire(WAIT);
    }
}
