//! Vectorized pool of independent environments.
//!
//! Every member is a [`GameEnv`] owned by its own worker thread, so a stalled
//! or crashed session only delays its own slot. Calls fan out to all members
//! before collecting any reply.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::config::{EnvConfig, PoolConfig};
use crate::encoding::{Observation, ObservationSpace};
use crate::world::EngineFactory;

use super::channel::{ActionMessage, Info, StepResult};
use super::error::{EnvError, StallSide};
use super::facade::GameEnv;

/// Info key set on a result whose member was reset right after it.
pub const INFO_AUTO_RESET: &str = "auto_reset";

type ResetOutcome = Result<(Observation, Info), EnvError>;
type StepOutcome = Result<StepResult, EnvError>;

enum Request {
    Reset,
    Step(ActionMessage),
}

enum Response {
    Reset(ResetOutcome),
    Step(StepOutcome),
}

/// A request or reply tagged with the round it belongs to.
struct Tagged<T> {
    round: u64,
    body: T,
}

struct Member {
    requests: Sender<Tagged<Request>>,
    responses: Receiver<Tagged<Response>>,
    thread: Option<JoinHandle<()>>,
}

/// Runs N environments in parallel.
///
/// Members are isolated by thread, not by process: a member that detaches a
/// stalled driver leaks that driver's thread until its engine returns.
pub struct EnvPool {
    members: Vec<Member>,
    space: ObservationSpace,
    /// Upper bound on one collection: step timeout plus reset grace.
    wait: Duration,
    round: u64,
}

impl EnvPool {
    /// Builds `pool.size` environments sharing `config` and `factory`.
    ///
    /// With a configured seed, member `i` is seeded with `seed + i`.
    pub fn new(
        pool: PoolConfig,
        config: EnvConfig,
        factory: EngineFactory,
    ) -> Result<Self, EnvError> {
        if pool.size == 0 {
            return Err(EnvError::InvalidConfig("pool size must be non-zero".into()));
        }
        let envs = (0..pool.size)
            .map(|i| {
                let member_config = EnvConfig {
                    seed: config.seed.map(|s| s.wrapping_add(i as u64)),
                    ..config.clone()
                };
                GameEnv::new(member_config, factory.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_envs(envs, pool.auto_reset)
    }

    /// Wraps already-built environments, one worker thread each.
    pub fn from_envs(envs: Vec<GameEnv>, auto_reset: bool) -> Result<Self, EnvError> {
        let Some(first) = envs.first() else {
            return Err(EnvError::InvalidConfig("pool size must be non-zero".into()));
        };
        let space = first.observation_space().clone();
        let wait = envs
            .iter()
            .map(|e| e.config().step_timeout + e.config().reset_grace)
            .max()
            .unwrap_or_default();

        let mut members = Vec::with_capacity(envs.len());
        for (index, env) in envs.into_iter().enumerate() {
            let (request_tx, request_rx) = unbounded();
            let (response_tx, response_rx) = unbounded();
            let thread = thread::Builder::new()
                .name(format!("pool-member-{index}"))
                .spawn(move || serve(index, env, auto_reset, request_rx, response_tx))
                .map_err(EnvError::Spawn)?;
            members.push(Member {
                requests: request_tx,
                responses: response_rx,
                thread: Some(thread),
            });
        }
        Ok(Self {
            members,
            space,
            wait,
            round: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.space
    }

    /// Resets every member; one outcome per member, in order.
    pub fn reset_all(&mut self) -> Vec<ResetOutcome> {
        let requests = self.members.iter().map(|_| Request::Reset).collect();
        self.round_trip(requests)
            .into_iter()
            .enumerate()
            .map(|(index, response)| match response? {
                Response::Reset(outcome) => outcome,
                Response::Step(_) => Err(EnvError::PoolMemberLost { index }),
            })
            .collect()
    }

    /// Steps every member with its own action; one outcome per member.
    pub fn step_all<A>(&mut self, actions: &[A]) -> Result<Vec<StepOutcome>, EnvError>
    where
        A: Into<ActionMessage> + Copy,
    {
        if actions.len() != self.members.len() {
            return Err(EnvError::ActionCountMismatch {
                expected: self.members.len(),
                got: actions.len(),
            });
        }
        let requests = actions.iter().map(|&a| Request::Step(a.into())).collect();
        Ok(self
            .round_trip(requests)
            .into_iter()
            .enumerate()
            .map(|(index, response)| match response? {
                Response::Step(outcome) => outcome,
                Response::Reset(_) => Err(EnvError::PoolMemberLost { index }),
            })
            .collect())
    }

    /// Sends one request per member, then collects every reply.
    fn round_trip(&mut self, requests: Vec<Request>) -> Vec<Result<Response, EnvError>> {
        self.round += 1;
        let round = self.round;

        let sent: Vec<bool> = self
            .members
            .iter()
            .zip(requests)
            .map(|(m, body)| m.requests.send(Tagged { round, body }).is_ok())
            .collect();

        let deadline = Instant::now() + self.wait;
        self.members
            .iter()
            .zip(sent)
            .enumerate()
            .map(|(index, (member, sent))| {
                if !sent {
                    return Err(EnvError::PoolMemberLost { index });
                }
                collect(index, member, round, deadline, self.wait)
            })
            .collect()
    }

    /// Shuts every worker down and joins it.
    pub fn close(&mut self) {
        for (index, member) in self.members.iter_mut().enumerate() {
            let (closed, _) = crossbeam_channel::bounded(0);
            // Replacing the sender disconnects the worker's request queue.
            drop(std::mem::replace(&mut member.requests, closed));
            if let Some(thread) = member.thread.take() {
                if thread.join().is_err() {
                    warn!(index, "pool member panicked");
                }
            }
        }
        debug!(members = self.members.len(), "pool closed");
    }
}

impl Drop for EnvPool {
    fn drop(&mut self) {
        self.close();
    }
}

/// Waits for `member`'s reply to `round`, skipping replies to older rounds.
fn collect(
    index: usize,
    member: &Member,
    round: u64,
    deadline: Instant,
    wait: Duration,
) -> Result<Response, EnvError> {
    loop {
        match member.responses.recv_deadline(deadline) {
            Ok(reply) if reply.round == round => return Ok(reply.body),
            Ok(stale) => debug!(index, round = stale.round, "dropping stale reply"),
            Err(RecvTimeoutError::Timeout) => {
                return Err(EnvError::EnvironmentStalled {
                    side: StallSide::Facade,
                    waited: wait,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(EnvError::PoolMemberLost { index });
            }
        }
    }
}

/// Worker loop: serves requests until the pool hangs up.
fn serve(
    index: usize,
    mut env: GameEnv,
    auto_reset: bool,
    requests: Receiver<Tagged<Request>>,
    responses: Sender<Tagged<Response>>,
) {
    for Tagged { round, body } in requests.iter() {
        let body = match body {
            Request::Reset => Response::Reset(env.reset()),
            Request::Step(message) => {
                let mut outcome = env.step_message(message);
                if let Ok(result) = &mut outcome {
                    if result.done && auto_reset {
                        match env.reset() {
                            Ok(_) => {
                                result
                                    .info
                                    .insert(INFO_AUTO_RESET.into(), "true".into());
                            }
                            Err(e) => warn!(index, error = %e, "auto-reset failed"),
                        }
                    }
                }
                Response::Step(outcome)
            }
        };
        if responses.send(Tagged { round, body }).is_err() {
            break;
        }
    }
    debug!(index, "pool member stopped");
}
