//! The action/result channel pair joining a facade to its driver.
//!
//! Two unbounded one-directional queues, one producer and one consumer each.
//! Sends never block. Receives block up to a caller-supplied timeout.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::action::Action;
use crate::encoding::Observation;

use super::error::{EnvError, StallSide};

/// Extensible per-step metadata.
pub type Info = BTreeMap<String, String>;

/// Info key carrying the termination reason on the final result.
pub const INFO_TERMINATION: &str = "termination";
/// Info key carrying the game time in seconds on the final result.
pub const INFO_GAME_TIME: &str = "game_time";

/// Message from the facade to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMessage {
    Act(Action),
    /// No decision yet; the driver runs a tick without effectors.
    NoAction,
}

impl ActionMessage {
    /// Integer form of [`ActionMessage::NoAction`].
    pub const NO_ACTION_INDEX: i64 = -1;

    /// Parses the integer form: `[0, Action::COUNT)` or [`NO_ACTION_INDEX`](Self::NO_ACTION_INDEX).
    pub fn from_index(index: i64) -> Result<Self, EnvError> {
        if index == Self::NO_ACTION_INDEX {
            return Ok(ActionMessage::NoAction);
        }
        usize::try_from(index)
            .ok()
            .and_then(Action::from_index)
            .map(ActionMessage::Act)
            .ok_or(EnvError::InvalidAction(index))
    }
}

impl From<Action> for ActionMessage {
    fn from(action: Action) -> Self {
        ActionMessage::Act(action)
    }
}

/// Message from the driver to the facade: one per processed tick, plus the final one.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    /// The session ended; no further results follow.
    pub done: bool,
    /// Reserved for externally forced cutoffs; never set by the driver.
    pub truncated: bool,
    pub info: Info,
}

impl StepResult {
    /// Result of an ordinary decision tick.
    pub fn tick(observation: Observation, reward: f64) -> Self {
        Self {
            observation,
            reward,
            done: false,
            truncated: false,
            info: Info::new(),
        }
    }

    /// Final result of a session.
    pub fn terminal(observation: Observation, reward: f64, info: Info) -> Self {
        Self {
            observation,
            reward,
            done: true,
            truncated: false,
            info,
        }
    }
}

/// Creates a connected channel pair.
pub fn rendezvous() -> (FacadeEnd, DriverEnd) {
    let (action_tx, action_rx) = unbounded();
    let (result_tx, result_rx) = unbounded();
    (
        FacadeEnd {
            actions: action_tx,
            results: result_rx,
        },
        DriverEnd {
            actions: action_rx,
            results: result_tx,
        },
    )
}

/// The facade's half: sends actions, receives results.
#[derive(Debug)]
pub struct FacadeEnd {
    actions: Sender<ActionMessage>,
    results: Receiver<StepResult>,
}

impl FacadeEnd {
    pub fn send(&self, message: ActionMessage) -> Result<(), EnvError> {
        self.actions
            .send(message)
            .map_err(|_| EnvError::DriverDisconnected)
    }

    /// Waits up to `timeout` for the next result.
    ///
    /// A result already queued is returned even if the driver has since exited.
    pub fn recv(&self, timeout: Duration) -> Result<StepResult, EnvError> {
        self.results.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => EnvError::EnvironmentStalled {
                side: StallSide::Facade,
                waited: timeout,
            },
            RecvTimeoutError::Disconnected => EnvError::DriverDisconnected,
        })
    }

    /// Sends `message` and waits up to `timeout` for the answering result.
    ///
    /// A driver that has ended drops its action queue after pushing the final
    /// result, so a failed send still drains what is queued; `DriverDisconnected`
    /// is returned only once nothing is left.
    pub fn exchange(
        &self,
        message: ActionMessage,
        timeout: Duration,
    ) -> Result<StepResult, EnvError> {
        match self.send(message) {
            Ok(()) | Err(EnvError::DriverDisconnected) => self.recv(timeout),
            Err(e) => Err(e),
        }
    }
}

/// The driver's half: receives actions, sends results.
#[derive(Debug)]
pub struct DriverEnd {
    actions: Receiver<ActionMessage>,
    results: Sender<StepResult>,
}

impl DriverEnd {
    /// Waits up to `timeout` for the next action.
    ///
    /// Returns `Ok(None)` once the facade has dropped its half, which is how
    /// a driver learns it has been retired.
    pub fn recv(&self, timeout: Duration) -> Result<Option<ActionMessage>, EnvError> {
        match self.actions.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(EnvError::EnvironmentStalled {
                side: StallSide::Driver,
                waited: timeout,
            }),
        }
    }

    /// Sends a result; returns `false` if the facade is gone.
    pub fn send(&self, result: StepResult) -> bool {
        self.results.send(result).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn result(reward: f64) -> StepResult {
        StepResult::tick(Observation::Features(Array1::zeros(3)), reward)
    }

    #[test]
    fn index_parsing() {
        assert_eq!(
            ActionMessage::from_index(3).unwrap(),
            ActionMessage::Act(Action::Attack)
        );
        assert_eq!(
            ActionMessage::from_index(-1).unwrap(),
            ActionMessage::NoAction
        );
        assert!(matches!(
            ActionMessage::from_index(6),
            Err(EnvError::InvalidAction(6))
        ));
        assert!(matches!(
            ActionMessage::from_index(-2),
            Err(EnvError::InvalidAction(-2))
        ));
    }

    #[test]
    fn messages_arrive_in_order() {
        let (facade, driver) = rendezvous();
        facade.send(Action::Expand.into()).unwrap();
        facade.send(ActionMessage::NoAction).unwrap();
        let t = Duration::from_millis(100);
        assert_eq!(
            driver.recv(t).unwrap(),
            Some(ActionMessage::Act(Action::Expand))
        );
        assert_eq!(driver.recv(t).unwrap(), Some(ActionMessage::NoAction));

        assert!(driver.send(result(1.0)));
        assert!(driver.send(result(2.0)));
        assert_eq!(facade.recv(t).unwrap().reward, 1.0);
        assert_eq!(facade.recv(t).unwrap().reward, 2.0);
    }

    #[test]
    fn empty_queues_time_out_as_stalls() {
        let (facade, driver) = rendezvous();
        let t = Duration::from_millis(20);
        assert!(matches!(
            facade.recv(t),
            Err(EnvError::EnvironmentStalled {
                side: StallSide::Facade,
                ..
            })
        ));
        assert!(matches!(
            driver.recv(t),
            Err(EnvError::EnvironmentStalled {
                side: StallSide::Driver,
                ..
            })
        ));
    }

    #[test]
    fn dropping_facade_retires_driver() {
        let (facade, driver) = rendezvous();
        drop(facade);
        assert_eq!(driver.recv(Duration::from_millis(20)).unwrap(), None);
        assert!(!driver.send(result(0.0)));
    }

    #[test]
    fn queued_result_survives_driver_exit() {
        let (facade, driver) = rendezvous();
        driver.send(result(5.0));
        drop(driver);
        let t = Duration::from_millis(20);
        assert_eq!(facade.recv(t).unwrap().reward, 5.0);
        assert!(matches!(facade.recv(t), Err(EnvError::DriverDisconnected)));
        assert!(matches!(
            facade.send(ActionMessage::NoAction),
            Err(EnvError::DriverDisconnected)
        ));
    }

    #[test]
    fn exchange_drains_final_result_after_driver_exit() {
        let (facade, driver) = rendezvous();
        driver.send(result(-500.0));
        drop(driver);
        let t = Duration::from_millis(20);
        assert_eq!(
            facade.exchange(ActionMessage::NoAction, t).unwrap().reward,
            -500.0
        );
        assert!(matches!(
            facade.exchange(ActionMessage::NoAction, t),
            Err(EnvError::DriverDisconnected)
        ));
    }
}
