use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Which party of a rendezvous was left waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallSide {
    /// The facade waited for a result.
    Facade,
    /// The driver waited for an action.
    Driver,
}

impl fmt::Display for StallSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StallSide::Facade => f.write_str("facade waiting for a result"),
            StallSide::Driver => f.write_str("driver waiting for an action"),
        }
    }
}

/// Errors surfaced by the environment bridge.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("environment stalled: {side} for {waited:?}")]
    EnvironmentStalled { side: StallSide, waited: Duration },

    #[error("session driver disconnected")]
    DriverDisconnected,

    #[error("no running episode; call reset first")]
    NotRunning,

    #[error("invalid action index {0}")]
    InvalidAction(i64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("pool member {index} is gone")]
    PoolMemberLost { index: usize },

    #[error("expected {expected} actions, got {got}")]
    ActionCountMismatch { expected: usize, got: usize },
}

impl EnvError {
    /// True for errors after which the episode cannot continue without a reset.
    pub fn needs_reset(&self) -> bool {
        matches!(
            self,
            EnvError::EnvironmentStalled { .. }
                | EnvError::DriverDisconnected
                | EnvError::NotRunning
        )
    }
}
