//! Boundary to the external game engine.
//!
//! The bridge never speaks an engine's own protocol. It needs three things:
//! a native tick with an end-of-game signal, owned world snapshots, and a
//! sink that accepts commands and may reject them.

use std::sync::Arc;

use qtty::{Quantity, Second};
use thiserror::Error;

use super::state::WorldState;
use super::types::{Outcome, Position, Tag, UnitKind};

/// What an attack order aims at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Unit(Tag),
    Point(Position),
}

/// An in-world order for the controlled player.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Queue `kind` at the producing structure.
    Train { producer: Tag, kind: UnitKind },
    /// Place structure `kind` near a point; the engine picks the worker.
    Build { kind: UnitKind, near: Position },
    /// Order `worker` to build `kind` on top of node `target` (gas harvesters).
    BuildOn {
        kind: UnitKind,
        worker: Tag,
        target: Tag,
    },
    Attack { unit: Tag, target: Target },
    Move { unit: Tag, to: Position },
    /// Send idle workers back to harvesting.
    DistributeWorkers,
}

/// Engine-side rejection of a command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("cannot afford {0}")]
    Unaffordable(UnitKind),

    #[error("not enough supply for {0}")]
    SupplyBlocked(UnitKind),

    #[error("prerequisite {missing} missing for {kind}")]
    MissingPrerequisite { kind: UnitKind, missing: UnitKind },

    #[error("unknown tag {0}")]
    UnknownTag(Tag),

    #[error("cannot place {kind} near {near}")]
    InvalidPlacement { kind: UnitKind, near: Position },

    #[error("{producer} cannot produce {kind}")]
    InvalidProducer { producer: UnitKind, kind: UnitKind },
}

/// Failure of the engine itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine failed to launch: {0}")]
    Launch(String),

    #[error("engine crashed: {0}")]
    Crashed(String),
}

/// Result of one native engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Running,
    Ended(Outcome),
}

/// Accepts commands for the controlled player.
///
/// Rejections are ordinary: a command whose preconditions do not hold is
/// refused with a [`CommandError`] and changes nothing.
pub trait CommandSink {
    fn issue(&mut self, command: Command) -> Result<(), CommandError>;
}

/// One running game session.
///
/// Engines are constructed inside the driver thread, so implementations need
/// not be `Send`.
pub trait GameEngine: CommandSink {
    /// Advances the simulation by one native tick.
    fn advance(&mut self) -> Result<EngineStatus, EngineError>;

    /// Returns an owned snapshot of the current world.
    fn snapshot(&self) -> WorldState;

    /// Current game time. Polled every native tick.
    fn game_time(&self) -> Quantity<Second> {
        self.snapshot().game_time
    }

    /// Forfeits the game; the next [`advance`](Self::advance) reports the end.
    fn leave(&mut self);
}

/// Builds a fresh engine for every episode.
pub type EngineFactory =
    Arc<dyn Fn() -> Result<Box<dyn GameEngine>, EngineError> + Send + Sync + 'static>;

/// Wraps a constructor closure as an [`EngineFactory`].
pub fn engine_factory<E, F>(make: F) -> EngineFactory
where
    E: GameEngine + 'static,
    F: Fn() -> Result<E, EngineError> + Send + Sync + 'static,
{
    Arc::new(move || make().map(|engine| Box::new(engine) as Box<dyn GameEngine>))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display() {
        let e = CommandError::MissingPrerequisite {
            kind: UnitKind::Stargate,
            missing: UnitKind::CyberneticsCore,
        };
        assert_eq!(
            e.to_string(),
            "prerequisite cybernetics_core missing for stargate"
        );
        assert_eq!(
            CommandError::Unaffordable(UnitKind::Nexus).to_string(),
            "cannot afford nexus"
        );
    }

    #[test]
    fn engine_error_display() {
        let e = EngineError::Launch("no map".into());
        assert_eq!(e.to_string(), "engine failed to launch: no map");
    }
}
