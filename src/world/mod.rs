//! World model shared by the engine boundary, effectors, and encoders.

pub mod engine;
pub mod state;
pub mod tech_tree;
pub mod types;

pub use engine::{
    engine_factory, Command, CommandError, CommandSink, EngineError, EngineFactory, EngineStatus,
    GameEngine, Target,
};
pub use state::{closer_than, closest_to, Located, ResourceKind, ResourceNode, Unit, WorldState};
pub use tech_tree::TechTree;
pub use types::{KindInfo, Outcome, Position, Tag, UnitKind};
