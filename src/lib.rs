//! rts_bridge - a cross-thread reinforcement-learning bridge for RTS engines
//!
//! A game engine runs its own tick loop on a driver thread; an agent wants
//! blocking `reset`/`step` calls with fixed-shape observations and scalar
//! rewards. This crate joins the two: macro actions are expanded into engine
//! commands by effector routines, world snapshots are encoded as raster or
//! feature observations, and rewards follow a shaped per-tick schedule with
//! terminal bonuses. A bundled sandbox engine and a few baseline policies make
//! the whole loop runnable without an external game.

pub mod action;
pub mod bridge;
pub mod config;
pub mod effectors;
pub mod encoding;
pub mod metrics;
pub mod policy;
pub mod sandbox;
pub mod world;

#[cfg(test)]
mod test_support;

pub use action::Action;
pub use bridge::{EnvError, EnvPool, GameEnv, StepResult};

/// Identifier type used for driver sessions.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
