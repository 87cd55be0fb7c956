//! A small self-contained RTS simulation behind the engine boundary.
//!
//! The sandbox plays both sides of a two-player map: the controlled player
//! starts with a nexus and twelve probes, the opponent with a command
//! center, barracks and a marine garrison that periodically reinforces and
//! attacks. Harvesting is abstract, workers travel instantly and movement is
//! straight-line. Costs, supply, the tech tree and placement are enforced,
//! so effectors and the bridge can be exercised end to end.

mod combat;
mod engine;
mod map;

use crate::world::EngineError;

pub use engine::SandboxEngine;

/// Configuration for [`SandboxEngine`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SandboxConfig {
    /// Seed for spawn jitter and reinforcement placement; `None` seeds from entropy.
    pub seed: Option<u64>,

    // --- Map ---
    pub map_width: f64,
    pub map_height: f64,
    /// Native ticks per game second.
    pub loops_per_second: f64,

    // --- Economy ---
    pub starting_workers: usize,
    pub starting_minerals: u32,
    /// Minerals per harvesting worker per game second.
    pub mineral_rate: f64,
    /// Vespene per ready assimilator per game second.
    pub vespene_rate: f64,

    // --- Opponent ---
    /// Marines garrisoned at the enemy base at start.
    pub enemy_units: usize,
    /// Barracks next to the enemy command center.
    pub enemy_barracks: usize,
    /// Game seconds between marine reinforcements; `None` disables them.
    pub reinforce_interval: Option<f64>,
    pub max_enemy_units: usize,
    /// Game seconds between attack waves on the player's start location.
    pub wave_interval: Option<f64>,
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::Launch(msg.to_string()));
        if !(self.map_width >= 32.0 && self.map_height >= 32.0) {
            return invalid("map must be at least 32 × 32");
        }
        if !(self.loops_per_second > 0.0) {
            return invalid("loops_per_second must be positive");
        }
        if !(self.mineral_rate >= 0.0 && self.vespene_rate >= 0.0) {
            return invalid("income rates must be non-negative");
        }
        if self.reinforce_interval.is_some_and(|s| !(s > 0.0))
            || self.wave_interval.is_some_and(|s| !(s > 0.0))
        {
            return invalid("enemy intervals must be positive");
        }
        Ok(())
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            seed: None,
            map_width: 96.0,
            map_height: 96.0,
            loops_per_second: 22.4,
            starting_workers: 12,
            starting_minerals: 50,
            mineral_rate: 0.95,
            vespene_rate: 2.7,
            enemy_units: 6,
            enemy_barracks: 2,
            reinforce_interval: Some(45.0),
            max_enemy_units: 24,
            wave_interval: Some(420.0),
        }
    }
}
