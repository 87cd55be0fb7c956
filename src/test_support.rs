//! Shared fixtures for unit tests: a recording command sink, a small base
//! world, and scripted engines with controllable pacing and endings.

use std::thread;
use std::time::Duration;

use qtty::{Quantity, Second};

use crate::world::{
    Command, CommandError, CommandSink, EngineError, EngineStatus, GameEngine, Outcome, Position,
    ResourceKind, ResourceNode, Unit, UnitKind, WorldState,
};

/// Accepts every command except those producing `reject`.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub accepted: Vec<Command>,
    reject: Option<UnitKind>,
}

impl RecordingSink {
    pub fn rejecting(kind: UnitKind) -> Self {
        Self {
            accepted: Vec::new(),
            reject: Some(kind),
        }
    }
}

fn rejection(command: &Command, reject: Option<UnitKind>) -> Option<CommandError> {
    let kind = match command {
        Command::Train { kind, .. } | Command::Build { kind, .. } | Command::BuildOn { kind, .. } => {
            *kind
        }
        _ => return None,
    };
    (Some(kind) == reject).then(|| CommandError::InvalidPlacement {
        kind,
        near: Position::new(0.0, 0.0),
    })
}

impl CommandSink for RecordingSink {
    fn issue(&mut self, command: Command) -> Result<(), CommandError> {
        if let Some(err) = rejection(&command, self.reject) {
            return Err(err);
        }
        self.accepted.push(command);
        Ok(())
    }
}

/// One ready nexus with twelve probes, two geysers and a few mineral fields,
/// an enemy start location and two expansion sites. No resources banked.
pub fn base_world() -> WorldState {
    let start = Position::new(16.0, 16.0);
    let mut world = WorldState {
        start_location: start,
        map_center: Position::new(32.0, 32.0),
        enemy_start_locations: vec![Position::new(52.0, 52.0)],
        expansion_locations: vec![start, Position::new(16.0, 40.0), Position::new(52.0, 52.0)],
        supply_used: 12,
        supply_cap: 15,
        ..WorldState::default()
    };
    world
        .own_structures
        .push(Unit::new(1, UnitKind::Nexus, start));
    for i in 0..12 {
        world.own_units.push(Unit::new(
            10 + i,
            UnitKind::Probe,
            Position::new(12.0 + (i % 4) as f64, 12.0 + (i / 4) as f64),
        ));
    }
    for i in 0..4 {
        let mut mineral = ResourceNode::new(
            30 + i,
            ResourceKind::Minerals,
            Position::new(9.0, 10.0 + 2.0 * i as f64),
        );
        mineral.visible = true;
        world.mineral_fields.push(mineral);
    }
    world
        .vespene_geysers
        .push(ResourceNode::new(40, ResourceKind::Vespene, Position::new(23.0, 12.0)));
    world
        .vespene_geysers
        .push(ResourceNode::new(41, ResourceKind::Vespene, Position::new(12.0, 23.0)));
    world
}

/// Engine over a fixed world whose clock advances `dt` per native tick.
pub struct ScriptedEngine {
    pub world: WorldState,
    pub dt: f64,
    /// End the game with this outcome once game time reaches the given second.
    pub end_at: Option<(f64, Outcome)>,
    /// Return an error from `advance` once game time reaches this second.
    pub crash_at: Option<f64>,
    /// Sleep this long inside each `advance`.
    pub stall: Option<Duration>,
    /// Panic inside `advance` once game time reaches this second.
    pub panic_at: Option<f64>,
    pub reject: Option<UnitKind>,
    left: bool,
}

impl ScriptedEngine {
    pub fn new(world: WorldState) -> Self {
        Self {
            world,
            dt: 0.25,
            end_at: None,
            crash_at: None,
            stall: None,
            panic_at: None,
            reject: None,
            left: false,
        }
    }

    /// Base world plus one void ray engaging a marine at close range.
    pub fn engaged() -> Self {
        let mut world = base_world();
        let mut ray = Unit::new(90, UnitKind::VoidRay, Position::new(40.0, 40.0));
        ray.attacking = true;
        ray.target_in_range = true;
        ray.idle = false;
        world.own_units.push(ray);
        world
            .enemy_units
            .push(Unit::new(91, UnitKind::Marine, Position::new(44.0, 40.0)));
        Self::new(world)
    }

    pub fn ending_at(mut self, second: f64, outcome: Outcome) -> Self {
        self.end_at = Some((second, outcome));
        self
    }

    fn now(&self) -> f64 {
        self.world.game_time.value()
    }
}

impl CommandSink for ScriptedEngine {
    fn issue(&mut self, command: Command) -> Result<(), CommandError> {
        match rejection(&command, self.reject) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl GameEngine for ScriptedEngine {
    fn advance(&mut self) -> Result<EngineStatus, EngineError> {
        if let Some(pause) = self.stall {
            thread::sleep(pause);
        }
        if self.left {
            return Ok(EngineStatus::Ended(Outcome::Defeat));
        }
        self.world.game_time = Quantity::new(self.now() + self.dt);
        if let Some(at) = self.panic_at {
            if self.now() >= at {
                panic!("scripted engine panic");
            }
        }
        if let Some(at) = self.crash_at {
            if self.now() >= at {
                return Err(EngineError::Crashed("scripted crash".into()));
            }
        }
        match self.end_at {
            Some((at, outcome)) if self.now() >= at => Ok(EngineStatus::Ended(outcome)),
            _ => Ok(EngineStatus::Running),
        }
    }

    fn snapshot(&self) -> WorldState {
        self.world.clone()
    }

    fn game_time(&self) -> Quantity<Second> {
        self.world.game_time
    }

    fn leave(&mut self) {
        self.left = true;
    }
}
