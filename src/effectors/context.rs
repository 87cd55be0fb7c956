//! Per-tick state shared by the effector routines of one action.

use std::collections::BTreeMap;

use rand::rngs::StdRng;

use crate::world::{Command, CommandSink, TechTree, UnitKind, WorldState};

use super::EffectorError;

/// What one tick's routines see and may do.
///
/// The snapshot is taken once per tick, so the context keeps its own budget:
/// each accepted command deducts its cost locally and counts as pending, and
/// later routines in the same tick see the reduced budget.
pub struct EffectorContext<'a> {
    world: &'a WorldState,
    tech: &'a TechTree,
    sink: &'a mut dyn CommandSink,
    rng: &'a mut StdRng,
    minerals: u32,
    vespene: u32,
    supply_left: u32,
    pending: BTreeMap<UnitKind, u32>,
    issued: Vec<Command>,
}

impl<'a> EffectorContext<'a> {
    pub fn new(
        world: &'a WorldState,
        tech: &'a TechTree,
        sink: &'a mut dyn CommandSink,
        rng: &'a mut StdRng,
    ) -> Self {
        Self {
            world,
            tech,
            sink,
            rng,
            minerals: world.minerals,
            vespene: world.vespene,
            supply_left: world.supply_left(),
            pending: world.pending.clone(),
            issued: Vec::new(),
        }
    }

    pub fn world(&self) -> &'a WorldState {
        self.world
    }

    pub fn tech(&self) -> &'a TechTree {
        self.tech
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut *self.rng
    }

    /// Resources and supply cover one `kind`, after this tick's spending.
    pub fn can_afford(&self, kind: UnitKind) -> bool {
        let info = kind.info();
        self.minerals >= info.minerals
            && self.vespene >= info.vespene
            && self.supply_left >= info.supply_cost
    }

    pub fn already_pending(&self, kind: UnitKind) -> u32 {
        self.pending.get(&kind).copied().unwrap_or(0)
    }

    pub fn supply_left(&self) -> u32 {
        self.supply_left
    }

    /// Commands accepted so far this tick.
    pub fn issued(&self) -> &[Command] {
        &self.issued
    }

    /// Sends `command` to the engine and books its cost on acceptance.
    pub fn issue(&mut self, command: Command) -> Result<(), EffectorError> {
        self.sink.issue(command.clone())?;
        let produced = match &command {
            Command::Train { kind, .. }
            | Command::Build { kind, .. }
            | Command::BuildOn { kind, .. } => Some(*kind),
            _ => None,
        };
        if let Some(kind) = produced {
            let info = kind.info();
            self.minerals = self.minerals.saturating_sub(info.minerals);
            self.vespene = self.vespene.saturating_sub(info.vespene);
            self.supply_left = self.supply_left.saturating_sub(info.supply_cost);
            *self.pending.entry(kind).or_insert(0) += 1;
        }
        self.issued.push(command);
        Ok(())
    }
}
