//! Economy routines: expansions, gas, workers, supply.

use rand::seq::SliceRandom;
use tracing::debug;

use crate::world::{closer_than, closest_to, Command, Unit, UnitKind};

use super::{EffectorContext, EffectorError};

/// Geysers farther than this from a nexus are not claimed by it.
const GEYSER_CLAIM_RANGE: f64 = 15.0;
/// Pylons are placed this far from a nexus toward the map center.
const PYLON_OFFSET: f64 = 5.0;
/// A pylon is queued once free supply drops below this.
const SUPPLY_MARGIN: u32 = 5;

/// Trains a worker at every finished idle nexus while affordable.
pub fn build_workers(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    for nexus in world.ready_structures_of(UnitKind::Nexus).filter(|n| n.idle) {
        if ctx.can_afford(UnitKind::Probe) {
            ctx.issue(Command::Train {
                producer: nexus.tag,
                kind: UnitKind::Probe,
            })?;
        }
    }
    Ok(())
}

/// Queues one pylon near a random nexus when supply is running out.
pub fn build_pylons(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    if ctx.already_pending(UnitKind::Pylon) > 0 || ctx.supply_left() >= SUPPLY_MARGIN {
        return Ok(());
    }
    let world = ctx.world();
    let nexuses: Vec<&Unit> = world.ready_structures_of(UnitKind::Nexus).collect();
    let Some(nexus) = nexuses.choose(ctx.rng()) else {
        return Ok(());
    };
    let near = nexus.position.towards(&world.map_center, PYLON_OFFSET);
    if ctx.can_afford(UnitKind::Pylon) {
        ctx.issue(Command::Build {
            kind: UnitKind::Pylon,
            near,
        })?;
    }
    Ok(())
}

/// Builds an assimilator on every free geyser near a finished nexus.
///
/// Geysers are skipped while no worker is left to send.
pub fn build_assimilators(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    let workers: Vec<&Unit> = world.units_of(UnitKind::Probe).collect();
    for nexus in world.ready_structures_of(UnitKind::Nexus) {
        for geyser in closer_than(&world.vespene_geysers, GEYSER_CLAIM_RANGE, &nexus.position) {
            let taken = world
                .structures_of(UnitKind::Assimilator)
                .any(|a| a.position.distance_to(&geyser.position) < 1.0)
                || ctx.issued().iter().any(
                    |c| matches!(c, Command::BuildOn { target, .. } if *target == geyser.tag),
                );
            if taken || !ctx.can_afford(UnitKind::Assimilator) {
                continue;
            }
            let Some(worker) = closest_to(&workers, &geyser.position) else {
                debug!(geyser = geyser.tag, "no worker for assimilator");
                continue;
            };
            ctx.issue(Command::BuildOn {
                kind: UnitKind::Assimilator,
                worker: worker.tag,
                target: geyser.tag,
            })?;
        }
    }
    Ok(())
}

/// Takes the next free expansion if affordable and none is on the way.
pub fn expand(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    if !ctx.can_afford(UnitKind::Nexus) || ctx.already_pending(UnitKind::Nexus) > 0 {
        return Ok(());
    }
    if let Some(near) = ctx.world().next_expansion() {
        ctx.issue(Command::Build {
            kind: UnitKind::Nexus,
            near,
        })?;
    }
    Ok(())
}
