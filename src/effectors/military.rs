//! Military routines: the stargate tech chain, void rays, and the attack order.

use rand::seq::SliceRandom;

use crate::world::{closer_than, closest_to, Command, Target, Unit, UnitKind};

use super::{EffectorContext, EffectorError};

/// Structures are placed this far from a pylon toward the map center.
const PLACEMENT_OFFSET: f64 = 5.0;
/// Enemies within this range of a void ray are preferred targets.
const LOCAL_TARGET_RANGE: f64 = 10.0;

/// Builds the first gateway next to the pylon closest to the main nexus.
pub fn build_gateway(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    let Some(main) = world.structures_of(UnitKind::Nexus).next() else {
        return Ok(());
    };
    if world.ready_structures_of(UnitKind::Gateway).next().is_some()
        || ctx.already_pending(UnitKind::Gateway) > 0
        || !ctx.tech().is_unlocked(UnitKind::Gateway, world)
        || !ctx.can_afford(UnitKind::Gateway)
    {
        return Ok(());
    }
    let pylons: Vec<&Unit> = world.ready_structures_of(UnitKind::Pylon).collect();
    if let Some(pylon) = closest_to(&pylons, &main.position) {
        ctx.issue(Command::Build {
            kind: UnitKind::Gateway,
            near: pylon.position,
        })?;
    }
    Ok(())
}

/// Builds the single cybernetics core once a gateway is finished.
pub fn build_cybernetics_core(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    if world.structures_of(UnitKind::Nexus).next().is_none()
        || world.structures_of(UnitKind::CyberneticsCore).next().is_some()
        || !ctx.tech().is_unlocked(UnitKind::CyberneticsCore, world)
    {
        return Ok(());
    }
    let pylons: Vec<&Unit> = world.ready_structures_of(UnitKind::Pylon).collect();
    let Some(pylon) = pylons.choose(ctx.rng()) else {
        return Ok(());
    };
    let near = pylon.position.towards(&world.map_center, PLACEMENT_OFFSET);
    if ctx.can_afford(UnitKind::CyberneticsCore)
        && ctx.already_pending(UnitKind::CyberneticsCore) == 0
    {
        ctx.issue(Command::Build {
            kind: UnitKind::CyberneticsCore,
            near,
        })?;
    }
    Ok(())
}

/// Adds a stargate next to a finished pylon, one at a time.
pub fn build_stargates(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    if world.structures_of(UnitKind::Nexus).next().is_none()
        || !ctx.tech().is_unlocked(UnitKind::Stargate, world)
    {
        return Ok(());
    }
    for pylon in world.ready_structures_of(UnitKind::Pylon) {
        if ctx.can_afford(UnitKind::Stargate) && ctx.already_pending(UnitKind::Stargate) == 0 {
            ctx.issue(Command::Build {
                kind: UnitKind::Stargate,
                near: pylon.position.towards(&world.map_center, PLACEMENT_OFFSET),
            })?;
        }
    }
    Ok(())
}

/// Trains a void ray at every finished idle stargate while affordable.
pub fn build_void_rays(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    for stargate in world
        .ready_structures_of(UnitKind::Stargate)
        .filter(|s| s.idle)
    {
        if ctx.can_afford(UnitKind::VoidRay) && ctx.supply_left() > 0 {
            ctx.issue(Command::Train {
                producer: stargate.tag,
                kind: UnitKind::VoidRay,
            })?;
        }
    }
    Ok(())
}

/// Sends every idle void ray at the enemy.
///
/// Target preference: a nearby enemy unit, any enemy unit, a nearby enemy
/// structure, any enemy structure, then the first enemy start location.
pub fn attack(ctx: &mut EffectorContext<'_>) -> Result<(), EffectorError> {
    let world = ctx.world();
    for ray in world.units_of(UnitKind::VoidRay).filter(|u| u.idle) {
        let near_units = closer_than(&world.enemy_units, LOCAL_TARGET_RANGE, &ray.position);
        let near_structures =
            closer_than(&world.enemy_structures, LOCAL_TARGET_RANGE, &ray.position);
        let all_units: Vec<&Unit> = world.enemy_units.iter().collect();
        let all_structures: Vec<&Unit> = world.enemy_structures.iter().collect();

        let candidates = [near_units, all_units, near_structures, all_structures]
            .into_iter()
            .find(|c| !c.is_empty());
        let target = match candidates {
            Some(units) => units.choose(ctx.rng()).map(|u| Target::Unit(u.tag)),
            None => world.enemy_start_locations.first().copied().map(Target::Point),
        };
        if let Some(target) = target {
            ctx.issue(Command::Attack {
                unit: ray.tag,
                target,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{base_world, RecordingSink};
    use crate::world::{Position, TechTree, WorldState};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(
        world: &WorldState,
        routine: fn(&mut EffectorContext<'_>) -> Result<(), EffectorError>,
    ) -> Vec<Command> {
        let tech = TechTree::protoss();
        let mut sink = RecordingSink::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut ctx = EffectorContext::new(world, &tech, &mut sink, &mut rng);
        routine(&mut ctx).unwrap();
        ctx.issued().to_vec()
    }

    fn add(world: &mut WorldState, tag: u64, kind: UnitKind, x: f64, y: f64) {
        let unit = Unit::new(tag, kind, Position::new(x, y));
        if kind.is_structure() {
            world.own_structures.push(unit);
        } else {
            world.own_units.push(unit);
        }
    }

    #[test]
    fn gateway_needs_ready_pylon() {
        let mut world = base_world();
        world.minerals = 500;
        assert!(run(&world, build_gateway).is_empty());

        add(&mut world, 100, UnitKind::Pylon, 20.0, 20.0);
        let issued = run(&world, build_gateway);
        assert_eq!(
            issued,
            vec![Command::Build {
                kind: UnitKind::Gateway,
                near: Position::new(20.0, 20.0),
            }]
        );
    }

    #[test]
    fn only_one_gateway() {
        let mut world = base_world();
        world.minerals = 500;
        add(&mut world, 100, UnitKind::Pylon, 20.0, 20.0);
        add(&mut world, 101, UnitKind::Gateway, 22.0, 20.0);
        assert!(run(&world, build_gateway).is_empty());
    }

    #[test]
    fn core_follows_finished_gateway() {
        let mut world = base_world();
        world.minerals = 500;
        add(&mut world, 100, UnitKind::Pylon, 20.0, 20.0);
        add(&mut world, 101, UnitKind::Gateway, 22.0, 20.0);
        world.own_structures.last_mut().unwrap().ready = false;
        assert!(run(&world, build_cybernetics_core).is_empty());

        world.own_structures.last_mut().unwrap().ready = true;
        let issued = run(&world, build_cybernetics_core);
        assert_eq!(issued.len(), 1);
        assert!(matches!(
            issued[0],
            Command::Build {
                kind: UnitKind::CyberneticsCore,
                ..
            }
        ));
    }

    #[test]
    fn stargates_one_per_tick() {
        let mut world = base_world();
        world.minerals = 1000;
        world.vespene = 1000;
        add(&mut world, 100, UnitKind::Pylon, 20.0, 20.0);
        add(&mut world, 101, UnitKind::Pylon, 24.0, 20.0);
        add(&mut world, 102, UnitKind::Gateway, 22.0, 20.0);
        add(&mut world, 103, UnitKind::CyberneticsCore, 22.0, 24.0);
        let issued = run(&world, build_stargates);
        assert_eq!(issued.len(), 1);
    }

    #[test]
    fn void_rays_limited_by_gas() {
        let mut world = base_world();
        world.minerals = 1000;
        world.vespene = 200;
        world.supply_cap = 40;
        add(&mut world, 100, UnitKind::Stargate, 20.0, 20.0);
        add(&mut world, 101, UnitKind::Stargate, 24.0, 20.0);
        assert_eq!(run(&world, build_void_rays).len(), 1);
    }

    #[test]
    fn attack_prefers_nearby_units() {
        let mut world = base_world();
        add(&mut world, 100, UnitKind::VoidRay, 40.0, 40.0);
        world
            .enemy_units
            .push(Unit::new(200, UnitKind::Marine, Position::new(43.0, 40.0)));
        world
            .enemy_units
            .push(Unit::new(201, UnitKind::Marine, Position::new(5.0, 60.0)));
        world
            .enemy_structures
            .push(Unit::new(202, UnitKind::Barracks, Position::new(41.0, 40.0)));
        let issued = run(&world, attack);
        assert_eq!(
            issued,
            vec![Command::Attack {
                unit: 100,
                target: Target::Unit(200),
            }]
        );
    }

    #[test]
    fn attack_falls_back_to_start_location() {
        let mut world = base_world();
        add(&mut world, 100, UnitKind::VoidRay, 40.0, 40.0);
        add(&mut world, 101, UnitKind::VoidRay, 41.0, 40.0);
        world.own_units.last_mut().unwrap().idle = false;
        let start = world.enemy_start_locations[0];
        let issued = run(&world, attack);
        assert_eq!(
            issued,
            vec![Command::Attack {
                unit: 100,
                target: Target::Point(start),
            }]
        );
    }
}
