//! Movement and combat for both sides of the sandbox.

use std::collections::HashMap;

use crate::world::{Position, Tag, Target, Unit, UnitKind, WorldState};

/// Combat units notice enemies within this range.
pub(super) const SIGHT: f64 = 10.0;

/// Standing order of an own unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Order {
    Attack(Target),
    Move(Position),
}

#[derive(Debug, Clone, Copy)]
struct Weapon {
    speed: f64,
    range: f64,
    dps: f64,
}

fn weapon(kind: UnitKind) -> Option<Weapon> {
    match kind {
        UnitKind::VoidRay => Some(Weapon {
            speed: 3.85,
            range: 6.0,
            dps: 20.0,
        }),
        UnitKind::Marine => Some(Weapon {
            speed: 3.15,
            range: 5.0,
            dps: 9.8,
        }),
        _ => None,
    }
}

fn speed(kind: UnitKind) -> f64 {
    weapon(kind).map_or(3.94, |w| w.speed)
}

/// Map bounds, for clamping movement.
#[derive(Debug, Clone, Copy)]
pub(super) struct Bounds {
    pub width: f64,
    pub height: f64,
}

fn find(units: &[Unit], tag: Tag) -> Option<&Unit> {
    units.iter().find(|u| u.tag == tag)
}

fn enemy_position(world: &WorldState, tag: Tag) -> Option<Position> {
    find(&world.enemy_units, tag)
        .or_else(|| find(&world.enemy_structures, tag))
        .map(|u| u.position)
}

fn own_position(world: &WorldState, tag: Tag) -> Option<Position> {
    find(&world.own_units, tag)
        .or_else(|| find(&world.own_structures, tag))
        .map(|u| u.position)
}

/// Nearest entity within `range`, units before structures.
fn nearest_within(units: &[Unit], structures: &[Unit], from: &Position, range: f64) -> Option<Tag> {
    let nearest = |list: &[Unit]| {
        list.iter()
            .map(|u| (u.tag, u.position.distance_to(from)))
            .filter(|(_, d)| *d <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(tag, _)| tag)
    };
    nearest(units).or_else(|| nearest(structures))
}

/// What one unit does this tick.
struct Plan {
    position: Position,
    attacking: bool,
    target_in_range: bool,
    idle: bool,
    hit: Option<(Tag, f64)>,
}

/// Closes in on `target` and fires once in range.
fn engage(unit: &Unit, target: Tag, at: Position, dt: f64, bounds: Bounds) -> Plan {
    let Some(weapon) = weapon(unit.kind) else {
        return Plan {
            position: unit.position,
            attacking: false,
            target_in_range: false,
            idle: true,
            hit: None,
        };
    };
    let mut position = unit.position;
    let in_range = position.distance_to(&at) <= weapon.range;
    if !in_range {
        position.move_toward(&at, weapon.speed * dt, bounds.width, bounds.height);
    }
    Plan {
        position,
        attacking: true,
        target_in_range: in_range,
        idle: false,
        hit: in_range.then_some((target, weapon.dps * dt)),
    }
}

fn travel(unit: &Unit, to: Position, dt: f64, bounds: Bounds) -> (Position, bool) {
    let mut position = unit.position;
    position.move_toward(&to, speed(unit.kind) * dt, bounds.width, bounds.height);
    let arrived = position.distance_to(&to) < 0.5;
    (position, arrived)
}

fn rest(unit: &Unit) -> Plan {
    Plan {
        position: unit.position,
        attacking: false,
        target_in_range: false,
        idle: true,
        hit: None,
    }
}

/// Moves and fires every own unit according to its order.
///
/// Returns damage dealt, by enemy tag.
pub(super) fn step_own_units(
    world: &mut WorldState,
    orders: &mut HashMap<Tag, Order>,
    dt: f64,
    bounds: Bounds,
) -> Vec<(Tag, f64)> {
    let mut hits = Vec::new();
    for i in 0..world.own_units.len() {
        let unit = &world.own_units[i];
        let plan = match orders.get(&unit.tag).copied() {
            Some(Order::Attack(Target::Unit(target))) => match enemy_position(world, target) {
                Some(at) => engage(unit, target, at, dt, bounds),
                None => {
                    orders.remove(&unit.tag);
                    rest(unit)
                }
            },
            Some(Order::Attack(Target::Point(point))) => {
                match nearest_within(&world.enemy_units, &world.enemy_structures, &unit.position, SIGHT) {
                    Some(target) => {
                        orders.insert(unit.tag, Order::Attack(Target::Unit(target)));
                        let at = enemy_position(world, target).unwrap_or(point);
                        engage(unit, target, at, dt, bounds)
                    }
                    None => {
                        let (position, arrived) = travel(unit, point, dt, bounds);
                        if arrived {
                            orders.remove(&unit.tag);
                        }
                        Plan {
                            position,
                            attacking: false,
                            target_in_range: false,
                            idle: arrived,
                            hit: None,
                        }
                    }
                }
            }
            Some(Order::Move(to)) => {
                let (position, arrived) = travel(unit, to, dt, bounds);
                if arrived {
                    orders.remove(&unit.tag);
                }
                Plan {
                    position,
                    attacking: false,
                    target_in_range: false,
                    idle: arrived,
                    hit: None,
                }
            }
            // Idle combat units return fire without chasing.
            None => match weapon(unit.kind).and_then(|w| {
                nearest_within(&world.enemy_units, &[], &unit.position, w.range)
            }) {
                Some(target) => match enemy_position(world, target) {
                    Some(at) => engage(unit, target, at, dt, bounds),
                    None => rest(unit),
                },
                None => rest(unit),
            },
        };

        hits.extend(plan.hit);
        let unit = &mut world.own_units[i];
        unit.position = plan.position;
        unit.attacking = plan.attacking;
        unit.target_in_range = plan.target_in_range;
        unit.idle = plan.idle;
    }
    hits
}

/// Moves and fires every enemy unit.
///
/// Marines attack own entities in sight; otherwise they march on `wave` if
/// an attack wave is on, or return to `posts`. Returns damage dealt, by own
/// tag.
pub(super) fn step_enemy_units(
    world: &mut WorldState,
    posts: &HashMap<Tag, Position>,
    wave: Option<Position>,
    dt: f64,
    bounds: Bounds,
) -> Vec<(Tag, f64)> {
    let mut hits = Vec::new();
    for i in 0..world.enemy_units.len() {
        let unit = &world.enemy_units[i];
        let target = nearest_within(&world.own_units, &world.own_structures, &unit.position, SIGHT);
        let plan = match target.and_then(|t| own_position(world, t).map(|at| (t, at))) {
            Some((target, at)) => engage(unit, target, at, dt, bounds),
            None => match wave.or_else(|| posts.get(&unit.tag).copied()) {
                Some(goal) => {
                    let (position, arrived) = travel(unit, goal, dt, bounds);
                    Plan {
                        position,
                        attacking: false,
                        target_in_range: false,
                        idle: arrived,
                        hit: None,
                    }
                }
                None => rest(unit),
            },
        };

        hits.extend(plan.hit);
        let unit = &mut world.enemy_units[i];
        unit.position = plan.position;
        unit.attacking = plan.attacking;
        unit.target_in_range = plan.target_in_range;
        unit.idle = plan.idle;
    }
    hits
}

/// Applies damage to the matching entities in `units` and `structures`.
pub(super) fn apply_hits(units: &mut [Unit], structures: &mut [Unit], hits: &[(Tag, f64)]) {
    for &(tag, damage) in hits {
        if let Some(u) = units
            .iter_mut()
            .chain(structures.iter_mut())
            .find(|u| u.tag == tag)
        {
            u.health -= damage;
        }
    }
}

/// Removes destroyed entities; returns their tags.
pub(super) fn remove_dead(units: &mut Vec<Unit>) -> Vec<Tag> {
    let dead: Vec<Tag> = units
        .iter()
        .filter(|u| u.health <= 0.0)
        .map(|u| u.tag)
        .collect();
    units.retain(|u| u.health > 0.0);
    dead
}
