//! Initial layout of the sandbox map.

use rand::rngs::StdRng;
use rand::Rng;

use crate::world::{Position, ResourceKind, ResourceNode, Tag, Unit, UnitKind, WorldState};

use super::SandboxConfig;

const MINERALS_PER_BASE: usize = 8;

/// Hands out fresh tags.
#[derive(Debug)]
pub(super) struct Tags(Tag);

impl Tags {
    pub(super) fn new() -> Self {
        Self(1)
    }

    pub(super) fn next(&mut self) -> Tag {
        let tag = self.0;
        self.0 += 1;
        tag
    }
}

/// Expansion sites, the player's start first and the enemy's start last.
fn expansion_sites(width: f64, height: f64) -> Vec<Position> {
    [
        (0.2, 0.2),
        (0.2, 0.55),
        (0.55, 0.2),
        (0.5, 0.5),
        (0.8, 0.45),
        (0.45, 0.8),
        (0.8, 0.8),
    ]
    .into_iter()
    .map(|(fx, fy)| Position::new(fx * width, fy * height))
    .collect()
}

/// Mineral fields in an arc behind `base`, away from the map center.
fn resources_around(base: Position, center: Position, tags: &mut Tags, world: &mut WorldState) {
    let (dx, dy) = center.direction_to(&base);
    let angle = dy.atan2(dx);
    for i in 0..MINERALS_PER_BASE {
        let spread = (i as f64 - (MINERALS_PER_BASE - 1) as f64 / 2.0) * 0.3;
        let a = angle + spread;
        let position = Position::new(base.x + 7.0 * a.cos(), base.y + 7.0 * a.sin());
        world
            .mineral_fields
            .push(ResourceNode::new(tags.next(), ResourceKind::Minerals, position));
    }
    // One geyser on each flank.
    for side in [-1.0, 1.0] {
        let a = angle + side * 1.6;
        let position = Position::new(base.x + 7.5 * a.cos(), base.y + 7.5 * a.sin());
        world
            .vespene_geysers
            .push(ResourceNode::new(tags.next(), ResourceKind::Vespene, position));
    }
}

/// Builds the starting world for both players.
pub(super) fn initial_world(config: &SandboxConfig, rng: &mut StdRng, tags: &mut Tags) -> WorldState {
    let (w, h) = (config.map_width, config.map_height);
    let sites = expansion_sites(w, h);
    let start = sites[0];
    let enemy_start = sites[sites.len() - 1];
    let center = Position::new(w / 2.0, h / 2.0);

    let mut world = WorldState {
        start_location: start,
        map_center: center,
        enemy_start_locations: vec![enemy_start],
        expansion_locations: sites.clone(),
        minerals: config.starting_minerals,
        ..WorldState::default()
    };
    for site in &sites {
        resources_around(*site, center, tags, &mut world);
    }

    world
        .own_structures
        .push(Unit::new(tags.next(), UnitKind::Nexus, start));
    for _ in 0..config.starting_workers {
        let jitter = Position::new(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
        let position = Position::new(start.x + jitter.x, start.y + jitter.y);
        world
            .own_units
            .push(Unit::new(tags.next(), UnitKind::Probe, position));
    }

    world
        .enemy_structures
        .push(Unit::new(tags.next(), UnitKind::CommandCenter, enemy_start));
    for i in 0..config.enemy_barracks {
        let a = std::f64::consts::PI * (1.0 + i as f64 * 0.5);
        let position = Position::new(enemy_start.x + 5.0 * a.cos(), enemy_start.y + 5.0 * a.sin())
            .towards(&center, 2.0);
        world
            .enemy_structures
            .push(Unit::new(tags.next(), UnitKind::Barracks, position));
    }
    for _ in 0..config.enemy_units {
        let post = enemy_start.towards(&center, rng.gen_range(6.0..10.0));
        let position = Position::new(post.x + rng.gen_range(-2.0..2.0), post.y + rng.gen_range(-2.0..2.0));
        world
            .enemy_units
            .push(Unit::new(tags.next(), UnitKind::Marine, position));
    }

    world.supply_used = world
        .own_units
        .iter()
        .map(|u| u.kind.info().supply_cost)
        .sum();
    world.supply_cap = UnitKind::Nexus.info().supply_provided;
    world
}
