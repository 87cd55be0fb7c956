//! The sandbox [`GameEngine`] implementation.

use std::collections::{BTreeMap, HashMap};

use qtty::{Quantity, Second};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::world::{
    Command, CommandError, CommandSink, EngineError, EngineStatus, GameEngine, Outcome, Position,
    ResourceNode, Tag, Target, TechTree, Unit, UnitKind, WorldState,
};

use super::combat::{self, Bounds, Order};
use super::map::{self, Tags};
use super::SandboxConfig;

/// Each harvesting worker needs its own slot; a mineral field offers two.
const WORKERS_PER_FIELD: usize = 2;
/// Mineral fields farther than this from a nexus are not mined by it.
const MINING_RANGE: f64 = 10.0;
/// Own entities reveal resource nodes within this range.
const VISION: f64 = 12.0;
/// Structures other than nexus, pylon and assimilator need a pylon this close.
const PYLON_POWER: f64 = 6.5;
/// Two structures may not stand closer than this.
const FOOTPRINT: f64 = 2.5;
/// Supply never exceeds this.
const SUPPLY_LIMIT: u32 = 200;

/// An order in production: a unit in training or a structure being built.
#[derive(Debug, Clone)]
struct Production {
    kind: UnitKind,
    remaining: f64,
    /// Structure under construction, or the structure training the unit.
    site: Tag,
}

/// A small deterministic-per-seed RTS simulation.
pub struct SandboxEngine {
    config: SandboxConfig,
    world: WorldState,
    tech: TechTree,
    rng: StdRng,
    tags: Tags,
    production: Vec<Production>,
    orders: HashMap<Tag, Order>,
    posts: HashMap<Tag, Position>,
    /// Fractional income not yet banked.
    mineral_acc: f64,
    vespene_acc: f64,
    next_reinforcement: Option<f64>,
    next_wave: Option<f64>,
    /// Game second the current attack wave was launched.
    wave_started: Option<f64>,
    left: bool,
    outcome: Option<Outcome>,
}

impl SandboxEngine {
    /// Validates `config` and lays out the map.
    pub fn new(config: SandboxConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut tags = Tags::new();
        let world = map::initial_world(&config, &mut rng, &mut tags);
        let posts = world
            .enemy_units
            .iter()
            .map(|u| (u.tag, u.position))
            .collect();
        Ok(Self {
            next_reinforcement: config.reinforce_interval,
            next_wave: config.wave_interval,
            config,
            world,
            tech: TechTree::protoss(),
            rng,
            tags,
            production: Vec::new(),
            orders: HashMap::new(),
            posts,
            mineral_acc: 0.0,
            vespene_acc: 0.0,
            wave_started: None,
            left: false,
            outcome: None,
        })
    }

    fn now(&self) -> f64 {
        self.world.game_time.value()
    }

    fn bounds(&self) -> Bounds {
        Bounds {
            width: self.config.map_width,
            height: self.config.map_height,
        }
    }

    fn own_structure(&self, tag: Tag) -> Option<&Unit> {
        self.world.own_structures.iter().find(|s| s.tag == tag)
    }

    fn check_cost(&self, kind: UnitKind) -> Result<(), CommandError> {
        if let Some(missing) = self.tech.missing_prerequisite(kind, &self.world) {
            return Err(CommandError::MissingPrerequisite { kind, missing });
        }
        if !self.world.can_afford(kind) {
            return Err(CommandError::Unaffordable(kind));
        }
        if self.world.supply_left() < kind.info().supply_cost {
            return Err(CommandError::SupplyBlocked(kind));
        }
        Ok(())
    }

    fn spend(&mut self, kind: UnitKind) {
        let info = kind.info();
        self.world.minerals -= info.minerals;
        self.world.vespene -= info.vespene;
        self.world.supply_used += info.supply_cost;
    }

    fn train(&mut self, producer: Tag, kind: UnitKind) -> Result<(), CommandError> {
        let site = self
            .own_structure(producer)
            .ok_or(CommandError::UnknownTag(producer))?;
        let expected = match kind {
            UnitKind::Probe => UnitKind::Nexus,
            UnitKind::VoidRay => UnitKind::Stargate,
            _ => {
                return Err(CommandError::InvalidProducer {
                    producer: site.kind,
                    kind,
                })
            }
        };
        if site.kind != expected || !site.ready || !site.idle {
            return Err(CommandError::InvalidProducer {
                producer: site.kind,
                kind,
            });
        }
        self.check_cost(kind)?;
        self.spend(kind);
        if let Some(site) = self.world.own_structures.iter_mut().find(|s| s.tag == producer) {
            site.idle = false;
        }
        self.production.push(Production {
            kind,
            remaining: kind.info().build_time,
            site: producer,
        });
        Ok(())
    }

    fn placement_ok(&self, kind: UnitKind, at: &Position) -> bool {
        let (w, h) = (self.config.map_width, self.config.map_height);
        if at.x < 1.0 || at.y < 1.0 || at.x > w - 1.0 || at.y > h - 1.0 {
            return false;
        }
        let blocked = self
            .world
            .own_structures
            .iter()
            .chain(&self.world.enemy_structures)
            .any(|s| s.position.distance_to(at) < FOOTPRINT)
            || self
                .world
                .mineral_fields
                .iter()
                .chain(&self.world.vespene_geysers)
                .any(|r| r.position.distance_to(at) < FOOTPRINT);
        if blocked {
            return false;
        }
        match kind {
            UnitKind::Nexus | UnitKind::Pylon | UnitKind::Assimilator => true,
            _ => self
                .world
                .ready_structures_of(UnitKind::Pylon)
                .any(|p| p.position.distance_to(at) <= PYLON_POWER),
        }
    }

    /// First valid spot at `near` or on rings around it.
    fn find_placement(&self, kind: UnitKind, near: Position) -> Option<Position> {
        if self.placement_ok(kind, &near) {
            return Some(near);
        }
        (1..=3).find_map(|ring| {
            let radius = ring as f64 * 3.0;
            (0..8).find_map(|step| {
                let a = std::f64::consts::FRAC_PI_4 * step as f64;
                let at = Position::new(near.x + radius * a.cos(), near.y + radius * a.sin());
                self.placement_ok(kind, &at).then_some(at)
            })
        })
    }

    fn start_structure(&mut self, kind: UnitKind, at: Position) {
        let mut site = Unit::new(self.tags.next(), kind, at);
        site.ready = false;
        site.idle = false;
        site.health = site.health_max * 0.1;
        self.production.push(Production {
            kind,
            remaining: kind.info().build_time,
            site: site.tag,
        });
        self.world.own_structures.push(site);
    }

    fn build(&mut self, kind: UnitKind, near: Position) -> Result<(), CommandError> {
        if !kind.is_structure() || kind == UnitKind::Assimilator {
            return Err(CommandError::InvalidPlacement { kind, near });
        }
        if self.world.units_of(UnitKind::Probe).next().is_none() {
            return Err(CommandError::MissingPrerequisite {
                kind,
                missing: UnitKind::Probe,
            });
        }
        self.check_cost(kind)?;
        let at = self
            .find_placement(kind, near)
            .ok_or(CommandError::InvalidPlacement { kind, near })?;
        self.spend(kind);
        self.start_structure(kind, at);
        Ok(())
    }

    fn build_on(&mut self, kind: UnitKind, worker: Tag, target: Tag) -> Result<(), CommandError> {
        if !self.world.own_units.iter().any(|u| u.tag == worker && u.kind.is_worker()) {
            return Err(CommandError::UnknownTag(worker));
        }
        let geyser = self
            .world
            .vespene_geysers
            .iter()
            .find(|g| g.tag == target)
            .map(|g| g.position)
            .ok_or(CommandError::UnknownTag(target))?;
        let taken = self
            .world
            .structures_of(UnitKind::Assimilator)
            .any(|a| a.position.distance_to(&geyser) < 1.0);
        if kind != UnitKind::Assimilator || taken {
            return Err(CommandError::InvalidPlacement { kind, near: geyser });
        }
        self.check_cost(kind)?;
        self.spend(kind);
        self.start_structure(kind, geyser);
        Ok(())
    }

    fn order(&mut self, unit: Tag, order: Order) -> Result<(), CommandError> {
        let Some(own) = self.world.own_units.iter_mut().find(|u| u.tag == unit) else {
            return Err(CommandError::UnknownTag(unit));
        };
        if let Order::Attack(Target::Unit(target)) = order {
            let known = self
                .world
                .enemy_units
                .iter()
                .chain(&self.world.enemy_structures)
                .any(|e| e.tag == target);
            if !known {
                return Err(CommandError::UnknownTag(target));
            }
        }
        own.idle = false;
        self.orders.insert(unit, order);
        Ok(())
    }

    /// Banks harvesting income and depletes the mined nodes.
    fn harvest(&mut self, dt: f64) {
        let workers = self.world.units_of(UnitKind::Probe).count();
        let nexuses: Vec<Position> = self
            .world
            .ready_structures_of(UnitKind::Nexus)
            .map(|n| n.position)
            .collect();
        let fields: Vec<usize> = (0..self.world.mineral_fields.len())
            .filter(|&i| {
                let field = &self.world.mineral_fields[i];
                field.contents > 0
                    && nexuses
                        .iter()
                        .any(|n| n.distance_to(&field.position) < MINING_RANGE)
            })
            .collect();
        let harvesting = workers.min(fields.len() * WORKERS_PER_FIELD);
        self.mineral_acc += harvesting as f64 * self.config.mineral_rate * dt;
        let mined = take(&mut self.world.mineral_fields, &fields, self.mineral_acc.floor() as u32);
        self.mineral_acc -= f64::from(mined);
        self.world.minerals += mined;

        let geysers: Vec<usize> = (0..self.world.vespene_geysers.len())
            .filter(|&i| {
                let geyser = &self.world.vespene_geysers[i];
                geyser.contents > 0
                    && self
                        .world
                        .ready_structures_of(UnitKind::Assimilator)
                        .any(|a| a.position.distance_to(&geyser.position) < 1.0)
            })
            .collect();
        if workers > 0 {
            self.vespene_acc += geysers.len() as f64 * self.config.vespene_rate * dt;
        }
        let extracted = take(&mut self.world.vespene_geysers, &geysers, self.vespene_acc.floor() as u32);
        self.vespene_acc -= f64::from(extracted);
        self.world.vespene += extracted;
    }

    /// Advances production and completes finished orders.
    fn produce(&mut self, dt: f64) {
        let mut done = Vec::new();
        for (i, order) in self.production.iter_mut().enumerate() {
            order.remaining -= dt;
            let progress = 1.0 - (order.remaining / order.kind.info().build_time).max(0.0);
            if order.kind.is_structure() {
                if let Some(site) = self.world.own_structures.iter_mut().find(|s| s.tag == order.site) {
                    site.health = site.health.max(site.health_max * (0.1 + 0.9 * progress));
                }
            }
            if order.remaining <= 0.0 {
                done.push(i);
            }
        }
        for i in done.into_iter().rev() {
            let order = self.production.remove(i);
            let Some(site) = self.world.own_structures.iter_mut().find(|s| s.tag == order.site) else {
                continue;
            };
            if order.kind.is_structure() {
                site.ready = true;
                site.idle = true;
                debug!(kind = %order.kind, tag = site.tag, "structure finished");
            } else {
                site.idle = true;
                let at = site.position.towards(&self.world.map_center, 3.0);
                let tag = self.tags.next();
                self.world.own_units.push(Unit::new(tag, order.kind, at));
                debug!(kind = %order.kind, tag, "unit trained");
            }
        }
    }

    fn reinforce(&mut self) {
        let now = self.now();
        if let (Some(interval), Some(due)) = (self.config.reinforce_interval, self.next_reinforcement) {
            if now >= due {
                self.next_reinforcement = Some(due + interval);
                let barracks: Vec<Position> = self
                    .world
                    .enemy_structures
                    .iter()
                    .filter(|s| s.kind == UnitKind::Barracks)
                    .map(|s| s.position)
                    .collect();
                if let Some(at) = barracks.choose(&mut self.rng) {
                    if self.world.enemy_units.len() < self.config.max_enemy_units {
                        let tag = self.tags.next();
                        let post = at.towards(&self.world.map_center, 4.0);
                        self.world.enemy_units.push(Unit::new(tag, UnitKind::Marine, post));
                        self.posts.insert(tag, post);
                    }
                }
            }
        }
        if let (Some(interval), Some(due)) = (self.config.wave_interval, self.next_wave) {
            if now >= due {
                self.next_wave = Some(due + interval);
                self.wave_started = Some(now);
                debug!(marines = self.world.enemy_units.len(), "enemy attack wave");
            }
        }
        // A wave lasts one minute.
        if self.wave_started.is_some_and(|t| now - t > 60.0) {
            self.wave_started = None;
        }
    }

    fn fight(&mut self, dt: f64) {
        let bounds = self.bounds();
        let own_hits = combat::step_own_units(&mut self.world, &mut self.orders, dt, bounds);
        let wave = self.wave_started.map(|_| self.world.start_location);
        let enemy_hits = combat::step_enemy_units(&mut self.world, &self.posts, wave, dt, bounds);

        combat::apply_hits(&mut self.world.enemy_units, &mut self.world.enemy_structures, &own_hits);
        combat::apply_hits(&mut self.world.own_units, &mut self.world.own_structures, &enemy_hits);

        for tag in combat::remove_dead(&mut self.world.enemy_units) {
            self.posts.remove(&tag);
        }
        combat::remove_dead(&mut self.world.enemy_structures);
        for tag in combat::remove_dead(&mut self.world.own_units) {
            self.orders.remove(&tag);
        }
        let lost = combat::remove_dead(&mut self.world.own_structures);
        self.production.retain(|p| !lost.contains(&p.site));
    }

    fn reveal(&mut self) {
        let seen: Vec<Position> = self
            .world
            .own_units
            .iter()
            .chain(&self.world.own_structures)
            .map(|u| u.position)
            .collect();
        let visible = |node: &ResourceNode| seen.iter().any(|p| p.distance_to(&node.position) < VISION);
        for node in self
            .world
            .mineral_fields
            .iter_mut()
            .chain(self.world.vespene_geysers.iter_mut())
        {
            node.visible = visible(node);
        }
    }

    /// Recomputes supply and pending counts from units and production.
    fn account(&mut self) {
        let provided: u32 = self
            .world
            .own_structures
            .iter()
            .filter(|s| s.ready)
            .map(|s| s.kind.info().supply_provided)
            .sum();
        self.world.supply_cap = provided.min(SUPPLY_LIMIT);
        let training: u32 = self
            .production
            .iter()
            .filter(|p| !p.kind.is_structure())
            .map(|p| p.kind.info().supply_cost)
            .sum();
        let fielded: u32 = self
            .world
            .own_units
            .iter()
            .map(|u| u.kind.info().supply_cost)
            .sum();
        self.world.supply_used = fielded + training;

        let mut pending = BTreeMap::new();
        for p in &self.production {
            *pending.entry(p.kind).or_insert(0) += 1;
        }
        self.world.pending = pending;
    }

    fn judge(&self) -> Option<Outcome> {
        if self.world.enemy_structures.is_empty() {
            Some(Outcome::Victory)
        } else if self.world.own_structures.is_empty() {
            Some(Outcome::Defeat)
        } else {
            None
        }
    }
}

/// Removes up to `amount` from `nodes[indices]` in order; returns what was taken.
fn take(nodes: &mut [ResourceNode], indices: &[usize], amount: u32) -> u32 {
    let mut left = amount;
    for &i in indices {
        if left == 0 {
            break;
        }
        let node = &mut nodes[i];
        let taken = node.contents.min(left);
        node.contents -= taken;
        left -= taken;
    }
    amount - left
}

impl CommandSink for SandboxEngine {
    fn issue(&mut self, command: Command) -> Result<(), CommandError> {
        match command {
            Command::Train { producer, kind } => self.train(producer, kind),
            Command::Build { kind, near } => self.build(kind, near),
            Command::BuildOn {
                kind,
                worker,
                target,
            } => self.build_on(kind, worker, target),
            Command::Attack { unit, target } => self.order(unit, Order::Attack(target)),
            Command::Move { unit, to } => self.order(unit, Order::Move(to)),
            // Harvesting is pooled; there is nothing to rebalance.
            Command::DistributeWorkers => Ok(()),
        }
    }
}

impl GameEngine for SandboxEngine {
    fn advance(&mut self) -> Result<EngineStatus, EngineError> {
        if let Some(outcome) = self.outcome {
            return Ok(EngineStatus::Ended(outcome));
        }
        if self.left {
            self.outcome = Some(Outcome::Defeat);
            return Ok(EngineStatus::Ended(Outcome::Defeat));
        }

        let dt = 1.0 / self.config.loops_per_second;
        self.world.game_time = Quantity::new(self.now() + dt);
        self.harvest(dt);
        self.produce(dt);
        self.reinforce();
        self.fight(dt);
        self.reveal();
        self.account();

        match self.judge() {
            Some(outcome) => {
                debug!(?outcome, game_time = self.now(), "game over");
                self.outcome = Some(outcome);
                Ok(EngineStatus::Ended(outcome))
            }
            None => Ok(EngineStatus::Running),
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
