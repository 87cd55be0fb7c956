//! World-state snapshots handed out by the engine each decision tick.

use std::collections::BTreeMap;

use qtty::{Quantity, Second};

use super::types::{Position, Tag, UnitKind};

/// A unit or structure as seen in a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    pub tag: Tag,
    pub kind: UnitKind,
    pub position: Position,
    pub health: f64,
    pub health_max: f64,
    /// Construction or training finished.
    pub ready: bool,
    /// No orders queued.
    pub idle: bool,
    /// Currently executing an attack order.
    pub attacking: bool,
    /// Attack target is within weapon range.
    pub target_in_range: bool,
}

impl Unit {
    /// Creates a ready, idle unit at full health.
    pub fn new(tag: Tag, kind: UnitKind, position: Position) -> Self {
        let health_max = kind.info().health_max;
        Self {
            tag,
            kind,
            position,
            health: health_max,
            health_max,
            ready: true,
            idle: true,
            attacking: false,
            target_in_range: false,
        }
    }

    /// Fraction `health / health_max`, or `epsilon` when `health_max` is zero.
    pub fn health_fraction(&self, epsilon: f64) -> f64 {
        if self.health_max > 0.0 {
            self.health / self.health_max
        } else {
            epsilon
        }
    }
}

/// Kind of harvestable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceKind {
    Minerals,
    Vespene,
}

impl ResourceKind {
    /// Contents of a fresh node.
    pub fn full_contents(&self) -> u32 {
        match self {
            ResourceKind::Minerals => 1800,
            ResourceKind::Vespene => 2250,
        }
    }
}

/// A mineral field or vespene geyser.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceNode {
    pub tag: Tag,
    pub kind: ResourceKind,
    pub position: Position,
    pub contents: u32,
    pub visible: bool,
}

impl ResourceNode {
    pub fn new(tag: Tag, kind: ResourceKind, position: Position) -> Self {
        Self {
            tag,
            kind,
            position,
            contents: kind.full_contents(),
            visible: false,
        }
    }

    /// Remaining contents as a fraction of a fresh node.
    pub fn contents_fraction(&self) -> f64 {
        self.contents as f64 / self.kind.full_contents() as f64
    }
}

/// Anything with a map position, so range queries work over every entity list.
pub trait Located {
    fn position(&self) -> Position;
}

impl Located for Unit {
    fn position(&self) -> Position {
        self.position
    }
}

impl Located for ResourceNode {
    fn position(&self) -> Position {
        self.position
    }
}

impl Located for Position {
    fn position(&self) -> Position {
        *self
    }
}

impl<T: Located> Located for &T {
    fn position(&self) -> Position {
        (*self).position()
    }
}

/// Returns the items strictly closer than `range` to `point`.
pub fn closer_than<'a, T: Located>(items: &'a [T], range: f64, point: &Position) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| item.position().distance_to(point) < range)
        .collect()
}

/// Returns the item closest to `point`, if any.
pub fn closest_to<'a, T: Located>(items: &'a [T], point: &Position) -> Option<&'a T> {
    items.iter().min_by(|a, b| {
        a.position()
            .distance_to(point)
            .total_cmp(&b.position().distance_to(point))
    })
}

/// Full snapshot of the world as visible to the controlled player.
///
/// Snapshots are owned copies: effectors, the encoder and the evaluator all
/// read from one without holding a borrow on the engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldState {
    pub game_time: Quantity<Second>,
    pub own_units: Vec<Unit>,
    pub own_structures: Vec<Unit>,
    pub enemy_units: Vec<Unit>,
    pub enemy_structures: Vec<Unit>,
    pub mineral_fields: Vec<ResourceNode>,
    pub vespene_geysers: Vec<ResourceNode>,
    pub enemy_start_locations: Vec<Position>,
    pub start_location: Position,
    pub map_center: Position,
    pub expansion_locations: Vec<Position>,
    pub minerals: u32,
    pub vespene: u32,
    pub supply_used: u32,
    pub supply_cap: u32,
    /// Orders queued or under construction, by kind.
    pub pending: BTreeMap<UnitKind, u32>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            game_time: Quantity::new(0.0),
            own_units: Vec::new(),
            own_structures: Vec::new(),
            enemy_units: Vec::new(),
            enemy_structures: Vec::new(),
            mineral_fields: Vec::new(),
            vespene_geysers: Vec::new(),
            enemy_start_locations: Vec::new(),
            start_location: Position::new(0.0, 0.0),
            map_center: Position::new(0.0, 0.0),
            expansion_locations: Vec::new(),
            minerals: 0,
            vespene: 0,
            supply_used: 0,
            supply_cap: 0,
            pending: BTreeMap::new(),
        }
    }
}

impl WorldState {
    pub fn supply_left(&self) -> u32 {
        self.supply_cap.saturating_sub(self.supply_used)
    }

    /// True if current resources cover the cost of one `kind`.
    ///
    /// Supply is not part of affordability; callers check [`supply_left`](Self::supply_left).
    pub fn can_afford(&self, kind: UnitKind) -> bool {
        let info = kind.info();
        self.minerals >= info.minerals && self.vespene >= info.vespene
    }

    /// Number of `kind` queued or under construction.
    pub fn already_pending(&self, kind: UnitKind) -> u32 {
        self.pending.get(&kind).copied().unwrap_or(0)
    }

    /// Own units of the given kind.
    pub fn units_of(&self, kind: UnitKind) -> impl Iterator<Item = &Unit> {
        self.own_units.iter().filter(move |u| u.kind == kind)
    }

    /// Own structures of the given kind, finished or not.
    pub fn structures_of(&self, kind: UnitKind) -> impl Iterator<Item = &Unit> {
        self.own_structures.iter().filter(move |u| u.kind == kind)
    }

    /// Own finished structures of the given kind.
    pub fn ready_structures_of(&self, kind: UnitKind) -> impl Iterator<Item = &Unit> {
        self.structures_of(kind).filter(|u| u.ready)
    }

    /// Count of own units and structures of `kind`.
    pub fn count(&self, kind: UnitKind) -> usize {
        if kind.is_structure() {
            self.structures_of(kind).count()
        } else {
            self.units_of(kind).count()
        }
    }

    /// Closest free expansion location to the start location.
    ///
    /// A location is taken if any own nexus stands within 6 map units of it.
    pub fn next_expansion(&self) -> Option<Position> {
        let free: Vec<Position> = self
            .expansion_locations
            .iter()
            .copied()
            .filter(|loc| {
                !self
                    .structures_of(UnitKind::Nexus)
                    .any(|n| n.position.distance_to(loc) < 6.0)
            })
            .collect();
        closest_to(&free, &self.start_location).copied()
    }
}
