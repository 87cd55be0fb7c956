//! Core world types: entity kinds, their static game data, and positions.

use std::fmt;

/// Engine-assigned identifier of a unit, structure, or resource node.
pub type Tag = u64;

/// Kind of a game entity.
///
/// The first eight kinds belong to the controlled player; the remaining
/// three are the opponent kinds the sandbox engine fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    Probe,
    VoidRay,
    Nexus,
    Pylon,
    Assimilator,
    Gateway,
    CyberneticsCore,
    Stargate,
    Marine,
    Barracks,
    CommandCenter,
}

/// Static per-kind game data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindInfo {
    pub minerals: u32,
    pub vespene: u32,
    /// Supply consumed by one instance.
    pub supply_cost: u32,
    /// Supply capacity provided once ready.
    pub supply_provided: u32,
    /// Seconds of game time to train or construct.
    pub build_time: f64,
    pub health_max: f64,
}

impl UnitKind {
    /// Returns all kinds in declaration order.
    pub fn all() -> [UnitKind; 11] {
        use UnitKind::*;
        [
            Probe,
            VoidRay,
            Nexus,
            Pylon,
            Assimilator,
            Gateway,
            CyberneticsCore,
            Stargate,
            Marine,
            Barracks,
            CommandCenter,
        ]
    }

    pub fn info(&self) -> KindInfo {
        let (minerals, vespene, supply_cost, supply_provided, build_time, health_max) = match self
        {
            UnitKind::Probe => (50, 0, 1, 0, 12.0, 40.0),
            UnitKind::VoidRay => (250, 150, 4, 0, 37.0, 150.0),
            UnitKind::Nexus => (400, 0, 0, 15, 71.0, 1000.0),
            UnitKind::Pylon => (100, 0, 0, 8, 18.0, 200.0),
            UnitKind::Assimilator => (75, 0, 0, 0, 21.0, 300.0),
            UnitKind::Gateway => (150, 0, 0, 0, 46.0, 500.0),
            UnitKind::CyberneticsCore => (150, 0, 0, 0, 36.0, 550.0),
            UnitKind::Stargate => (150, 150, 0, 0, 43.0, 600.0),
            UnitKind::Marine => (50, 0, 1, 0, 18.0, 45.0),
            UnitKind::Barracks => (150, 0, 0, 0, 46.0, 1000.0),
            UnitKind::CommandCenter => (400, 0, 0, 15, 71.0, 1500.0),
        };
        KindInfo {
            minerals,
            vespene,
            supply_cost,
            supply_provided,
            build_time,
            health_max,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(
            self,
            UnitKind::Nexus
                | UnitKind::Pylon
                | UnitKind::Assimilator
                | UnitKind::Gateway
                | UnitKind::CyberneticsCore
                | UnitKind::Stargate
                | UnitKind::Barracks
                | UnitKind::CommandCenter
        )
    }

    /// Combat units are the ones the reward function scores.
    pub fn is_combat(&self) -> bool {
        matches!(self, UnitKind::VoidRay | UnitKind::Marine)
    }

    pub fn is_worker(&self) -> bool {
        matches!(self, UnitKind::Probe)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Probe => "probe",
            UnitKind::VoidRay => "void_ray",
            UnitKind::Nexus => "nexus",
            UnitKind::Pylon => "pylon",
            UnitKind::Assimilator => "assimilator",
            UnitKind::Gateway => "gateway",
            UnitKind::CyberneticsCore => "cybernetics_core",
            UnitKind::Stargate => "stargate",
            UnitKind::Marine => "marine",
            UnitKind::Barracks => "barracks",
            UnitKind::CommandCenter => "command_center",
        };
        f.write_str(name)
    }
}

/// How a game ended, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
    Victory,
    Defeat,
    Tie,
}

/// A 2D map position in map units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Returns the unit direction vector from `self` toward `target`.
    ///
    /// Returns `(0, 0)` if positions are coincident.
    pub fn direction_to(&self, target: &Position) -> (f64, f64) {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist < 1e-12 {
            (0.0, 0.0)
        } else {
            (dx / dist, dy / dist)
        }
    }

    /// Returns the point `distance` units from `self` along the segment to `target`.
    ///
    /// Unlike [`move_toward`](Self::move_toward) this may overshoot `target`.
    pub fn towards(&self, target: &Position, distance: f64) -> Position {
        let (dx, dy) = self.direction_to(target);
        Position::new(self.x + dx * distance, self.y + dy * distance)
    }

    /// Moves toward `target` by at most `max_dist`, clamped to map bounds.
    pub fn move_toward(&mut self, target: &Position, max_dist: f64, width: f64, height: f64) {
        let (dx, dy) = self.direction_to(target);
        let step = self.distance_to(target).min(max_dist);
        self.x = (self.x + dx * step).clamp(0.0, width);
        self.y = (self.y + dy * step).clamp(0.0, height);
    }

    /// Grid cell `(row, col)` this position rasterizes into: `(ceil(y), ceil(x))`.
    ///
    /// Returns `None` when either coordinate is negative or not finite.
    pub fn cell(&self) -> Option<(usize, usize)> {
        let row = self.y.ceil();
        let col = self.x.ceil();
        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return None;
        }
        Some((row as usize, col as usize))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structures_and_combat_are_disjoint() {
        for kind in UnitKind::all() {
            assert!(!(kind.is_structure() && kind.is_combat()), "{kind}");
        }
    }

    #[test]
    fn supply_providers() {
        assert_eq!(UnitKind::Nexus.info().supply_provided, 15);
        assert_eq!(UnitKind::Pylon.info().supply_provided, 8);
        assert_eq!(UnitKind::Gateway.info().supply_provided, 0);
    }

    #[test]
    fn position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn towards_overshoots() {
        let a = Position::new(0.0, 0.0);
        let p = a.towards(&Position::new(2.0, 0.0), 5.0);
        assert!((p.x - 5.0).abs() < 1e-10);
        assert!(p.y.abs() < 1e-10);
    }

    #[test]
    fn move_toward_clamps() {
        let mut p = Position::new(9.0, 0.0);
        p.move_toward(&Position::new(20.0, 0.0), 5.0, 10.0, 10.0);
        assert_eq!(p.x, 10.0);
    }

    #[test]
    fn cell_uses_ceiling() {
        assert_eq!(Position::new(3.2, 7.0).cell(), Some((7, 4)));
        assert_eq!(Position::new(0.0, 0.0).cell(), Some((0, 0)));
        assert_eq!(Position::new(-0.5, 1.0).cell(), Some((1, 0)));
        assert_eq!(Position::new(-1.5, 1.0).cell(), None);
        assert_eq!(Position::new(f64::NAN, 1.0).cell(), None);
    }
}
