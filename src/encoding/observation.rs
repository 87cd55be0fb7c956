//! Observation encoding.
//!
//! Turns a [`WorldState`] into a fixed-shape `u8` array, either a top-down
//! raster or a short vector of clamped counts.

use ndarray::{Array1, Array3};

use crate::config::{feature, EnvConfig, ObservationMode, FEATURE_DIM};
use crate::world::{ResourceNode, Unit, UnitKind, WorldState};

/// RGB base colour of an entity class.
type Color = [u8; 3];

const OWN_COMBAT_UNIT: Color = [255, 75, 75];
const OWN_OTHER_UNIT: Color = [175, 255, 0];
const MINERAL_VISIBLE: Color = [175, 255, 255];
const MINERAL_HIDDEN: Color = [20, 75, 50];
const ENEMY_START: Color = [0, 0, 255];
const ENEMY_UNIT: Color = [100, 0, 255];
const ENEMY_STRUCTURE: Color = [0, 100, 255];
const OWN_NEXUS: Color = [255, 255, 175];
const OWN_OTHER_STRUCTURE: Color = [0, 255, 175];
const GEYSER_VISIBLE: Color = [255, 175, 255];
const GEYSER_HIDDEN: Color = [50, 20, 75];

/// A fixed-shape observation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Observation {
    /// `height × width × 3` image.
    Raster(Array3<u8>),
    /// One entry per field in [`feature`] order.
    Features(Array1<u8>),
}

impl Observation {
    pub fn shape(&self) -> &[usize] {
        match self {
            Observation::Raster(a) => a.shape(),
            Observation::Features(a) => a.shape(),
        }
    }

    /// Iterates every cell in logical order.
    pub fn values(&self) -> Box<dyn Iterator<Item = u8> + '_> {
        match self {
            Observation::Raster(a) => Box::new(a.iter().copied()),
            Observation::Features(a) => Box::new(a.iter().copied()),
        }
    }

    /// True if every cell is zero.
    pub fn is_blank(&self) -> bool {
        self.values().all(|v| v == 0)
    }

    pub fn as_raster(&self) -> Option<&Array3<u8>> {
        match self {
            Observation::Raster(a) => Some(a),
            Observation::Features(_) => None,
        }
    }

    pub fn as_features(&self) -> Option<&Array1<u8>> {
        match self {
            Observation::Features(a) => Some(a),
            Observation::Raster(_) => None,
        }
    }

    /// Clamps every cell into `[0, high]` of `space`, in place.
    pub fn clamp_to(&mut self, space: &ObservationSpace) {
        match self {
            Observation::Raster(a) => a.mapv_inplace(|v| v.min(space.high_at(0))),
            Observation::Features(a) => {
                for (i, v) in a.iter_mut().enumerate() {
                    *v = (*v).min(space.high_at(i));
                }
            }
        }
    }
}

/// Declared shape and per-cell bounds of observations.
///
/// The lower bound is always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSpace {
    pub shape: Vec<usize>,
    /// Upper bound per feature field, or a single bound for every raster cell.
    pub high: Vec<u8>,
}

impl ObservationSpace {
    pub fn from_mode(mode: &ObservationMode) -> Self {
        let high = match mode {
            ObservationMode::Raster { .. } => vec![u8::MAX],
            ObservationMode::Features { maxima } => maxima.to_vec(),
        };
        Self {
            shape: mode.shape(),
            high,
        }
    }

    fn high_at(&self, index: usize) -> u8 {
        if self.high.len() == 1 {
            self.high[0]
        } else {
            self.high.get(index).copied().unwrap_or(u8::MAX)
        }
    }

    /// True if `obs` has the declared shape and every cell is within bounds.
    pub fn contains(&self, obs: &Observation) -> bool {
        if obs.shape() != self.shape.as_slice() {
            return false;
        }
        match obs {
            Observation::Raster(a) => a.iter().all(|&v| v <= self.high_at(0)),
            Observation::Features(a) => a.iter().enumerate().all(|(i, &v)| v <= self.high_at(i)),
        }
    }
}

/// Encodes world snapshots according to the configured [`ObservationMode`].
#[derive(Debug, Clone)]
pub struct ObservationEncoder {
    mode: ObservationMode,
    health_epsilon: f64,
}

impl ObservationEncoder {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            mode: config.observation.clone(),
            health_epsilon: config.health_epsilon,
        }
    }

    pub fn space(&self) -> ObservationSpace {
        ObservationSpace::from_mode(&self.mode)
    }

    /// All-zero observation of the configured shape.
    pub fn blank(&self) -> Observation {
        match &self.mode {
            ObservationMode::Raster { height, width } => Observation::Raster(Array3::zeros((
                *height,
                *width,
                ObservationMode::RASTER_CHANNELS,
            ))),
            ObservationMode::Features { .. } => Observation::Features(Array1::zeros(FEATURE_DIM)),
        }
    }

    pub fn encode(&self, world: &WorldState) -> Observation {
        match &self.mode {
            ObservationMode::Raster { height, width } => {
                Observation::Raster(self.rasterize(world, *height, *width))
            }
            ObservationMode::Features { maxima } => {
                Observation::Features(Self::features(world, maxima))
            }
        }
    }

    fn features(world: &WorldState, maxima: &[u8; FEATURE_DIM]) -> Array1<u8> {
        let combat: Vec<&Unit> = world.own_units.iter().filter(|u| u.kind.is_combat()).collect();
        let mut raw = [0u64; FEATURE_DIM];
        raw[feature::WORKERS] = world.own_units.iter().filter(|u| u.kind.is_worker()).count() as u64;
        raw[feature::COMBAT_UNITS] = combat.len() as u64;
        raw[feature::ATTACKING_UNITS] = combat.iter().filter(|u| u.attacking).count() as u64;
        raw[feature::NEXUSES] = world.count(UnitKind::Nexus) as u64;
        raw[feature::ASSIMILATORS] = world.count(UnitKind::Assimilator) as u64;
        raw[feature::STARGATES] = world.count(UnitKind::Stargate) as u64;
        raw[feature::PYLONS] = world.count(UnitKind::Pylon) as u64;
        raw[feature::SUPPLY_LEFT] = world.supply_left() as u64;
        raw[feature::GAME_MINUTES] = (world.game_time.value().max(0.0) / 60.0) as u64;

        Array1::from_iter(
            raw.iter()
                .zip(maxima.iter())
                .map(|(&value, &max)| value.min(max as u64) as u8),
        )
    }

    fn rasterize(&self, world: &WorldState, height: usize, width: usize) -> Array3<u8> {
        let mut canvas = Canvas {
            pixels: Array3::zeros((height, width, ObservationMode::RASTER_CHANNELS)),
        };
        let eps = self.health_epsilon;

        for unit in &world.own_units {
            let color = if unit.kind.is_combat() {
                OWN_COMBAT_UNIT
            } else {
                OWN_OTHER_UNIT
            };
            canvas.plot_unit(unit, color, eps);
        }
        for mineral in &world.mineral_fields {
            let color = if mineral.visible {
                MINERAL_VISIBLE
            } else {
                MINERAL_HIDDEN
            };
            canvas.plot(mineral.position.cell(), color, 1.0);
        }
        for start in &world.enemy_start_locations {
            canvas.plot(start.cell(), ENEMY_START, 1.0);
        }
        for unit in &world.enemy_units {
            canvas.plot_unit(unit, ENEMY_UNIT, eps);
        }
        for structure in &world.enemy_structures {
            canvas.plot_unit(structure, ENEMY_STRUCTURE, eps);
        }
        for structure in &world.own_structures {
            let color = if structure.kind == UnitKind::Nexus {
                OWN_NEXUS
            } else {
                OWN_OTHER_STRUCTURE
            };
            canvas.plot_unit(structure, color, eps);
        }
        for geyser in &world.vespene_geysers {
            canvas.plot_geyser(geyser);
        }

        canvas.pixels
    }
}

struct Canvas {
    pixels: Array3<u8>,
}

impl Canvas {
    /// Overwrites one pixel with `color` scaled by `intensity`; off-canvas cells are skipped.
    fn plot(&mut self, cell: Option<(usize, usize)>, color: Color, intensity: f64) {
        let Some((row, col)) = cell else {
            return;
        };
        let (height, width, _) = self.pixels.dim();
        if row >= height || col >= width {
            return;
        }
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        for (channel, &base) in color.iter().enumerate() {
            self.pixels[[row, col, channel]] = (intensity * base as f64) as u8;
        }
    }

    fn plot_unit(&mut self, unit: &Unit, color: Color, epsilon: f64) {
        self.plot(unit.position.cell(), color, unit.health_fraction(epsilon));
    }

    fn plot_geyser(&mut self, geyser: &ResourceNode) {
        if geyser.visible {
            self.plot(
                geyser.position.cell(),
                GEYSER_VISIBLE,
                geyser.contents_fraction(),
            );
        } else {
            self.plot(geyser.position.cell(), GEYSER_HIDDEN, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Position, ResourceKind};
    use qtty::Quantity;

    fn raster_encoder(height: usize, width: usize) -> ObservationEncoder {
        ObservationEncoder::new(&EnvConfig {
            observation: ObservationMode::Raster { height, width },
            ..EnvConfig::default()
        })
    }

    fn pixel(obs: &Observation, row: usize, col: usize) -> [u8; 3] {
        let a = obs.as_raster().unwrap();
        [a[[row, col, 0]], a[[row, col, 1]], a[[row, col, 2]]]
    }

    #[test]
    fn empty_world_is_blank_raster() {
        let enc = ObservationEncoder::new(&EnvConfig::default());
        let obs = enc.encode(&WorldState::default());
        assert_eq!(obs.shape(), &[224, 224, 3]);
        assert!(obs.is_blank());
        assert_eq!(obs, enc.blank());
    }

    #[test]
    fn unit_drawn_at_ceiling_cell_scaled_by_health() {
        let enc = raster_encoder(16, 16);
        let mut world = WorldState::default();
        let mut ray = Unit::new(1, UnitKind::VoidRay, Position::new(2.3, 4.0));
        ray.health = ray.health_max / 2.0;
        world.own_units.push(ray);

        let obs = enc.encode(&world);
        assert_eq!(pixel(&obs, 4, 3), [127, 37, 37]);
    }

    #[test]
    fn zero_max_health_uses_epsilon() {
        let enc = raster_encoder(8, 8);
        let mut world = WorldState::default();
        let mut unit = Unit::new(1, UnitKind::Marine, Position::new(1.0, 1.0));
        unit.health_max = 0.0;
        world.enemy_units.push(unit);
        let obs = enc.encode(&world);
        // 1e-4 of any channel truncates to zero.
        assert_eq!(pixel(&obs, 1, 1), [0, 0, 0]);
    }

    #[test]
    fn later_classes_overwrite_earlier_ones() {
        let enc = raster_encoder(8, 8);
        let at = Position::new(3.0, 3.0);
        let mut world = WorldState::default();
        world.own_units.push(Unit::new(1, UnitKind::Probe, at));
        world.enemy_units.push(Unit::new(2, UnitKind::Marine, at));
        world.enemy_start_locations.push(at);
        assert_eq!(pixel(&enc.encode(&world), 3, 3), ENEMY_UNIT);

        world.own_structures.push(Unit::new(3, UnitKind::Nexus, at));
        assert_eq!(pixel(&enc.encode(&world), 3, 3), OWN_NEXUS);

        let mut geyser = ResourceNode::new(4, ResourceKind::Vespene, at);
        geyser.visible = false;
        world.vespene_geysers.push(geyser);
        assert_eq!(pixel(&enc.encode(&world), 3, 3), GEYSER_HIDDEN);
    }

    #[test]
    fn mineral_visibility_selects_colour() {
        let enc = raster_encoder(8, 8);
        let mut world = WorldState::default();
        let mut seen = ResourceNode::new(1, ResourceKind::Minerals, Position::new(1.0, 1.0));
        seen.visible = true;
        seen.contents = 10;
        world.mineral_fields.push(seen);
        world
            .mineral_fields
            .push(ResourceNode::new(2, ResourceKind::Minerals, Position::new(2.0, 2.0)));
        let obs = enc.encode(&world);
        assert_eq!(pixel(&obs, 1, 1), MINERAL_VISIBLE);
        assert_eq!(pixel(&obs, 2, 2), MINERAL_HIDDEN);
    }

    #[test]
    fn off_canvas_entities_are_skipped() {
        let enc = raster_encoder(4, 4);
        let mut world = WorldState::default();
        world
            .enemy_structures
            .push(Unit::new(1, UnitKind::Barracks, Position::new(3.5, 1.0)));
        world
            .enemy_structures
            .push(Unit::new(2, UnitKind::Barracks, Position::new(-3.0, 1.0)));
        assert!(enc.encode(&world).is_blank());
    }

    #[test]
    fn overhealed_and_overlapping_units_stay_in_range() {
        let enc = raster_encoder(8, 8);
        let space = enc.space();
        let mut world = WorldState::default();
        for tag in 0..50 {
            let mut u = Unit::new(tag, UnitKind::VoidRay, Position::new(2.0, 2.0));
            u.health = u.health_max * 3.0;
            world.own_units.push(u);
        }
        let obs = enc.encode(&world);
        assert!(space.contains(&obs));
        assert_eq!(pixel(&obs, 2, 2), OWN_COMBAT_UNIT);
    }

    #[test]
    fn features_are_clamped_to_maxima() {
        let enc = ObservationEncoder::new(&EnvConfig {
            observation: ObservationMode::default_features(),
            ..EnvConfig::default()
        });
        let mut world = WorldState {
            supply_cap: 200,
            supply_used: 0,
            game_time: Quantity::new(45.0 * 60.0),
            ..WorldState::default()
        };
        for tag in 0..150 {
            world
                .own_units
                .push(Unit::new(tag, UnitKind::Probe, Position::new(1.0, 1.0)));
        }
        let mut ray = Unit::new(999, UnitKind::VoidRay, Position::new(1.0, 1.0));
        ray.attacking = true;
        world.own_units.push(ray);
        world
            .own_structures
            .push(Unit::new(1000, UnitKind::Nexus, Position::new(1.0, 1.0)));

        let obs = enc.encode(&world);
        let f = obs.as_features().unwrap();
        assert_eq!(f[feature::WORKERS], 100);
        assert_eq!(f[feature::COMBAT_UNITS], 1);
        assert_eq!(f[feature::ATTACKING_UNITS], 1);
        assert_eq!(f[feature::NEXUSES], 1);
        assert_eq!(f[feature::SUPPLY_LEFT], 199);
        assert_eq!(f[feature::GAME_MINUTES], 30);
        assert!(enc.space().contains(&obs));
    }

    #[test]
    fn empty_world_features_are_zero() {
        let enc = ObservationEncoder::new(&EnvConfig {
            observation: ObservationMode::default_features(),
            ..EnvConfig::default()
        });
        let obs = enc.encode(&WorldState::default());
        assert_eq!(obs.shape(), &[FEATURE_DIM]);
        assert!(obs.is_blank());
    }

    #[test]
    fn clamp_to_space_lowers_out_of_range_features() {
        let space = ObservationSpace::from_mode(&ObservationMode::Features {
            maxima: [1; FEATURE_DIM],
        });
        let mut obs = Observation::Features(Array1::from_elem(FEATURE_DIM, 9));
        assert!(!space.contains(&obs));
        obs.clamp_to(&space);
        assert!(space.contains(&obs));
    }
}
