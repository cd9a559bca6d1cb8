//! Read-only base-map oracle.
//!
//! The base map answers all static questions about the world: which tiles
//! exist, which are passable, the travel cost between neighbouring tiles,
//! which region a tile belongs to, and the safe-zone layout.  It is pure
//! data constructed once per process and never mutated by the engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::Faction;
use crate::config::{Params, Zone};
use crate::hex::{CoordT, HexCoord};

/// Travel cost of one tile step, in movement points.
pub type DistanceT = u32;

/// Base cost of stepping onto a normal passable tile.
pub const BASE_EDGE_WEIGHT: DistanceT = 1_000;

/// Identifier of a map region.
pub type RegionId = u64;

/// Safe-zone layout of the map.
///
/// Neutral sanctuaries ban combat outright; starter zones additionally
/// belong to one faction, granting it fast transit while blocking all
/// others.  Starter zones are no-combat zones too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeZones {
    /// Neutral no-combat sanctuaries.
    pub neutral: Vec<Zone>,
    /// Per-faction starter zones.
    pub starters: Vec<(Faction, Zone)>,
}

impl SafeZones {
    /// Whether neither targeting nor damage may involve fighters at the
    /// given tile.
    #[must_use]
    pub fn is_no_combat(&self, c: HexCoord) -> bool {
        self.neutral.iter().any(|z| z.contains(c))
            || self.starters.iter().any(|(_, z)| z.contains(c))
    }

    /// The faction whose starter zone covers the tile, if any.
    #[must_use]
    pub fn starter_for(&self, c: HexCoord) -> Option<Faction> {
        self.starters
            .iter()
            .find(|(_, z)| z.contains(c))
            .map(|(f, _)| *f)
    }
}

/// The static base map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseMap {
    /// L1 radius of the hex disc that makes up the world.
    radius: CoordT,
    /// Statically impassable tiles.
    obstacles: BTreeSet<HexCoord>,
    /// Side length of the axial squares that form regions.
    region_size: CoordT,
    /// Safe-zone layout.
    safe_zones: SafeZones,
}

impl BaseMap {
    /// Create a map disc of the given radius with no obstacles and no
    /// safe zones.
    ///
    /// # Panics
    ///
    /// Panics if `radius` or `region_size` is not positive.
    #[must_use]
    pub fn new(radius: CoordT, region_size: CoordT) -> Self {
        assert!(radius > 0, "map radius must be positive");
        assert!(region_size > 0, "region size must be positive");
        Self {
            radius,
            obstacles: BTreeSet::new(),
            region_size,
            safe_zones: SafeZones::default(),
        }
    }

    /// Builder: mark tiles as statically impassable.
    #[must_use]
    pub fn with_obstacles(mut self, obstacles: impl IntoIterator<Item = HexCoord>) -> Self {
        self.obstacles.extend(obstacles);
        self
    }

    /// Builder: set the safe-zone layout.
    #[must_use]
    pub fn with_safe_zones(mut self, zones: SafeZones) -> Self {
        self.safe_zones = zones;
        self
    }

    /// Construct the production map layout from the configured parameters:
    /// one starter zone per faction around its spawn centre and a neutral
    /// sanctuary ring around the origin trade hub.
    #[must_use]
    pub fn for_params(params: &Params) -> Self {
        let starters = params
            .spawn_centres
            .iter()
            .map(|(f, centre)| {
                (
                    *f,
                    Zone { centre: *centre, radius: params.spawn_ring_radius + 2 },
                )
            })
            .collect();
        Self::new(6_000, 24).with_safe_zones(SafeZones {
            neutral: vec![Zone { centre: HexCoord::new(0, 3_000), radius: 20 }],
            starters,
        })
    }

    /// Safe-zone layout.
    #[must_use]
    pub fn safe_zones(&self) -> &SafeZones {
        &self.safe_zones
    }

    /// Whether the tile exists at all.
    #[must_use]
    pub fn is_on_map(&self, c: HexCoord) -> bool {
        HexCoord::distance_l1(HexCoord::ORIGIN, c) <= self.radius
    }

    /// Whether the tile can be moved onto or built on.
    #[must_use]
    pub fn is_passable(&self, c: HexCoord) -> bool {
        self.is_on_map(c) && !self.obstacles.contains(&c)
    }

    /// Travel cost between two neighbouring tiles, or `None` when the
    /// step is impossible.  This is the base cost before faction and
    /// dynamic-obstacle adjustments.
    #[must_use]
    pub fn edge_weight(&self, from: HexCoord, to: HexCoord) -> Option<DistanceT> {
        if HexCoord::distance_l1(from, to) != 1 {
            return None;
        }
        if !self.is_passable(from) || !self.is_passable(to) {
            return None;
        }
        Some(BASE_EDGE_WEIGHT)
    }

    /// The region a tile belongs to.
    ///
    /// Regions are axial squares of `region_size` tiles; the id packs the
    /// two square indices into a single stable value.
    #[must_use]
    pub fn region_id(&self, c: HexCoord) -> RegionId {
        let rx = c.x.div_euclid(self.region_size);
        let ry = c.y.div_euclid(self.region_size);
        // Offset into the positive range so the packing is a bijection.
        let rx = (i64::from(rx) + 0x8000_0000) as u64;
        let ry = (i64::from(ry) + 0x8000_0000) as u64;
        (rx << 32) | ry
    }
}
