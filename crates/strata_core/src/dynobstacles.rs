//! Dynamic obstacle index.
//!
//! An in-memory spatial index of vehicles (by faction) and
//! building-occupied tiles, built from the entity store at the start of
//! the move-processing phases and kept current while vehicles move and
//! buildings appear.

use std::collections::BTreeSet;

use crate::buildings::building_tiles;
use crate::components::Faction;
use crate::config::RoConfig;
use crate::hex::HexCoord;
use crate::world::WorldState;

/// Index of dynamic obstacles on the map.
#[derive(Debug, Clone, Default)]
pub struct DynObstacles {
    red: BTreeSet<HexCoord>,
    green: BTreeSet<HexCoord>,
    blue: BTreeSet<HexCoord>,
    buildings: BTreeSet<HexCoord>,
}

impl DynObstacles {
    /// Build the index from the current world state.
    #[must_use]
    pub fn new(state: &WorldState, cfg: &RoConfig) -> Self {
        let mut dyn_obstacles = Self::default();

        for c in state.characters.values() {
            if let Some(pos) = c.pos {
                dyn_obstacles.add_vehicle(pos, c.faction);
            }
        }
        for b in state.buildings.values() {
            dyn_obstacles.add_building_tiles(building_tiles(b, cfg));
        }

        dyn_obstacles
    }

    fn faction_set(&mut self, f: Faction) -> &mut BTreeSet<HexCoord> {
        match f {
            Faction::Red => &mut self.red,
            Faction::Green => &mut self.green,
            Faction::Blue => &mut self.blue,
            Faction::Ancient => unreachable!("no ancient vehicles"),
        }
    }

    fn faction_set_ref(&self, f: Faction) -> &BTreeSet<HexCoord> {
        match f {
            Faction::Red => &self.red,
            Faction::Green => &self.green,
            Faction::Blue => &self.blue,
            Faction::Ancient => unreachable!("no ancient vehicles"),
        }
    }

    /// Whether a vehicle of the given faction sits on the tile.
    #[must_use]
    pub fn has_vehicle(&self, c: HexCoord, f: Faction) -> bool {
        self.faction_set_ref(f).contains(&c)
    }

    /// Whether any vehicle sits on the tile.
    #[must_use]
    pub fn any_vehicle(&self, c: HexCoord) -> bool {
        self.red.contains(&c) || self.green.contains(&c) || self.blue.contains(&c)
    }

    /// Whether a building covers the tile.
    #[must_use]
    pub fn is_building(&self, c: HexCoord) -> bool {
        self.buildings.contains(&c)
    }

    /// Whether the tile is entirely free of buildings and vehicles.
    #[must_use]
    pub fn is_free(&self, c: HexCoord) -> bool {
        !self.is_building(c) && !self.any_vehicle(c)
    }

    /// Register a vehicle of the given faction on a tile.
    ///
    /// Multiple vehicles (even of the same faction) may share a tile;
    /// the index only tracks occupancy.
    pub fn add_vehicle(&mut self, c: HexCoord, f: Faction) {
        self.faction_set(f).insert(c);
    }

    /// Remove a vehicle of the given faction from a tile.
    ///
    /// # Panics
    ///
    /// Panics if no such vehicle was registered; callers always pair this
    /// with a previous [`Self::add_vehicle`].
    pub fn remove_vehicle(&mut self, c: HexCoord, f: Faction) {
        let removed = self.faction_set(f).remove(&c);
        assert!(removed, "no {f:?} vehicle at {c} to remove");
    }

    /// Register the tiles of a new building.
    pub fn add_building_tiles(&mut self, tiles: impl IntoIterator<Item = HexCoord>) {
        self.buildings.extend(tiles);
    }
}
