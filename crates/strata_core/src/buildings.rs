//! Building shapes, stats and the building-entry phase.

use crate::components::{CombatData, Faction};
use crate::config::RoConfig;
use crate::context::Context;
use crate::dynobstacles::DynObstacles;
use crate::hex::{CoordT, HexCoord};
use crate::world::{Building, IdT, WorldState};

/// Ids reserved for rows created by the initial map seed.  Regular ids
/// start above this so tweaks to initialisation never shift them.
pub const RESERVED_SEED_IDS: IdT = 1_000;

/// Rotate a shape-relative coordinate by `times` sixths of a full turn
/// (clockwise) around the origin.
#[must_use]
pub fn rotate(c: HexCoord, times: u32) -> HexCoord {
    // Cube coordinates (q, r, s) with s = -q - r; one CW rotation maps
    // (q, r, s) to (-r, -s, -q).
    let mut q = c.x;
    let mut r = c.y;
    for _ in 0..(times % 6) {
        let s = -q - r;
        let (nq, nr) = (-r, -s);
        q = nq;
        r = nr;
    }
    HexCoord::new(q, r)
}

/// All tiles occupied by a building on the map.
///
/// # Panics
///
/// Panics if the building's type is not configured; a stored row with an
/// unknown type is an invariant violation.
#[must_use]
pub fn building_tiles(b: &Building, cfg: &RoConfig) -> Vec<HexCoord> {
    let data = cfg
        .building(&b.typ)
        .unwrap_or_else(|| panic!("unknown building type {}", b.typ));
    data.shape
        .iter()
        .map(|&t| {
            let rotated = rotate(t, b.rotation);
            HexCoord::new(b.centre.x + rotated.x, b.centre.y + rotated.y)
        })
        .collect()
}

/// Set a building's combat stats from its configuration.
///
/// Called when a building is seeded or when construction finishes.  HP
/// starts at the maximum.  Foundations keep their HP but have no attacks
/// until they are finished.
pub fn update_building_stats(b: &mut Building, cfg: &RoConfig) {
    let data = cfg
        .building(&b.typ)
        .unwrap_or_else(|| panic!("unknown building type {}", b.typ));

    b.max_hp = data.max_hp;
    b.regen_mhp = data.regen_mhp;
    b.hp.armour = data.max_hp.armour;
    b.hp.shield = data.max_hp.shield;
    b.hp.mhp = Default::default();
    b.combat = CombatData {
        attacks: if b.foundation { Vec::new() } else { data.attacks.clone() },
        target_size: Some(data.target_size),
        ..CombatData::default()
    };
}

/// Seed the initial map buildings: one ancient starter citadel per
/// playable faction at its spawn centre.
pub fn initialise_buildings(state: &mut WorldState, cfg: &RoConfig) {
    for f in Faction::PLAYABLE {
        let centre = cfg.params.spawn_centres[&f];
        let id = state.create_building("citadel", None, f, centre, 0);
        let b = state.buildings.get_mut(&id).expect("just created");
        update_building_stats(b, cfg);
    }
    state.reserve_ids_up_to(RESERVED_SEED_IDS);
}

/// Whether a building of the given type can be placed at the position.
///
/// All shape tiles must be on the map, passable, free of dynamic
/// obstacles other than the founding character itself, and outside all
/// safe zones.
#[must_use]
pub fn can_place_building(
    typ: &str,
    centre: HexCoord,
    rotation: u32,
    founder_pos: HexCoord,
    dyn_obstacles: &DynObstacles,
    ctx: &Context,
) -> bool {
    let Some(data) = ctx.config.building(typ) else {
        return false;
    };
    data.shape.iter().all(|&t| {
        let rotated = rotate(t, rotation);
        let tile = HexCoord::new(centre.x + rotated.x, centre.y + rotated.y);
        ctx.map.is_passable(tile)
            && !ctx.map.safe_zones().is_no_combat(tile)
            && (tile == founder_pos || dyn_obstacles.is_free(tile))
    })
}

/// Maximum L1 extent of a building's shape from its centre.
fn shape_extent(b: &Building, cfg: &RoConfig) -> CoordT {
    building_tiles(b, cfg)
        .iter()
        .map(|&t| HexCoord::distance_l1(b.centre, t))
        .max()
        .unwrap_or(0)
}

/// Find a free, passable tile next to the building where an exiting
/// character can be placed.  Scans rings of increasing radius around the
/// centre, lexicographically within each ring, so the spot is
/// deterministic.
#[must_use]
pub fn find_exit_spot(
    b: &Building,
    dyn_obstacles: &DynObstacles,
    ctx: &Context,
) -> Option<HexCoord> {
    let extent = shape_extent(b, ctx.config);
    for radius in (extent + 1)..=(extent + ctx.params().building_enter_radius + 3) {
        for tile in b.centre.l1_ball(radius) {
            if HexCoord::distance_l1(b.centre, tile) != radius {
                continue;
            }
            if ctx.map.is_passable(tile) && dyn_obstacles.is_free(tile) {
                return Some(tile);
            }
        }
    }
    None
}

/// The building-entry phase.
///
/// Runs after moves and movement (so a character can enter in the same
/// block its enter intent confirms) and before combat targeting (so a
/// character that entered is sheltered from this round's targeting).
pub fn process_enter_buildings(state: &mut WorldState, ctx: &Context) {
    let ids: Vec<IdT> = state
        .characters
        .values()
        .filter(|c| c.enter_building.is_some())
        .map(|c| c.id)
        .collect();

    for id in ids {
        let c = &state.characters[&id];
        let building_id = c.enter_building.expect("filtered on enter intent");
        let Some(pos) = c.pos else {
            // Already inside some building; stale intent.
            state.characters.get_mut(&id).unwrap().enter_building = None;
            continue;
        };

        let Some(b) = state.buildings.get(&building_id) else {
            tracing::debug!(character = id, building = building_id, "enter target gone");
            state.characters.get_mut(&id).unwrap().enter_building = None;
            continue;
        };
        if b.foundation
            || (b.faction != Faction::Ancient && b.faction != c.faction)
        {
            state.characters.get_mut(&id).unwrap().enter_building = None;
            continue;
        }

        let dist = HexCoord::distance_l1(pos, b.centre);
        if dist > shape_extent(b, ctx.config) + ctx.params().building_enter_radius {
            // Keep the intent; the character may still be on its way.
            continue;
        }

        let c = state.characters.get_mut(&id).unwrap();
        if c.is_busy() {
            continue;
        }
        c.pos = None;
        c.in_building = Some(building_id);
        c.enter_building = None;
        c.movement = None;
        c.volatile_mv = Default::default();
        if let Some(m) = &mut c.mining {
            m.active = false;
        }
        c.target = None;
        c.friendly_targets = false;
        tracing::debug!(character = id, building = building_id, "character entered building");
    }
}
