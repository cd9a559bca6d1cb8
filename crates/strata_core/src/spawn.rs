//! Character spawning.
//!
//! Before the unblock-spawns fork, new characters are placed on the ring
//! around their faction's spawn centre, starting from a random ring
//! position and walking it deterministically until a free passable tile
//! is found.  After the fork they spawn directly inside the faction's
//! starter building.

use crate::components::Faction;
use crate::context::Context;
use crate::dynobstacles::DynObstacles;
use crate::fitments::derive_character_stats;
use crate::forks::Fork;
use crate::hex::HexCoord;
use crate::rnd::Random;
use crate::world::{IdT, WorldState};

/// The faction's starter building: its lowest-id citadel.
fn starter_building(state: &WorldState, faction: Faction) -> Option<IdT> {
    state
        .buildings
        .values()
        .find(|b| b.typ == "citadel" && b.faction == faction)
        .map(|b| b.id)
}

/// Find the spawn tile on the ring around the centre.  The scan starts
/// at a random ring index and continues outward ring by ring if the
/// whole ring is taken.
fn spawn_position(
    centre: HexCoord,
    dyn_obstacles: &DynObstacles,
    rnd: &mut Random,
    ctx: &Context,
) -> Option<HexCoord> {
    for radius in ctx.params().spawn_ring_radius.. {
        if radius > ctx.params().spawn_ring_radius + 5 {
            break;
        }
        let ring: Vec<HexCoord> = centre
            .l1_ball(radius)
            .filter(|c| HexCoord::distance_l1(centre, *c) == radius)
            .collect();
        assert!(!ring.is_empty());

        let start = rnd.next_int(ring.len() as u32) as usize;
        for i in 0..ring.len() {
            let tile = ring[(start + i) % ring.len()];
            if ctx.map.is_passable(tile) && dyn_obstacles.is_free(tile) {
                return Some(tile);
            }
        }
    }
    None
}

/// Create and place a new character.  Returns its id, or `None` when no
/// spawn location is available.
pub fn spawn_character(
    state: &mut WorldState,
    dyn_obstacles: &mut DynObstacles,
    rnd: &mut Random,
    ctx: &Context,
    owner: &str,
    faction: Faction,
    vehicle: &str,
) -> Option<IdT> {
    if ctx.fork_active(Fork::UnblockSpawns) {
        let building = starter_building(state, faction)?;
        let id = state.create_character(owner, faction, vehicle);
        let c = state.characters.get_mut(&id).unwrap();
        derive_character_stats(c, ctx.config);
        c.in_building = Some(building);
        tracing::debug!(owner, character = id, building, "character spawned in starter building");
        return Some(id);
    }

    let centre = ctx.params().spawn_centres[&faction];
    let pos = spawn_position(centre, dyn_obstacles, rnd, ctx)?;

    let id = state.create_character(owner, faction, vehicle);
    let c = state.characters.get_mut(&id).unwrap();
    derive_character_stats(c, ctx.config);
    c.pos = Some(pos);
    dyn_obstacles.add_vehicle(pos, faction);
    tracing::debug!(owner, character = id, %pos, "character spawned on the ring");
    Some(id)
}
