//! Movement processing.
//!
//! Characters move along step lists computed towards their waypoints,
//! accumulating integer partial-step points each block and spending them
//! on edge weights.  Dynamic obstacles are consumed at step time, so the
//! cached step list stays valid across blocks and is recomputed only when
//! the way is blocked for too long.

use std::collections::VecDeque;

use crate::components::Faction;
use crate::context::Context;
use crate::dynobstacles::DynObstacles;
use crate::forks::Fork;
use crate::hex::HexCoord;
use crate::map::{BaseMap, DistanceT};
use crate::pathfinder::{find_path, EdgeWeight, DEFAULT_NODE_BUDGET};
use crate::world::{Character, IdT, WorldState};

/// Base-map edge weight for a character of the given faction.
///
/// Starter zones grant their own faction fast transit (one third of the
/// base weight) and block everyone else.
#[must_use]
pub fn movement_edge_weight(
    map: &BaseMap,
    faction: Faction,
    from: HexCoord,
    to: HexCoord,
) -> Option<DistanceT> {
    let w = map.edge_weight(from, to)?;
    match map.safe_zones().starter_for(to) {
        Some(owner) if owner == faction => Some(w / 3),
        Some(_) => None,
        None => Some(w),
    }
}

/// Edge weight of one actual step, layering dynamic obstacles over the
/// base weight.
///
/// Buildings always block.  Before the unblock-spawns fork, vehicles of
/// other factions block outright while same-faction vehicles slow the
/// step down; after the fork no vehicle blocks, but any occupied tile
/// costs the configured slowdown multiple.
fn step_weight<E: EdgeWeight>(
    base_edges: &E,
    dyn_obstacles: &DynObstacles,
    faction: Faction,
    unblock_fork: bool,
    slowdown: DistanceT,
    from: HexCoord,
    to: HexCoord,
) -> Option<DistanceT> {
    let w = base_edges.weight(from, to)?;
    if dyn_obstacles.is_building(to) {
        return None;
    }

    if unblock_fork {
        if dyn_obstacles.any_vehicle(to) {
            return Some(w.saturating_mul(slowdown));
        }
        return Some(w);
    }

    for f in Faction::PLAYABLE {
        if f != faction && dyn_obstacles.has_vehicle(to, f) {
            return None;
        }
    }
    if dyn_obstacles.has_vehicle(to, faction) {
        return Some(w.saturating_mul(slowdown));
    }
    Some(w)
}

/// Stop a character's movement entirely.
pub fn stop_character(c: &mut Character) {
    c.movement = None;
    c.volatile_mv = Default::default();
}

/// Movement points available to a character this block.
fn effective_speed(c: &Character) -> u32 {
    let speed = c.effects.speed.apply_u32(c.speed);
    match c.movement.as_ref().and_then(|m| m.chosen_speed) {
        Some(chosen) => speed.min(chosen),
        None => speed,
    }
}

/// Process movement for a single character against the given base edge
/// weights.  Exposed at crate level so movement semantics can be tested
/// with synthetic edge functions.
pub(crate) fn process_character_movement<E: EdgeWeight>(
    state: &mut WorldState,
    id: IdT,
    dyn_obstacles: &mut DynObstacles,
    ctx: &Context,
    base_edges: &E,
) {
    let unblock_fork = ctx.fork_active(Fork::UnblockSpawns);
    let slowdown = ctx.params().multi_vehicle_slowdown;
    let retries = ctx.params().blocked_step_retries;

    let c = state.characters.get_mut(&id).expect("character exists");
    let Some(mut mv) = c.movement.take() else {
        return;
    };
    let faction = c.faction;
    let mut pos = c.pos.expect("moving character must be on the map");

    c.volatile_mv.partial_step = c
        .volatile_mv
        .partial_step
        .saturating_add(effective_speed(c));

    let mut stopped = false;
    loop {
        // Waypoints already reached are consumed silently; this also
        // covers duplicate waypoints in the list.
        while mv.waypoints.front() == Some(&pos) {
            mv.waypoints.pop_front();
        }
        let Some(&target) = mv.waypoints.front() else {
            stopped = true;
            break;
        };

        if mv.steps.is_empty() {
            let path = {
                let edges = |a: HexCoord, b: HexCoord| {
                    step_weight(
                        base_edges,
                        dyn_obstacles,
                        faction,
                        unblock_fork,
                        slowdown,
                        a,
                        b,
                    )
                };
                find_path(&edges, pos, target, DEFAULT_NODE_BUDGET)
            };
            match path {
                Some(p) => {
                    mv.steps = p.into_iter().skip(1).collect::<VecDeque<_>>();
                    if mv.steps.is_empty() {
                        // Already standing on the waypoint.
                        continue;
                    }
                }
                None => {
                    tracing::debug!(character = id, %target, "no path to waypoint, stopping");
                    stopped = true;
                    break;
                }
            }
        }

        let next = *mv.steps.front().expect("steps non-empty");
        match step_weight(
            base_edges,
            dyn_obstacles,
            faction,
            unblock_fork,
            slowdown,
            pos,
            next,
        ) {
            None => {
                c.volatile_mv.blocked_turns += 1;
                c.volatile_mv.partial_step = 0;
                if c.volatile_mv.blocked_turns > retries {
                    // Give up on the cached path; a fresh one is computed
                    // around the obstacle next block.
                    mv.steps.clear();
                    c.volatile_mv.blocked_turns = 0;
                }
                break;
            }
            Some(w) => {
                // The way is free, so the character is no longer blocked,
                // whether or not it can afford the step yet.
                c.volatile_mv.blocked_turns = 0;
                if c.volatile_mv.partial_step < w {
                    break;
                }
                c.volatile_mv.partial_step -= w;
                dyn_obstacles.remove_vehicle(pos, faction);
                dyn_obstacles.add_vehicle(next, faction);
                pos = next;
                mv.steps.pop_front();
            }
        }
    }

    c.pos = Some(pos);
    if stopped {
        stop_character(c);
    } else {
        c.movement = Some(mv);
    }
}

/// The per-block movement phase: advance all moving characters in
/// ascending id order.
pub fn process_all_movement(state: &mut WorldState, dyn_obstacles: &mut DynObstacles, ctx: &Context) {
    let ids: Vec<IdT> = state
        .characters
        .values()
        .filter(|c| c.is_moving())
        .map(|c| c.id)
        .collect();

    for id in ids {
        let faction = state.characters[&id].faction;
        let map = ctx.map;
        let edges =
            move |a: HexCoord, b: HexCoord| movement_edge_weight(map, faction, a, b);
        process_character_movement(state, id, dyn_obstacles, ctx, &edges);
    }
}
