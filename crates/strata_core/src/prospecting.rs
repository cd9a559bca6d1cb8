//! Region prospecting.
//!
//! Prospecting a region takes a fixed number of blocks and finalises by
//! determining the region's resource and amount, rolling for prizes and
//! artefacts, and recording the result on the region row.

use crate::context::Context;
use crate::hex::HexCoord;
use crate::map::RegionId;
use crate::rnd::Random;
use crate::world::{IdT, Prospection, Region, WorldState};

/// Whether the given character may start prospecting the region.
///
/// A region cannot be prospected while someone else is at it, and a
/// finished prospection blocks re-prospecting until the expiry window has
/// passed and any found resource is fully depleted.
#[must_use]
pub fn can_prospect_region(region: &Region, ctx: &Context) -> bool {
    if region.prospecting_character.is_some() {
        tracing::debug!("region is already being prospected");
        return false;
    }

    if let Some(prospection) = &region.prospection {
        if ctx.height < prospection.height + ctx.params().prospection_expiry_blocks {
            return false;
        }
        if region.resource_left > 0 {
            return false;
        }
    }

    true
}

/// Give items to a character, spilling what does not fit the cargo hold
/// onto the ground at the character's position.
fn give_or_drop(state: &mut WorldState, character: IdT, item: &str, amount: i64, ctx: &Context) {
    let c = &state.characters[&character];
    let pos = c.pos.expect("prospecting characters are on the map");
    let space = ctx.config.item(item).map_or(0, |i| i.space);

    let carried = if space == 0 {
        amount
    } else {
        let free = c.free_cargo_space(ctx.config);
        amount.min((free / space) as i64)
    };

    if carried > 0 {
        state
            .characters
            .get_mut(&character)
            .unwrap()
            .inventory
            .add(item, carried);
    }
    let overflow = amount - carried;
    if overflow > 0 {
        tracing::debug!(character, item, overflow, "cargo full, dropping to ground");
        state.loot_mut(pos).add(item, overflow);
    }
}

/// Pick the region's resource by position-dependent weights.
fn determine_resource(pos: HexCoord, rnd: &mut Random, ctx: &Context) -> usize {
    let weights: Vec<u32> = ctx
        .params()
        .resources
        .iter()
        .map(|r| r.weight_at(pos))
        .collect();
    let total: u32 = weights.iter().sum();
    assert!(total > 0, "no resources configured");

    let mut roll = rnd.next_int(total);
    for (i, w) in weights.iter().enumerate() {
        if roll < *w {
            return i;
        }
        roll -= w;
    }
    unreachable!("roll below total weight");
}

/// Finalise the prospection a character has been performing.
///
/// Clears the prospecting marker, records the result, seeds the resource
/// amount, and rolls prizes and artefacts into the character's cargo.
pub fn finish_prospecting(
    state: &mut WorldState,
    character: IdT,
    rnd: &mut Random,
    region_id: RegionId,
    ctx: &Context,
) {
    let (owner, pos) = {
        let c = &state.characters[&character];
        (c.owner.clone(), c.pos.expect("prospector is on the map"))
    };
    assert_eq!(ctx.map.region_id(pos), region_id, "prospector left the region");

    let resource_index = determine_resource(pos, rnd, ctx);
    let resource = &ctx.params().resources[resource_index];
    let span = (resource.amount_max - resource.amount_min + 1) as u32;
    let amount = resource.amount_min + u64::from(rnd.next_int(span));

    {
        let r = state.region_mut(region_id);
        assert_eq!(
            r.prospecting_character,
            Some(character),
            "region not marked as prospected by this character"
        );
        r.prospecting_character = None;
        r.prospection = Some(Prospection {
            name: owner,
            height: ctx.height,
            resource: resource.name.clone(),
        });
        r.resource_left = amount as i64;
    }
    tracing::debug!(
        region = region_id,
        resource = %resource.name,
        amount,
        "prospection finished"
    );

    // Prize rolls, in the configured order.  A prize can only be found
    // while the global counter is below its cap.
    let low = ctx.params().is_low_prize_zone(pos);
    for prize in &ctx.params().prizes {
        let item = prize.item_name();
        let found = state.item_counts.get(&item).copied().unwrap_or(0);
        if found >= prize.available {
            continue;
        }
        let chance = if low { prize.low_chance } else { prize.chance };
        if rnd.probability_roll(chance.numer, chance.denom) {
            *state.item_counts.entry(item.clone()).or_default() += 1;
            give_or_drop(state, character, &item, 1, ctx);
            tracing::debug!(character, prize = %prize.name, "prospection prize found");
        }
    }

    // Artefact rolls: first success wins and ends the sequence.
    for (artefact, chance) in &ctx.params().resources[resource_index].artefacts {
        if rnd.probability_roll(chance.numer, chance.denom) {
            give_or_drop(state, character, artefact, 1, ctx);
            tracing::debug!(character, artefact = %artefact, "artefact found");
            break;
        }
    }
}
