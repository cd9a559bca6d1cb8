//! Mining of prospected regions.
//!
//! Each mining character in a region with resources left draws a random
//! per-block amount, capped by its remaining cargo space and by the
//! region's remaining resource.  Characters are processed in ascending id
//! order, which fixes the random stream.

use crate::context::Context;
use crate::rnd::Random;
use crate::world::{IdT, WorldState};

/// Stop a character's mining (if it has any mining state).
pub fn stop_mining(state: &mut WorldState, id: IdT) {
    if let Some(m) = &mut state.characters.get_mut(&id).unwrap().mining {
        m.active = false;
    }
}

/// The mining phase of a block.
pub fn process_all_mining(state: &mut WorldState, rnd: &mut Random, ctx: &Context) {
    let ids: Vec<IdT> = state
        .characters
        .values()
        .filter(|c| c.pos.is_some() && c.mining.is_some_and(|m| m.active))
        .map(|c| c.id)
        .collect();

    for id in ids {
        let (pos, rate) = {
            let c = &state.characters[&id];
            (c.pos.expect("filtered on position"), c.mining.expect("filtered on mining").rate)
        };
        let region_id = ctx.map.region_id(pos);

        let (resource, available) = {
            let Some(region) = state.regions.get(&region_id) else {
                tracing::debug!(character = id, "mining in unprospected region, stopping");
                stop_mining(state, id);
                continue;
            };
            match &region.prospection {
                Some(p) if region.resource_left > 0 => {
                    (p.resource.clone(), region.resource_left)
                }
                _ => {
                    tracing::debug!(character = id, "region exhausted, stopping mining");
                    stop_mining(state, id);
                    continue;
                }
            }
        };

        let span = (rate.max - rate.min + 1) as u32;
        let mut amount = (rate.min + u64::from(rnd.next_int(span))) as i64;

        let space = ctx.config.item(&resource).map_or(0, |i| i.space);
        if space > 0 {
            let free = state.characters[&id].free_cargo_space(ctx.config);
            amount = amount.min((free / space) as i64);
        }
        amount = amount.min(available);

        if amount <= 0 {
            tracing::debug!(character = id, "no cargo space for mined resource");
            continue;
        }

        state
            .characters
            .get_mut(&id)
            .unwrap()
            .inventory
            .add(&resource, amount);
        let region = state.regions.get_mut(&region_id).unwrap();
        region.resource_left -= amount;
        tracing::debug!(character = id, resource = %resource, amount, "mined");
    }
}
