//! Slow state-invariant validation.
//!
//! These checks walk the full state and are far too slow for production
//! block processing; the pipeline runs them in debug builds only.  Any
//! violation is fatal: a state that breaks an invariant here has already
//! diverged, and the node must halt rather than keep building on it.

use std::collections::BTreeMap;

use crate::components::Faction;
use crate::context::Context;
use crate::inventory::MAX_ITEM_QUANTITY;
use crate::world::{OngoingKind, WorldState};

/// Validate all state invariants.  Panics on any violation.
pub fn validate_state(state: &WorldState, ctx: &Context) {
    tracing::debug!("running slow state validation");
    validate_factions(state);
    validate_character_limit(state, ctx);
    validate_building_membership(state);
    validate_positions(state);
    validate_ongoing_links(state);
    validate_quantities(state);
}

/// Character and building factions match their owner's faction.
fn validate_factions(state: &WorldState) {
    let mut account_factions: BTreeMap<&str, Faction> = BTreeMap::new();
    for (name, account) in &state.accounts {
        if let Some(f) = account.faction {
            assert!(
                f != Faction::Ancient,
                "account {name} has the ancient faction"
            );
            account_factions.insert(name, f);
        }
    }

    for c in state.characters.values() {
        let owner_faction = account_factions.get(c.owner.as_str()).unwrap_or_else(|| {
            panic!("character {} owned by uninitialised account {}", c.id, c.owner)
        });
        assert_eq!(
            c.faction, *owner_faction,
            "faction mismatch between character {} and owner {}",
            c.id, c.owner
        );
    }

    for b in state.buildings.values() {
        let Some(owner) = &b.owner else {
            continue;
        };
        let owner_faction = account_factions.get(owner.as_str()).unwrap_or_else(|| {
            panic!("building {} owned by uninitialised account {owner}", b.id)
        });
        assert_eq!(
            b.faction, *owner_faction,
            "faction mismatch between building {} and owner {owner}",
            b.id
        );
    }
}

/// No account exceeds the configured character limit.
fn validate_character_limit(state: &WorldState, ctx: &Context) {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for c in state.characters.values() {
        *counts.entry(c.owner.as_str()).or_default() += 1;
    }
    for (owner, count) in counts {
        assert!(
            count <= ctx.params().character_limit,
            "account {owner} has {count} characters"
        );
    }
}

/// Characters inside buildings sit in existing, faction-compatible ones.
fn validate_building_membership(state: &WorldState) {
    for c in state.characters.values() {
        let Some(building_id) = c.in_building else {
            continue;
        };
        let b = state.buildings.get(&building_id).unwrap_or_else(|| {
            panic!("character {} is inside non-existing building {building_id}", c.id)
        });
        assert!(
            b.faction == Faction::Ancient || b.faction == c.faction,
            "character {} inside hostile building {building_id}",
            c.id
        );
    }
}

/// Characters are either on the map or inside a building, never both.
fn validate_positions(state: &WorldState) {
    for c in state.characters.values() {
        assert!(
            c.pos.is_some() != c.in_building.is_some(),
            "character {} has inconsistent position state",
            c.id
        );
    }
}

/// Busy counters and ongoing operations form consistent back-references,
/// as do buildings and their construction operations.
fn validate_ongoing_links(state: &WorldState) {
    for c in state.characters.values() {
        assert_eq!(
            c.busy_blocks > 0,
            c.ongoing.is_some(),
            "character {} busy state does not match its operation",
            c.id
        );
        if let Some(op_id) = c.ongoing {
            let op = state
                .ongoings
                .get(&op_id)
                .unwrap_or_else(|| panic!("character {} references missing op {op_id}", c.id));
            assert_eq!(
                op.character_id,
                Some(c.id),
                "operation {op_id} does not point back to character {}",
                c.id
            );
        }
    }

    for b in state.buildings.values() {
        if let Some(op_id) = b.ongoing_construction {
            let op = state
                .ongoings
                .get(&op_id)
                .unwrap_or_else(|| panic!("building {} references missing op {op_id}", b.id));
            assert_eq!(
                op.building_id,
                Some(b.id),
                "operation {op_id} does not point back to building {}",
                b.id
            );
            assert!(
                matches!(op.op, OngoingKind::BuildingConstruction),
                "construction link of building {} points at a different op kind",
                b.id
            );
        }
    }

    for op in state.ongoings.values() {
        if let Some(cid) = op.character_id {
            let c = state
                .characters
                .get(&cid)
                .unwrap_or_else(|| panic!("operation {} references missing character {cid}", op.id));
            assert_eq!(c.ongoing, Some(op.id));
        }
        if let Some(bid) = op.building_id {
            assert!(
                state.buildings.contains_key(&bid),
                "operation {} references missing building {bid}",
                op.id
            );
        }
    }
}

/// All stored quantities stay within the bound that keeps products in 64
/// bits.
fn validate_quantities(state: &WorldState) {
    let check = |what: &str, inv: &crate::inventory::Inventory| {
        for (item, count) in inv.iter() {
            assert!(
                (1..=MAX_ITEM_QUANTITY).contains(&count),
                "{what} holds invalid quantity {count} of {item}"
            );
        }
    };

    for c in state.characters.values() {
        check("character inventory", &c.inventory);
    }
    for b in state.buildings.values() {
        check("construction inventory", &b.construction_inventory);
    }
    for inv in state.building_inventories.values() {
        check("building deposit", inv);
    }
    for inv in state.ground_loot.values() {
        check("ground loot", inv);
    }
    for r in state.regions.values() {
        assert!(
            (0..=MAX_ITEM_QUANTITY).contains(&r.resource_left),
            "region resource out of bounds"
        );
    }
    for o in state.orders.values() {
        assert!((1..=MAX_ITEM_QUANTITY).contains(&o.quantity));
        assert!(o.price >= 1);
    }
}
