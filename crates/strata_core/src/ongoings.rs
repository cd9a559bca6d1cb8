//! Scheduling and finalisation of ongoing multi-block operations.
//!
//! Operations are keyed by the absolute height at which they fire.  A
//! character-attached operation keeps the character's busy counter in
//! lockstep: the counter reaches exactly one when the operation is due,
//! which the scheduler asserts before finalising.

use crate::buildings::update_building_stats;
use crate::context::Context;
use crate::prospecting::finish_prospecting;
use crate::rnd::Random;
use crate::world::{IdT, OngoingKind, WorldState};

/// Promote a finished foundation into a full building.
fn finish_building_construction(state: &mut WorldState, building_id: IdT, ctx: &Context) {
    let b = state.buildings.get_mut(&building_id).expect("op references building");
    assert!(b.foundation, "construction finished on a non-foundation");
    let data = ctx
        .config
        .building(&b.typ)
        .unwrap_or_else(|| panic!("unknown building type {}", b.typ));
    let construction = data
        .construction
        .as_ref()
        .unwrap_or_else(|| panic!("building type {} is not constructible", b.typ));

    // Materials consumed by the construction leave the inventory; any
    // surplus moves to the owner's account inside the new building.
    let mut surplus = b.construction_inventory.clone();
    for (item, needed) in &construction.materials {
        surplus.add(item, -(*needed as i64));
    }
    let owner = b.owner.clone().expect("constructible buildings have an owner");

    b.construction_inventory = crate::inventory::Inventory::new();
    b.foundation = false;
    b.ongoing_construction = None;
    update_building_stats(b, ctx.config);

    if !surplus.is_empty() {
        state
            .building_inventory_mut(building_id, &owner)
            .merge(&surplus);
    }
    tracing::debug!(building = building_id, owner = %owner, "building construction finished");
}

/// The ongoing-operations phase of a block.
///
/// Finalises all operations due at this height, then counts down the
/// busy counter of every other busy character.
pub fn process_all_ongoings(state: &mut WorldState, rnd: &mut Random, ctx: &Context) {
    let due: Vec<IdT> = state
        .ongoings
        .values()
        .filter(|op| op.height <= ctx.height)
        .map(|op| op.id)
        .collect();

    for op_id in due {
        let op = state.ongoings[&op_id].clone();
        // Anything below the current height should have fired already.
        assert_eq!(op.height, ctx.height, "ongoing operation missed its height");

        if let Some(cid) = op.character_id {
            assert_eq!(
                state.characters[&cid].busy_blocks,
                1,
                "busy counter out of sync with its operation"
            );
        }

        let mut reschedule = false;
        match &op.op {
            OngoingKind::Prospection { region } => {
                let cid = op.character_id.expect("prospection belongs to a character");
                finish_prospecting(state, cid, rnd, *region, ctx);
            }

            OngoingKind::ArmourRepair => {
                let cid = op.character_id.expect("repair belongs to a character");
                let c = state.characters.get_mut(&cid).unwrap();
                c.hp.armour = c.max_hp.armour;
                tracing::debug!(character = cid, "armour repair finished");
            }

            OngoingKind::BlueprintCopy { account, original_type, copy_type, num_copies } => {
                let bid = op.building_id.expect("copy runs inside a building");
                let inv = state.building_inventory_mut(bid, account);
                inv.add(original_type, 1);
                inv.add(copy_type, *num_copies);
                tracing::debug!(account = %account, building = bid, num_copies, "blueprint copy finished");
            }

            OngoingKind::ItemConstruction { account, output_type, num_items, original_type } => {
                let bid = op.building_id.expect("construction runs inside a building");
                match original_type {
                    Some(original) => {
                        // From an original blueprint, one item per step;
                        // the blueprint returns with the last item.
                        let inv = state.building_inventory_mut(bid, account);
                        inv.add(output_type, 1);
                        if *num_items > 1 {
                            let item_blocks = ctx
                                .config
                                .item(output_type)
                                .and_then(|i| i.recipe.as_ref())
                                .expect("constructed item has a recipe")
                                .blocks;
                            let new_op = state.ongoings.get_mut(&op_id).unwrap();
                            new_op.height = ctx.height + item_blocks;
                            new_op.op = OngoingKind::ItemConstruction {
                                account: account.clone(),
                                output_type: output_type.clone(),
                                num_items: num_items - 1,
                                original_type: Some(original.clone()),
                            };
                            reschedule = true;
                        } else {
                            state.building_inventory_mut(bid, account).add(original, 1);
                        }
                    }
                    None => {
                        // From consumed copies, the whole batch at once.
                        state
                            .building_inventory_mut(bid, account)
                            .add(output_type, *num_items);
                    }
                }
            }

            OngoingKind::BuildingConstruction => {
                let bid = op.building_id.expect("construction references a building");
                finish_building_construction(state, bid, ctx);
            }

            OngoingKind::BuildingConfigUpdate { new_config } => {
                let bid = op.building_id.expect("config update references a building");
                state.buildings.get_mut(&bid).unwrap().owner_config = *new_config;
                tracing::debug!(building = bid, "building config updated");
            }
        }

        if let Some(cid) = op.character_id {
            let c = state.characters.get_mut(&cid).unwrap();
            c.busy_blocks = 0;
            c.ongoing = None;
        }
        if !reschedule {
            state.ongoings.remove(&op_id);
        }
    }

    // Count down everyone else still busy.
    for c in state.characters.values_mut() {
        if c.busy_blocks > 0 {
            c.busy_blocks -= 1;
            assert!(c.busy_blocks > 0, "busy counter ran out without an operation firing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Faction;
    use crate::config::{Chain, RoConfig};
    use crate::fitments::derive_character_stats;
    use crate::hex::HexCoord;
    use crate::map::BaseMap;

    struct Fixture {
        cfg: RoConfig,
        map: BaseMap,
        state: WorldState,
        rnd: Random,
    }

    impl Fixture {
        fn new() -> Self {
            let cfg = RoConfig::for_chain(Chain::Regtest);
            let map = BaseMap::new(500, 24);
            let seed = "6f750b36d22f1dc3d0a6e483af45301022646dfc3b3ba2187865f5a7d6d83ab1";
            Self {
                cfg,
                map,
                state: WorldState::new(),
                rnd: Random::from_block_hash(seed).unwrap(),
            }
        }

        fn process(&mut self, height: u64) {
            let ctx = Context::new(Chain::Regtest, &self.map, &self.cfg, height, 0);
            process_all_ongoings(&mut self.state, &mut self.rnd, &ctx);
        }
    }

    #[test]
    fn armour_repair_fires_at_its_height() {
        let mut f = Fixture::new();
        let id = f.state.create_character("alice", Faction::Red, "scarab");
        {
            let c = f.state.characters.get_mut(&id).unwrap();
            derive_character_stats(c, &f.cfg);
            c.hp.armour = 10;
        }
        let op = f
            .state
            .create_ongoing(12, Some(id), None, OngoingKind::ArmourRepair);
        f.state.characters.get_mut(&id).unwrap().busy_blocks = 2;
        f.state.characters.get_mut(&id).unwrap().ongoing = Some(op);

        f.process(11);
        let c = &f.state.characters[&id];
        assert_eq!(c.busy_blocks, 1);
        assert_eq!(c.hp.armour, 10, "not repaired yet");

        f.process(12);
        let c = &f.state.characters[&id];
        assert_eq!(c.busy_blocks, 0);
        assert_eq!(c.ongoing, None);
        assert_eq!(c.hp.armour, c.max_hp.armour);
        assert!(f.state.ongoings.is_empty());
    }

    #[test]
    fn blueprint_copy_delivers_originals_and_copies() {
        let mut f = Fixture::new();
        let bid = f.state.create_building("vault", Some("alice"), Faction::Red, HexCoord::ORIGIN, 0);
        f.state.create_ongoing(
            20,
            None,
            Some(bid),
            OngoingKind::BlueprintCopy {
                account: "alice".to_owned(),
                original_type: "beam laser bp o".to_owned(),
                copy_type: "beam laser bp c".to_owned(),
                num_copies: 3,
            },
        );

        f.process(20);
        let inv = &f.state.building_inventories[&(bid, "alice".to_owned())];
        assert_eq!(inv.count("beam laser bp o"), 1);
        assert_eq!(inv.count("beam laser bp c"), 3);
    }

    #[test]
    fn item_construction_from_original_is_stepwise() {
        let mut f = Fixture::new();
        let bid = f.state.create_building("vault", Some("alice"), Faction::Red, HexCoord::ORIGIN, 0);
        let op = f.state.create_ongoing(
            20,
            None,
            Some(bid),
            OngoingKind::ItemConstruction {
                account: "alice".to_owned(),
                output_type: "beam laser".to_owned(),
                num_items: 2,
                original_type: Some("beam laser bp o".to_owned()),
            },
        );

        f.process(20);
        let key = (bid, "alice".to_owned());
        assert_eq!(f.state.building_inventories[&key].count("beam laser"), 1);
        assert_eq!(f.state.building_inventories[&key].count("beam laser bp o"), 0);
        // Rescheduled for the next step.
        assert_eq!(f.state.ongoings[&op].height, 30);

        f.process(30);
        assert_eq!(f.state.building_inventories[&key].count("beam laser"), 2);
        assert_eq!(f.state.building_inventories[&key].count("beam laser bp o"), 1);
        assert!(f.state.ongoings.is_empty());
    }

    #[test]
    fn item_construction_from_copies_delivers_at_once() {
        let mut f = Fixture::new();
        let bid = f.state.create_building("vault", Some("alice"), Faction::Red, HexCoord::ORIGIN, 0);
        f.state.create_ongoing(
            20,
            None,
            Some(bid),
            OngoingKind::ItemConstruction {
                account: "alice".to_owned(),
                output_type: "beam laser".to_owned(),
                num_items: 3,
                original_type: None,
            },
        );

        f.process(20);
        let key = (bid, "alice".to_owned());
        assert_eq!(f.state.building_inventories[&key].count("beam laser"), 3);
        assert!(f.state.ongoings.is_empty());
    }

    #[test]
    fn building_construction_promotes_the_foundation() {
        let mut f = Fixture::new();
        let bid = f.state.create_building("vault", Some("alice"), Faction::Red, HexCoord::ORIGIN, 0);
        {
            let b = f.state.buildings.get_mut(&bid).unwrap();
            b.foundation = true;
            // The required materials plus a bit of surplus.
            b.construction_inventory.add("raw a", 120);
            b.construction_inventory.add("raw b", 50);
        }
        let op = f
            .state
            .create_ongoing(20, None, Some(bid), OngoingKind::BuildingConstruction);
        f.state.buildings.get_mut(&bid).unwrap().ongoing_construction = Some(op);

        f.process(20);
        let b = &f.state.buildings[&bid];
        assert!(!b.foundation);
        assert_eq!(b.ongoing_construction, None);
        assert_eq!(b.hp.armour, b.max_hp.armour);
        assert!(b.construction_inventory.is_empty());

        // Surplus raw a went to the owner's deposit.
        let inv = &f.state.building_inventories[&(bid, "alice".to_owned())];
        assert_eq!(inv.count("raw a"), 20);
        assert_eq!(inv.count("raw b"), 0);
    }

    #[test]
    fn config_update_swaps_atomically() {
        let mut f = Fixture::new();
        let bid = f.state.create_building("vault", Some("alice"), Faction::Red, HexCoord::ORIGIN, 0);
        f.state.create_ongoing(
            20,
            None,
            Some(bid),
            OngoingKind::BuildingConfigUpdate {
                new_config: crate::world::OwnerConfig { service_fee_percent: 25 },
            },
        );

        f.process(20);
        assert_eq!(f.state.buildings[&bid].owner_config.service_fee_percent, 25);
    }

    #[test]
    #[should_panic(expected = "missed its height")]
    fn missed_operations_are_fatal() {
        let mut f = Fixture::new();
        f.state
            .create_ongoing(5, None, Some(1), OngoingKind::BuildingConstruction);
        f.process(6);
    }
}
