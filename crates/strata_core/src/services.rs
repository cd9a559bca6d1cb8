//! Building-hosted service operations.
//!
//! Services are requested in moves, validated against the building and
//! the requester's deposits, charged in coins, and then run as ongoing
//! operations.  The base cost is burnt; the building owner's configured
//! fee surcharge is credited to the owner.

use serde_json::Value;

use crate::context::Context;
use crate::inventory::{Inventory, Quantity, MAX_ITEM_QUANTITY};
use crate::world::{IdT, OngoingKind, WorldState};

/// Charge a service cost to the given account.
///
/// Returns false (and charges nothing) when the balance does not cover
/// base cost plus fee.  Ancient buildings charge no fee.
fn charge_service_cost(
    state: &mut WorldState,
    account: &str,
    building_id: IdT,
    base_cost: i64,
) -> bool {
    let (owner, fee_percent) = {
        let b = &state.buildings[&building_id];
        (b.owner.clone(), b.owner_config.service_fee_percent)
    };
    let fee = match &owner {
        Some(o) if o != account => base_cost * i64::from(fee_percent) / 100,
        _ => 0,
    };
    let total = base_cost + fee;

    let a = state.account_mut(account);
    if a.balance < total {
        tracing::debug!(account, total, "cannot afford service cost");
        return false;
    }
    a.balance -= total;

    if fee > 0 {
        let owner = owner.expect("fee only with an owner");
        state.account_mut(&owner).balance += fee;
    }
    true
}

/// Validate common service preconditions and return the building id.
fn service_building(
    state: &WorldState,
    cmd: &Value,
    allow_foundation: bool,
) -> Option<IdT> {
    let building_id = cmd.get("b")?.as_u64()?;
    let b = state.buildings.get(&building_id)?;
    if b.foundation && !allow_foundation {
        tracing::debug!(building = building_id, "service on a foundation");
        return None;
    }
    Some(building_id)
}

/// Armour repair: refills the character's armour after a number of
/// blocks proportional to the missing amount.
fn try_armour_repair(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(building_id) = service_building(state, cmd, false) else {
        return;
    };
    let Some(character_id) = cmd.get("c").and_then(Value::as_u64) else {
        return;
    };

    let (missing, valid) = match state.characters.get(&character_id) {
        Some(c) => {
            let missing = i64::from(c.max_hp.armour) - i64::from(c.hp.armour);
            let valid = c.owner == account
                && c.in_building == Some(building_id)
                && !c.is_busy()
                && missing > 0;
            (missing, valid)
        }
        None => (0, false),
    };
    if !valid {
        tracing::debug!(character = character_id, "invalid armour repair request");
        return;
    }

    let cost = missing * ctx.params().armour_repair_cost_milli / 1_000;
    if !charge_service_cost(state, account, building_id, cost.max(1)) {
        return;
    }

    let per_block = i64::from(ctx.params().armour_repair_hp_per_block);
    let blocks = ((missing + per_block - 1) / per_block).max(1) as u64;
    let op = state.create_ongoing(
        ctx.height + blocks,
        Some(character_id),
        Some(building_id),
        OngoingKind::ArmourRepair,
    );
    let c = state.characters.get_mut(&character_id).unwrap();
    c.busy_blocks = blocks as u32;
    c.ongoing = Some(op);
    tracing::debug!(character = character_id, blocks, "armour repair started");
}

/// Blueprint copy: turns an original blueprint into the original plus a
/// number of copies after a per-copy delay.
fn try_blueprint_copy(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(building_id) = service_building(state, cmd, false) else {
        return;
    };
    let Some(original) = cmd.get("i").and_then(Value::as_str) else {
        return;
    };
    let Some(num) = cmd.get("n").and_then(Value::as_i64) else {
        return;
    };
    if !(1..=MAX_ITEM_QUANTITY).contains(&num) {
        return;
    }

    let Some(bp) = ctx.config.item(original).and_then(|i| i.blueprint.as_ref()) else {
        return;
    };
    if !bp.original {
        tracing::debug!(item = original, "only originals can be copied");
        return;
    }
    let copy_type = format!("{} bp c", bp.for_item);
    if ctx.config.item(&copy_type).is_none() {
        return;
    }

    if state.building_inventory_mut(building_id, account).count(original) < 1 {
        tracing::debug!(account, item = original, "no blueprint to copy");
        return;
    }

    let cost = ctx.params().blueprint_copy_cost * num;
    if !charge_service_cost(state, account, building_id, cost) {
        return;
    }

    // The original is held by the operation until it finishes.
    state
        .building_inventory_mut(building_id, account)
        .add(original, -1);
    state.create_ongoing(
        ctx.height + ctx.params().blueprint_copy_blocks * num as u64,
        None,
        Some(building_id),
        OngoingKind::BlueprintCopy {
            account: account.to_owned(),
            original_type: original.to_owned(),
            copy_type,
            num_copies: num,
        },
    );
    tracing::debug!(account, building = building_id, num, "blueprint copy started");
}

/// Item construction from a blueprint plus materials.
fn try_item_construction(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(building_id) = service_building(state, cmd, false) else {
        return;
    };
    let Some(blueprint) = cmd.get("i").and_then(Value::as_str) else {
        return;
    };
    let Some(num) = cmd.get("n").and_then(Value::as_i64) else {
        return;
    };
    if !(1..=MAX_ITEM_QUANTITY).contains(&num) {
        return;
    }

    let Some(bp) = ctx.config.item(blueprint).and_then(|i| i.blueprint.as_ref()) else {
        return;
    };
    let output = bp.for_item.clone();
    let Some(recipe) = ctx.config.item(&output).and_then(|i| i.recipe.as_ref()) else {
        return;
    };

    // Originals are held (and returned); copies are consumed one per
    // produced item.
    let blueprints_needed: Quantity = if bp.original { 1 } else { num };
    let mut required = Inventory::new();
    required.add(blueprint, blueprints_needed);
    for (item, per_item) in &recipe.materials {
        required.add(item, Inventory::product(num, *per_item as i64));
    }

    {
        let inv = state.building_inventory_mut(building_id, account);
        for (item, needed) in required.iter() {
            if inv.count(item) < needed {
                tracing::debug!(account, item, "missing construction input");
                return;
            }
        }
    }

    let cost = ctx.params().construction_cost * num;
    if !charge_service_cost(state, account, building_id, cost) {
        return;
    }

    {
        let inv = state.building_inventory_mut(building_id, account);
        for (item, needed) in required.iter() {
            inv.add(item, -needed);
        }
    }

    let original_type = bp.original.then(|| blueprint.to_owned());
    let duration = if bp.original {
        recipe.blocks
    } else {
        recipe.blocks * num as u64
    };
    state.create_ongoing(
        ctx.height + duration,
        None,
        Some(building_id),
        OngoingKind::ItemConstruction {
            account: account.to_owned(),
            output_type: output,
            num_items: num,
            original_type,
        },
    );
    tracing::debug!(account, building = building_id, num, "item construction started");
}

/// Building construction: starts the foundation-to-building promotion
/// once all materials are in the construction inventory.
fn try_building_construction(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(building_id) = service_building(state, cmd, true) else {
        return;
    };

    let valid = {
        let b = &state.buildings[&building_id];
        let construction = ctx
            .config
            .building(&b.typ)
            .and_then(|d| d.construction.as_ref());
        match construction {
            Some(c) if b.foundation
                && b.owner.as_deref() == Some(account)
                && b.ongoing_construction.is_none() =>
            {
                c.materials
                    .iter()
                    .all(|(item, needed)| b.construction_inventory.count(item) >= *needed as i64)
            }
            _ => false,
        }
    };
    if !valid {
        tracing::debug!(building = building_id, "invalid building construction request");
        return;
    }

    let blocks = ctx
        .config
        .building(&state.buildings[&building_id].typ)
        .and_then(|d| d.construction.as_ref())
        .expect("validated above")
        .blocks;
    let op = state.create_ongoing(
        ctx.height + blocks,
        None,
        Some(building_id),
        OngoingKind::BuildingConstruction,
    );
    state.buildings.get_mut(&building_id).unwrap().ongoing_construction = Some(op);
    tracing::debug!(building = building_id, blocks, "building construction started");
}

/// Building config update, owner only; applied with a one-block delay so
/// the swap is atomic at the next block boundary.
fn try_config_update(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(building_id) = service_building(state, cmd, false) else {
        return;
    };
    if state.buildings[&building_id].owner.as_deref() != Some(account) {
        return;
    }
    let Some(fee) = cmd.get("fee").and_then(Value::as_u64) else {
        return;
    };
    if fee > 100 {
        return;
    }

    state.create_ongoing(
        ctx.height + 1,
        None,
        Some(building_id),
        OngoingKind::BuildingConfigUpdate {
            new_config: crate::world::OwnerConfig { service_fee_percent: fee as u32 },
        },
    );
}

/// Process one service operation request from a move.
pub fn try_service_operation(state: &mut WorldState, account: &str, cmd: &Value, ctx: &Context) {
    let Some(typ) = cmd.get("t").and_then(Value::as_str) else {
        return;
    };
    match typ {
        "rep" => try_armour_repair(state, account, cmd, ctx),
        "cp" => try_blueprint_copy(state, account, cmd, ctx),
        "con" => try_item_construction(state, account, cmd, ctx),
        "bld" => try_building_construction(state, account, cmd, ctx),
        "cfg" => try_config_update(state, account, cmd, ctx),
        other => {
            tracing::debug!(typ = other, "unknown service operation");
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
    use serde_json::json;

    struct Fixture {
        cfg: RoConfig,
        map: BaseMap,
        state: WorldState,
        building: IdT,
    }

    impl Fixture {
        fn new() -> Self {
            let cfg = RoConfig::for_chain(Chain::Regtest);
            let map = BaseMap::new(500, 24);
            let mut state = WorldState::new();
            state.account_mut("alice").faction = Some(Faction::Red);
            state.account_mut("alice").balance = 1_000;
            let building =
                state.create_building("vault", Some("owner"), Faction::Red, HexCoord::ORIGIN, 0);
            state.account_mut("owner").faction = Some(Faction::Red);
            Self { cfg, map, state, building }
        }

        fn run(&mut self, cmd: Value) {
            let ctx = Context::new(Chain::Regtest, &self.map, &self.cfg, 100, 0);
            try_service_operation(&mut self.state, "alice", &cmd, &ctx);
        }
    }

    #[test]
    fn armour_repair_locks_the_character() {
        let mut f = Fixture::new();
        let id = f.state.create_character("alice", Faction::Red, "scarab");
        {
            let c = f.state.characters.get_mut(&id).unwrap();
            derive_character_stats(c, &f.cfg);
            c.pos = None;
            c.in_building = Some(f.building);
            c.hp.armour = 40;
        }

        f.run(json!({"b": f.building, "t": "rep", "c": id}));

        let c = &f.state.characters[&id];
        assert!(c.is_busy());
        let op = &f.state.ongoings[&c.ongoing.unwrap()];
        assert_eq!(op.op, OngoingKind::ArmourRepair);
        // 60 missing armour at 500 per block: one block.
        assert_eq!(op.height, 101);
        assert!(f.state.accounts["alice"].balance < 1_000, "cost was charged");
    }

    #[test]
    fn repair_rejects_full_armour_and_wrong_owner() {
        let mut f = Fixture::new();
        let id = f.state.create_character("alice", Faction::Red, "scarab");
        {
            let c = f.state.characters.get_mut(&id).unwrap();
            derive_character_stats(c, &f.cfg);
            c.pos = None;
            c.in_building = Some(f.building);
        }

        // Full armour: rejected.
        f.run(json!({"b": f.building, "t": "rep", "c": id}));
        assert!(!f.state.characters[&id].is_busy());

        // Wrong owner: rejected.
        f.state.characters.get_mut(&id).unwrap().hp.armour = 1;
        f.state.characters.get_mut(&id).unwrap().owner = "bob".to_owned();
        f.run(json!({"b": f.building, "t": "rep", "c": id}));
        assert!(!f.state.characters[&id].is_busy());
    }

    #[test]
    fn fee_goes_to_the_building_owner() {
        let mut f = Fixture::new();
        f.state
            .buildings
            .get_mut(&f.building)
            .unwrap()
            .owner_config
            .service_fee_percent = 50;
        f.state
            .building_inventory_mut(f.building, "alice")
            .add("beam laser bp o", 1);

        f.run(json!({"b": f.building, "t": "cp", "i": "beam laser bp o", "n": 10}));

        // Base cost 10, fee 5.
        assert_eq!(f.state.accounts["alice"].balance, 1_000 - 15);
        assert_eq!(f.state.accounts["owner"].balance, 5);
        assert_eq!(f.state.ongoings.len(), 1);
    }

    #[test]
    fn blueprint_copy_requires_the_original() {
        let mut f = Fixture::new();
        f.run(json!({"b": f.building, "t": "cp", "i": "beam laser bp o", "n": 2}));
        assert!(f.state.ongoings.is_empty());

        // A copy cannot be copied.
        f.state
            .building_inventory_mut(f.building, "alice")
            .add("beam laser bp c", 1);
        f.run(json!({"b": f.building, "t": "cp", "i": "beam laser bp c", "n": 2}));
        assert!(f.state.ongoings.is_empty());
    }

    #[test]
    fn construction_consumes_inputs() {
        let mut f = Fixture::new();
        {
            let inv = f.state.building_inventory_mut(f.building, "alice");
            inv.add("beam laser bp c", 2);
            inv.add("raw a", 6);
            inv.add("raw b", 2);
        }

        f.run(json!({"b": f.building, "t": "con", "i": "beam laser bp c", "n": 2}));

        let inv = &f.state.building_inventories[&(f.building, "alice".to_owned())];
        assert_eq!(inv.count("beam laser bp c"), 0);
        assert_eq!(inv.count("raw a"), 0);
        assert_eq!(inv.count("raw b"), 0);
        assert_eq!(f.state.ongoings.len(), 1);
    }

    #[test]
    fn construction_rejects_missing_materials() {
        let mut f = Fixture::new();
        f.state
            .building_inventory_mut(f.building, "alice")
            .add("beam laser bp c", 1);
        // Recipe needs 3 raw a; only 2 present.
        f.state
            .building_inventory_mut(f.building, "alice")
            .add("raw a", 2);
        f.state
            .building_inventory_mut(f.building, "alice")
            .add("raw b", 1);

        f.run(json!({"b": f.building, "t": "con", "i": "beam laser bp c", "n": 1}));
        assert!(f.state.ongoings.is_empty());
        let inv = &f.state.building_inventories[&(f.building, "alice".to_owned())];
        assert_eq!(inv.count("raw a"), 2, "nothing was consumed");
    }

    #[test]
    fn building_construction_needs_materials_and_ownership() {
        let mut f = Fixture::new();
        let fid = f
            .state
            .create_building("turret", Some("alice"), Faction::Red, HexCoord::new(30, 0), 0);
        f.state.buildings.get_mut(&fid).unwrap().foundation = true;

        // Missing materials.
        f.run(json!({"b": fid, "t": "bld"}));
        assert!(f.state.ongoings.is_empty());

        {
            let b = f.state.buildings.get_mut(&fid).unwrap();
            b.construction_inventory.add("raw a", 50);
            b.construction_inventory.add("raw c", 20);
        }
        f.run(json!({"b": fid, "t": "bld"}));
        assert_eq!(f.state.ongoings.len(), 1);
        assert!(f.state.buildings[&fid].ongoing_construction.is_some());

        // A second request while one is running is rejected.
        f.run(json!({"b": fid, "t": "bld"}));
        assert_eq!(f.state.ongoings.len(), 1);
    }

    #[test]
    fn unknown_service_is_a_no_op() {
        let mut f = Fixture::new();
        f.run(json!({"b": f.building, "t": "dance"}));
        f.run(json!({"t": "rep"}));
        f.run(json!({}));
        assert!(f.state.ongoings.is_empty());
    }
}
