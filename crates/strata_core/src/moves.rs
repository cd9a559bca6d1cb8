//! Parsing and processing of admin commands and player moves.
//!
//! A block carries one JSON array of admin commands and one of player
//! moves.  Admin commands run first, in array order; player moves follow
//! in block order.  Every command is validated against the current state
//! and either applied or rejected as a silent no-op — a bad move never
//! affects other moves and never aborts the block.

use serde_json::Value;

use crate::coins;
use crate::components::{Faction, Movement};
use crate::config::Chain;
use crate::context::Context;
use crate::dynobstacles::DynObstacles;
use crate::fitments::{check_vehicle_fitments, derive_character_stats};
use crate::hex::{CoordT, HexCoord};
use crate::inventory::MAX_ITEM_QUANTITY;
use crate::mining::stop_mining;
use crate::movement::stop_character;
use crate::prospecting::can_prospect_region;
use crate::rnd::Random;
use crate::services;
use crate::spawn::spawn_character;
use crate::trading;
use crate::world::{IdT, OngoingKind, OrderSide, WorldState};

/// Maximum number of waypoints accepted in one move.
const MAX_WAYPOINTS: usize = 100;

/// Processes all moves of one block.
pub struct MoveProcessor<'a, 'ctx> {
    state: &'a mut WorldState,
    dyn_obstacles: &'a mut DynObstacles,
    rnd: &'a mut Random,
    ctx: &'a Context<'ctx>,
}

impl<'a, 'ctx> MoveProcessor<'a, 'ctx> {
    /// Create a processor operating on the given state.
    pub fn new(
        state: &'a mut WorldState,
        dyn_obstacles: &'a mut DynObstacles,
        rnd: &'a mut Random,
        ctx: &'a Context<'ctx>,
    ) -> Self {
        Self { state, dyn_obstacles, rnd, ctx }
    }

    /// Process all admin commands of a block, in array order.
    pub fn process_admin(&mut self, admin: &Value) {
        let Some(arr) = admin.as_array() else {
            return;
        };
        for entry in arr {
            if let Some(cmd) = entry.get("cmd") {
                self.handle_god_mode(cmd);
            }
        }
    }

    /// Process all player moves of a block, in array order.
    pub fn process_all(&mut self, moves: &Value) {
        let Some(arr) = moves.as_array() else {
            return;
        };
        for entry in arr {
            self.process_one(entry);
        }
    }

    fn process_one(&mut self, move_obj: &Value) {
        let Some(name) = move_obj.get("name").and_then(Value::as_str) else {
            tracing::debug!("move without a name");
            return;
        };
        let Some(mv) = move_obj.get("move") else {
            return;
        };
        if !mv.is_object() {
            tracing::debug!(name, "move data is not an object");
            return;
        }

        self.maybe_init_account(name, mv);
        coins::try_coin_operation(self.state, name, mv, self.ctx);

        // Everything below requires an initialised account.
        if self
            .state
            .accounts
            .get(name)
            .map_or(true, |a| a.faction.is_none())
        {
            return;
        }

        self.try_character_creation(name, mv);
        self.try_character_updates(name, mv);
        self.try_trade_operations(name, mv);
        self.try_service_operations(name, mv);
    }

    /* ******************************************************************** */
    /* Admin commands.                                                      */

    /// God-mode commands for integration testing; regtest only.
    fn handle_god_mode(&mut self, cmd: &Value) {
        let Some(god) = cmd.get("god") else {
            return;
        };
        if self.ctx.chain != Chain::Regtest {
            tracing::warn!("ignoring god-mode command outside regtest");
            return;
        }

        if let Some(teleport) = god.get("teleport").and_then(Value::as_object) {
            let mut entries: Vec<(&String, &Value)> = teleport.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (id_str, coord) in entries {
                let (Ok(id), Some(pos)) = (id_str.parse::<IdT>(), parse_coord(coord)) else {
                    continue;
                };
                let Some(c) = self.state.characters.get_mut(&id) else {
                    continue;
                };
                if let Some(old) = c.pos {
                    self.dyn_obstacles.remove_vehicle(old, c.faction);
                }
                c.pos = Some(pos);
                c.in_building = None;
                self.dyn_obstacles.add_vehicle(pos, c.faction);
            }
        }

        if let Some(sethp) = god.get("sethp").and_then(Value::as_object) {
            let mut entries: Vec<(&String, &Value)> = sethp.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (id_str, hp) in entries {
                let Ok(id) = id_str.parse::<IdT>() else {
                    continue;
                };
                let Some(c) = self.state.characters.get_mut(&id) else {
                    continue;
                };
                if let Some(a) = hp.get("a").and_then(Value::as_u64) {
                    c.hp.armour = (a as u32).min(c.max_hp.armour);
                }
                if let Some(s) = hp.get("s").and_then(Value::as_u64) {
                    c.hp.shield = (s as u32).min(c.max_hp.shield);
                }
            }
        }

        if let Some(gift) = god.get("giftcoins").and_then(Value::as_object) {
            let mut entries: Vec<(&String, &Value)> = gift.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (account, amount) in entries {
                if let Some(amount) = amount.as_i64().filter(|a| *a > 0) {
                    self.state.account_mut(account).balance += amount;
                }
            }
        }
    }

    /* ******************************************************************** */
    /* Account-level moves.                                                 */

    fn maybe_init_account(&mut self, name: &str, mv: &Value) {
        let Some(faction_str) = mv
            .get("a")
            .and_then(|a| a.get("faction"))
            .and_then(Value::as_str)
        else {
            return;
        };
        let Some(faction) = Faction::from_move_str(faction_str) else {
            tracing::debug!(name, faction_str, "invalid faction choice");
            return;
        };

        let account = self.state.account_mut(name);
        if account.faction.is_some() {
            tracing::debug!(name, "account already initialised");
            return;
        }
        account.faction = Some(faction);
        tracing::debug!(name, ?faction, "account initialised");
    }

    fn try_character_creation(&mut self, name: &str, mv: &Value) {
        let Some(creations) = mv.get("nc").and_then(Value::as_array) else {
            return;
        };
        let faction = self.state.accounts[name]
            .faction
            .expect("caller checked initialisation");

        for entry in creations {
            let Some(vehicle) = entry.get("v").and_then(Value::as_str) else {
                continue;
            };
            if self
                .ctx
                .config
                .item(vehicle)
                .and_then(|i| i.vehicle.as_ref())
                .is_none()
            {
                tracing::debug!(name, vehicle, "not a vehicle type");
                continue;
            }
            if self.state.character_count(name) >= self.ctx.params().character_limit {
                tracing::debug!(name, "character limit reached");
                continue;
            }
            let cost = self.ctx.params().character_cost;
            if self.state.accounts[name].balance < cost {
                tracing::debug!(name, "cannot afford a character");
                continue;
            }
            self.state.account_mut(name).balance -= cost;
            if spawn_character(
                self.state,
                self.dyn_obstacles,
                self.rnd,
                self.ctx,
                name,
                faction,
                vehicle,
            )
            .is_none()
            {
                // No free spawn spot; the payment stands, matching the
                // all-or-nothing-per-command rule for everything else
                // would allow probing spawn congestion for free.
                tracing::warn!(name, "character creation found no spawn spot");
            }
        }
    }

    /* ******************************************************************** */
    /* Character updates.                                                   */

    fn try_character_updates(&mut self, name: &str, mv: &Value) {
        let Some(updates) = mv.get("c").and_then(Value::as_object) else {
            return;
        };

        // JSON object order is not consensus-safe; process ascending ids.
        let mut ids: Vec<(IdT, &Value)> = updates
            .iter()
            .filter_map(|(k, v)| k.parse::<IdT>().ok().map(|id| (id, v)))
            .collect();
        ids.sort_by_key(|(id, _)| *id);

        for (id, upd) in ids {
            match self.state.characters.get(&id) {
                Some(c) if c.owner == name => {}
                _ => {
                    tracing::debug!(name, character = id, "update for foreign or unknown character");
                    continue;
                }
            }
            if !upd.is_object() {
                continue;
            }
            self.perform_character_update(id, upd);
        }
    }

    fn perform_character_update(&mut self, id: IdT, upd: &Value) {
        self.maybe_transfer_character(id, upd);
        self.maybe_exit_building(id, upd);
        self.maybe_enter_building(id, upd);
        self.maybe_start_prospecting(id, upd);
        self.maybe_start_mining(id, upd);
        self.maybe_set_fitments(id, upd);
        self.maybe_change_vehicle(id, upd);
        self.maybe_found_building(id, upd);
        self.maybe_set_waypoints(id, upd);
        self.maybe_drop_loot(id, upd);
        self.maybe_pickup_loot(id, upd);
    }

    fn maybe_transfer_character(&mut self, id: IdT, upd: &Value) {
        let Some(recipient) = upd.get("xf").and_then(Value::as_str) else {
            return;
        };
        let faction = self.state.characters[&id].faction;
        let valid = self
            .state
            .accounts
            .get(recipient)
            .is_some_and(|a| a.faction == Some(faction))
            && self.state.character_count(recipient) < self.ctx.params().character_limit;
        if !valid {
            tracing::debug!(character = id, recipient, "invalid character transfer");
            return;
        }
        self.state.characters.get_mut(&id).unwrap().owner = recipient.to_owned();
        tracing::debug!(character = id, recipient, "character transferred");
    }

    fn maybe_exit_building(&mut self, id: IdT, upd: &Value) {
        if upd.get("x").and_then(Value::as_bool) != Some(true) {
            return;
        }
        let (building_id, busy) = {
            let c = &self.state.characters[&id];
            (c.in_building, c.is_busy())
        };
        let Some(building_id) = building_id else {
            return;
        };
        if busy {
            return;
        }
        let Some(b) = self.state.buildings.get(&building_id) else {
            panic!("character {id} is inside non-existing building {building_id}");
        };
        let Some(spot) = crate::buildings::find_exit_spot(b, self.dyn_obstacles, self.ctx)
        else {
            tracing::debug!(character = id, "no free spot to exit onto");
            return;
        };
        let c = self.state.characters.get_mut(&id).unwrap();
        c.in_building = None;
        c.pos = Some(spot);
        let faction = c.faction;
        self.dyn_obstacles.add_vehicle(spot, faction);
        tracing::debug!(character = id, %spot, "character exited building");
    }

    fn maybe_enter_building(&mut self, id: IdT, upd: &Value) {
        let Some(enter) = upd.get("e") else {
            return;
        };
        if enter.is_null() {
            self.state.characters.get_mut(&id).unwrap().enter_building = None;
            return;
        }
        let Some(building_id) = enter.as_u64() else {
            return;
        };
        let (on_map, faction) = {
            let c = &self.state.characters[&id];
            (c.pos.is_some(), c.faction)
        };
        if !on_map {
            return;
        }
        let valid = self.state.buildings.get(&building_id).is_some_and(|b| {
            !b.foundation && (b.faction == Faction::Ancient || b.faction == faction)
        });
        if !valid {
            tracing::debug!(character = id, building = building_id, "invalid enter target");
            return;
        }
        self.state.characters.get_mut(&id).unwrap().enter_building = Some(building_id);
    }

    fn maybe_start_prospecting(&mut self, id: IdT, upd: &Value) {
        if upd.get("prospect").and_then(Value::as_bool) != Some(true) {
            return;
        }
        let (pos, busy, can_prospect) = {
            let c = &self.state.characters[&id];
            let can = self
                .ctx
                .config
                .item(&c.vehicle)
                .and_then(|i| i.vehicle.as_ref())
                .is_some_and(|v| v.can_prospect);
            (c.pos, c.is_busy(), can)
        };
        let Some(pos) = pos else {
            return;
        };
        if busy || !can_prospect {
            tracing::debug!(character = id, "cannot prospect");
            return;
        }

        let region_id = self.ctx.map.region_id(pos);
        let region = self.state.regions.get(&region_id).cloned().unwrap_or_default();
        if !can_prospect_region(&region, self.ctx) {
            tracing::debug!(character = id, region = region_id, "region cannot be prospected");
            return;
        }

        let blocks = self.ctx.params().prospecting_blocks;
        let op = self.state.create_ongoing(
            self.ctx.height + blocks,
            Some(id),
            None,
            OngoingKind::Prospection { region: region_id },
        );
        self.state.region_mut(region_id).prospecting_character = Some(id);
        let c = self.state.characters.get_mut(&id).unwrap();
        stop_character(c);
        c.busy_blocks = blocks as u32;
        c.ongoing = Some(op);
        stop_mining(self.state, id);
        tracing::debug!(character = id, region = region_id, "prospecting started");
    }

    fn maybe_start_mining(&mut self, id: IdT, upd: &Value) {
        if upd.get("mine").and_then(Value::as_bool) != Some(true) {
            return;
        }
        let (pos, busy, moving, has_rig) = {
            let c = &self.state.characters[&id];
            (c.pos, c.is_busy(), c.is_moving(), c.mining.is_some())
        };
        let Some(pos) = pos else {
            return;
        };
        if busy || moving || !has_rig {
            tracing::debug!(character = id, "cannot start mining");
            return;
        }
        let region_id = self.ctx.map.region_id(pos);
        let minable = self
            .state
            .regions
            .get(&region_id)
            .is_some_and(|r| r.prospection.is_some() && r.resource_left > 0);
        if !minable {
            tracing::debug!(character = id, region = region_id, "nothing to mine here");
            return;
        }
        self.state
            .characters
            .get_mut(&id)
            .unwrap()
            .mining
            .as_mut()
            .expect("checked above")
            .active = true;
        tracing::debug!(character = id, region = region_id, "mining started");
    }

    fn maybe_set_fitments(&mut self, id: IdT, upd: &Value) {
        let Some(list) = upd.get("fit").and_then(Value::as_array) else {
            return;
        };
        let fitments: Vec<String> = list
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
        if fitments.len() != list.len() {
            return;
        }

        let (building_id, owner, faction, vehicle, old_fitments, busy) = {
            let c = &self.state.characters[&id];
            (
                c.in_building,
                c.owner.clone(),
                c.faction,
                c.vehicle.clone(),
                c.fitments.clone(),
                c.is_busy(),
            )
        };
        let Some(building_id) = building_id else {
            tracing::debug!(character = id, "fitments can only change inside a building");
            return;
        };
        if busy || !check_vehicle_fitments(&vehicle, &fitments, faction, self.ctx.config) {
            return;
        }

        // The new fitments must be covered by the account's deposit plus
        // whatever comes off the vehicle.
        let mut pool = self.state.building_inventory_mut(building_id, &owner).clone();
        for f in &old_fitments {
            pool.add(f, 1);
        }
        for f in &fitments {
            if pool.count(f) < 1 {
                tracing::debug!(character = id, fitment = %f, "fitment not available");
                return;
            }
            pool.add(f, -1);
        }

        *self.state.building_inventory_mut(building_id, &owner) = pool;
        let c = self.state.characters.get_mut(&id).unwrap();
        c.fitments = fitments;
        derive_character_stats(c, self.ctx.config);
        tracing::debug!(character = id, "fitments changed");
    }

    fn maybe_change_vehicle(&mut self, id: IdT, upd: &Value) {
        let Some(vehicle) = upd.get("v").and_then(Value::as_str) else {
            return;
        };
        let (building_id, owner, old_vehicle, old_fitments, busy) = {
            let c = &self.state.characters[&id];
            (c.in_building, c.owner.clone(), c.vehicle.clone(), c.fitments.clone(), c.is_busy())
        };
        let Some(building_id) = building_id else {
            tracing::debug!(character = id, "vehicle change only inside a building");
            return;
        };
        if busy
            || self
                .ctx
                .config
                .item(vehicle)
                .and_then(|i| i.vehicle.as_ref())
                .is_none()
        {
            return;
        }
        if self
            .state
            .building_inventory_mut(building_id, &owner)
            .count(vehicle)
            < 1
        {
            tracing::debug!(character = id, vehicle, "vehicle not in deposit");
            return;
        }

        // Old vehicle and all fitments go back into the deposit.
        let inv = self.state.building_inventory_mut(building_id, &owner);
        inv.add(vehicle, -1);
        inv.add(&old_vehicle, 1);
        for f in &old_fitments {
            inv.add(f, 1);
        }

        let c = self.state.characters.get_mut(&id).unwrap();
        c.vehicle = vehicle.to_owned();
        c.fitments.clear();
        derive_character_stats(c, self.ctx.config);
        tracing::debug!(character = id, vehicle, "vehicle changed");
    }

    fn maybe_found_building(&mut self, id: IdT, upd: &Value) {
        let Some(found) = upd.get("found") else {
            return;
        };
        let Some(typ) = found.get("t").and_then(Value::as_str) else {
            return;
        };
        let rotation = found.get("rot").and_then(Value::as_u64).unwrap_or(0);
        if rotation >= 6 {
            return;
        }

        let (pos, owner, faction, busy) = {
            let c = &self.state.characters[&id];
            (c.pos, c.owner.clone(), c.faction, c.is_busy())
        };
        let Some(pos) = pos else {
            return;
        };
        if busy {
            return;
        }

        let Some(construction) = self
            .ctx
            .config
            .building(typ)
            .and_then(|d| d.construction.as_ref())
        else {
            tracing::debug!(character = id, typ, "building type is not constructible");
            return;
        };
        if !crate::buildings::can_place_building(
            typ,
            pos,
            rotation as u32,
            pos,
            self.dyn_obstacles,
            self.ctx,
        ) {
            tracing::debug!(character = id, typ, "cannot place building here");
            return;
        }

        // The founder must carry the full material set; it moves into
        // the foundation's construction inventory.
        let materials = construction.materials.clone();
        {
            let c = &self.state.characters[&id];
            for (item, needed) in &materials {
                if c.inventory.count(item) < *needed as i64 {
                    tracing::debug!(character = id, item = %item, "missing construction material");
                    return;
                }
            }
        }

        let building_id =
            self.state
                .create_building(typ, Some(owner.as_str()), faction, pos, rotation as u32);
        {
            let b = self.state.buildings.get_mut(&building_id).unwrap();
            b.foundation = true;
            crate::buildings::update_building_stats(b, self.ctx.config);
        }
        let c = self.state.characters.get_mut(&id).unwrap();
        for (item, needed) in &materials {
            c.inventory.add(item, -(*needed as i64));
        }
        let b = &self.state.buildings[&building_id];
        self.dyn_obstacles
            .add_building_tiles(crate::buildings::building_tiles(b, self.ctx.config));
        tracing::debug!(character = id, building = building_id, typ, "foundation placed");
    }

    fn maybe_set_waypoints(&mut self, id: IdT, upd: &Value) {
        let Some(wp) = upd.get("wp") else {
            // A lone speed update adjusts the current movement.
            if let Some(speed) = upd.get("speed").and_then(Value::as_u64) {
                self.maybe_set_chosen_speed(id, speed);
            }
            return;
        };

        let (on_map, busy) = {
            let c = &self.state.characters[&id];
            (c.pos.is_some(), c.is_busy())
        };
        if !on_map || busy {
            return;
        }

        if wp.is_null() {
            stop_character(self.state.characters.get_mut(&id).unwrap());
            return;
        }
        let Some(list) = wp.as_array() else {
            return;
        };
        if list.len() > MAX_WAYPOINTS {
            tracing::debug!(character = id, "too many waypoints");
            return;
        }
        let mut waypoints = std::collections::VecDeque::new();
        for coord in list {
            let Some(c) = parse_coord(coord) else {
                tracing::debug!(character = id, "malformed waypoint");
                return;
            };
            waypoints.push_back(c);
        }
        if waypoints.is_empty() {
            stop_character(self.state.characters.get_mut(&id).unwrap());
            return;
        }

        let c = self.state.characters.get_mut(&id).unwrap();
        c.movement = Some(Movement {
            waypoints,
            steps: std::collections::VecDeque::new(),
            chosen_speed: None,
        });
        c.volatile_mv = Default::default();
        stop_mining(self.state, id);

        if let Some(speed) = upd.get("speed").and_then(Value::as_u64) {
            self.maybe_set_chosen_speed(id, speed);
        }
    }

    fn maybe_set_chosen_speed(&mut self, id: IdT, speed: u64) {
        if speed == 0 || speed > u64::from(self.ctx.params().max_chosen_speed) {
            return;
        }
        let c = self.state.characters.get_mut(&id).unwrap();
        if let Some(m) = &mut c.movement {
            m.chosen_speed = Some(speed as u32);
        }
    }

    /// Parse the fungible-item map of a drop or pick-up command.
    fn parse_fungible(&self, cmd: &Value) -> Option<Vec<(String, i64)>> {
        let map = cmd.get("f")?.as_object()?;
        let mut entries: Vec<(String, i64)> = Vec::new();
        for (item, amount) in map {
            let amount = amount.as_i64()?;
            if !(1..=MAX_ITEM_QUANTITY).contains(&amount) {
                return None;
            }
            if self.ctx.config.item(item).is_none() {
                return None;
            }
            entries.push((item.clone(), amount));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Some(entries)
    }

    fn maybe_drop_loot(&mut self, id: IdT, upd: &Value) {
        let Some(cmd) = upd.get("drop") else {
            return;
        };
        let Some(entries) = self.parse_fungible(cmd) else {
            return;
        };

        let (pos, building, owner) = {
            let c = &self.state.characters[&id];
            (c.pos, c.in_building, c.owner.clone())
        };
        for (item, amount) in entries {
            let held = self.state.characters[&id].inventory.count(&item);
            let amount = amount.min(held);
            if amount <= 0 {
                continue;
            }
            self.state
                .characters
                .get_mut(&id)
                .unwrap()
                .inventory
                .add(&item, -amount);
            match (pos, building) {
                (Some(pos), None) => self.state.loot_mut(pos).add(&item, amount),
                (None, Some(b)) => {
                    self.state.building_inventory_mut(b, &owner).add(&item, amount);
                }
                _ => unreachable!("character is either on the map or inside"),
            }
        }
    }

    fn maybe_pickup_loot(&mut self, id: IdT, upd: &Value) {
        let Some(cmd) = upd.get("pu") else {
            return;
        };
        let Some(entries) = self.parse_fungible(cmd) else {
            return;
        };

        let (pos, building, owner) = {
            let c = &self.state.characters[&id];
            (c.pos, c.in_building, c.owner.clone())
        };
        for (item, amount) in entries {
            let available = match (pos, building) {
                (Some(pos), None) => self
                    .state
                    .ground_loot
                    .get(&pos)
                    .map_or(0, |inv| inv.count(&item)),
                (None, Some(b)) => self
                    .state
                    .building_inventories
                    .get(&(b, owner.clone()))
                    .map_or(0, |inv| inv.count(&item)),
                _ => unreachable!("character is either on the map or inside"),
            };

            let space = self.ctx.config.item(&item).map_or(0, |i| i.space);
            let mut amount = amount.min(available);
            if space > 0 {
                let free = self.state.characters[&id].free_cargo_space(self.ctx.config);
                amount = amount.min((free / space) as i64);
            }
            if amount <= 0 {
                continue;
            }

            match (pos, building) {
                (Some(pos), None) => self.state.loot_mut(pos).add(&item, -amount),
                (None, Some(b)) => self
                    .state
                    .building_inventory_mut(b, &owner)
                    .add(&item, -amount),
                _ => unreachable!(),
            }
            self.state
                .characters
                .get_mut(&id)
                .unwrap()
                .inventory
                .add(&item, amount);
        }
    }

    /* ******************************************************************** */
    /* Trade and service operations.                                        */

    fn try_trade_operations(&mut self, name: &str, mv: &Value) {
        let Some(ops) = mv.get("trade").and_then(Value::as_array) else {
            return;
        };
        for op in ops {
            match op.get("op").and_then(Value::as_str) {
                Some("cancel") => {
                    if let Some(order_id) = op.get("id").and_then(Value::as_u64) {
                        trading::cancel_order(self.state, name, order_id);
                    }
                }
                Some(side @ ("bid" | "ask")) => {
                    let (Some(building), Some(item), Some(n), Some(p)) = (
                        op.get("b").and_then(Value::as_u64),
                        op.get("i").and_then(Value::as_str),
                        op.get("n").and_then(Value::as_i64),
                        op.get("p").and_then(Value::as_i64),
                    ) else {
                        continue;
                    };
                    let side = if side == "bid" { OrderSide::Bid } else { OrderSide::Ask };
                    trading::place_order(self.state, building, name, side, item, n, p);
                }
                _ => {}
            }
        }
    }

    fn try_service_operations(&mut self, name: &str, mv: &Value) {
        let Some(ops) = mv.get("s").and_then(Value::as_array) else {
            return;
        };
        for op in ops {
            services::try_service_operation(self.state, name, op, self.ctx);
        }
    }
}

/// Parse a `[x, y]` coordinate pair.
fn parse_coord(v: &Value) -> Option<HexCoord> {
    let arr = v.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    let x = arr[0].as_i64()?;
    let y = arr[1].as_i64()?;
    let x = CoordT::try_from(x).ok()?;
    let y = CoordT::try_from(y).ok()?;
    Some(HexCoord::new(x, y))
}
