//! Combat resolution: target acquisition, damage dealing, kill
//! processing and regeneration.
//!
//! Damage dealing is built so that its outputs never depend on the order
//! fighters are processed in: all combat modifiers are snapshotted before
//! any HP changes, HP-drain attacks reconcile across all attackers, and
//! effects accumulate on the side and are swapped in atomically at the
//! end of the phase.

use std::collections::{BTreeMap, BTreeSet};

use crate::components::{
    Attack, AttackDamage, CombatData, CombatEffects, Faction, HpPair, TargetKey, TargetKind,
};
use crate::context::Context;
use crate::fame;
use crate::hex::{CoordT, HexCoord};
use crate::inventory::Inventory;
use crate::modifier::StatModifier;
use crate::rnd::Random;
use crate::world::{IdT, OngoingKind, WorldState};

/// Chance (percent) that an inventory position inside a destroyed
/// building drops on the ground instead of being destroyed.
pub const BUILDING_INVENTORY_DROP_PERCENT: u32 = 30;

/// Chance (percent) that an equipped fitment of a destroyed character is
/// dropped as loot rather than destroyed.
pub const EQUIPPED_FITMENT_DROP_PERCENT: u32 = 20;

/// Snapshot of the combat-stat modifiers of one fighter.
#[derive(Debug, Clone, Default)]
struct CombatModifier {
    damage: StatModifier,
    range: StatModifier,
    hit_chance: StatModifier,
}

/* ************************************************************************** */
/* Fighter access helpers.                                                    */

fn combat_data(state: &WorldState, k: TargetKey) -> &CombatData {
    match k.kind {
        TargetKind::Character => &state.characters[&k.id].combat,
        TargetKind::Building => &state.buildings[&k.id].combat,
    }
}

fn combat_position(state: &WorldState, k: TargetKey) -> HexCoord {
    match k.kind {
        TargetKind::Character => state.characters[&k.id]
            .pos
            .expect("fighters are on the map"),
        TargetKind::Building => state.buildings[&k.id].centre,
    }
}

fn fighter_faction(state: &WorldState, k: TargetKey) -> Faction {
    match k.kind {
        TargetKind::Character => state.characters[&k.id].faction,
        TargetKind::Building => state.buildings[&k.id].faction,
    }
}

fn fighter_hp(state: &WorldState, k: TargetKey) -> crate::components::HP {
    match k.kind {
        TargetKind::Character => state.characters[&k.id].hp,
        TargetKind::Building => state.buildings[&k.id].hp,
    }
}

fn fighter_hp_mut(state: &mut WorldState, k: TargetKey) -> &mut crate::components::HP {
    match k.kind {
        TargetKind::Character => &mut state.characters.get_mut(&k.id).unwrap().hp,
        TargetKind::Building => &mut state.buildings.get_mut(&k.id).unwrap().hp,
    }
}

fn fighter_max_hp(state: &WorldState, k: TargetKey) -> HpPair {
    match k.kind {
        TargetKind::Character => state.characters[&k.id].max_hp,
        TargetKind::Building => state.buildings[&k.id].max_hp,
    }
}

fn fighter_effects(state: &WorldState, k: TargetKey) -> &CombatEffects {
    match k.kind {
        TargetKind::Character => &state.characters[&k.id].effects,
        TargetKind::Building => &state.buildings[&k.id].effects,
    }
}

fn fighter_target(state: &WorldState, k: TargetKey) -> Option<TargetKey> {
    match k.kind {
        TargetKind::Character => state.characters[&k.id].target,
        TargetKind::Building => state.buildings[&k.id].target,
    }
}

fn fighter_friendly_targets(state: &WorldState, k: TargetKey) -> bool {
    match k.kind {
        TargetKind::Character => state.characters[&k.id].friendly_targets,
        TargetKind::Building => state.buildings[&k.id].friendly_targets,
    }
}

fn set_fighter_target(
    state: &mut WorldState,
    k: TargetKey,
    target: Option<TargetKey>,
    friendly: bool,
) {
    match k.kind {
        TargetKind::Character => {
            let c = state.characters.get_mut(&k.id).unwrap();
            c.target = target;
            c.friendly_targets = friendly;
        }
        TargetKind::Building => {
            let b = state.buildings.get_mut(&k.id).unwrap();
            b.target = target;
            b.friendly_targets = friendly;
        }
    }
}

/// All fighters in canonical order: characters on the map ascending by
/// id, then buildings ascending by id.
fn fighter_keys(state: &WorldState) -> Vec<TargetKey> {
    let mut keys: Vec<TargetKey> = state
        .characters
        .values()
        .filter(|c| c.pos.is_some())
        .map(|c| TargetKey::character(c.id))
        .collect();
    keys.extend(state.buildings.keys().map(|&id| TargetKey::building(id)));
    keys
}

/* ************************************************************************** */
/* Modifiers and hit chances.                                                 */

/// Compute the modifier snapshot of a fighter from its low-HP boosts,
/// base modifiers and current effects.
fn compute_modifier(state: &WorldState, k: TargetKey) -> CombatModifier {
    let cd = combat_data(state, k);
    let hp = fighter_hp(state, k);
    let max_hp = fighter_max_hp(state, k);
    let effects = fighter_effects(state, k);

    let mut result = CombatModifier::default();
    for boost in &cd.low_hp_boosts {
        // hp / max > p / 100 iff 100 hp > p max.
        if 100 * u64::from(hp.armour) > u64::from(boost.max_hp_percent) * u64::from(max_hp.armour)
        {
            continue;
        }
        result.damage += boost.damage;
        result.range += boost.range;
    }

    result.range += effects.range;
    result.hit_chance += cd.hit_chance_modifier;
    result.hit_chance += effects.hit_chance;
    result
}

/// Base chance (percent) for an attack to hit, from target and weapon
/// size classes.  Unsized targets or weapons always hit.
#[must_use]
pub fn base_hit_chance(target: &CombatData, dmg: &AttackDamage) -> u32 {
    let (Some(target_size), Some(weapon_size)) = (target.target_size, dmg.weapon_size) else {
        return 100;
    };
    if target_size >= weapon_size {
        return 100;
    }
    assert!(target_size > 0 && weapon_size > 0, "sizes must be positive");
    target_size * 100 / weapon_size
}

/// Damage split between shield and armour.
///
/// The base damage is scaled by the shield percentage, deducted from the
/// shield, and the base damage actually used is scaled back and removed
/// before the armour round.  Integer division truncates, so the total
/// damage done never exceeds the roll.  While the shield is not fully
/// exhausted, the armour is untouched.
#[must_use]
pub fn compute_damage_split(dmg: u32, pb: &AttackDamage, hp: &crate::components::HP) -> HpPair {
    let shield_percent = pb.shield_percent.unwrap_or(100);
    let armour_percent = pb.armour_percent.unwrap_or(100);

    let mut done = HpPair::default();
    let mut dmg = u64::from(dmg);

    let available_for_shield = dmg * u64::from(shield_percent) / 100;
    done.shield = available_for_shield.min(u64::from(hp.shield)) as u32;

    assert!(done.shield <= hp.shield);
    if done.shield < hp.shield {
        return done;
    }

    if done.shield > 0 {
        let base_done_shield = u64::from(done.shield) * 100 / u64::from(shield_percent);
        assert!(base_done_shield <= dmg);
        dmg -= base_done_shield;
    }

    let available_for_armour = dmg * u64::from(armour_percent) / 100;
    done.armour = available_for_armour.min(u64::from(hp.armour)) as u32;

    done
}

/* ************************************************************************** */
/* Target finding.                                                            */

/// Collect fighters in L1 range of `centre` matching the friend/foe
/// filter of `attacker`, skipping no-combat tiles and the attacker
/// itself.  A mentecon on the attacker makes everyone count as an enemy.
/// Results come in the canonical fighter order.
fn collect_targets(
    state: &WorldState,
    ctx: &Context,
    attacker: TargetKey,
    centre: HexCoord,
    range: CoordT,
    enemies: bool,
) -> Vec<(HexCoord, TargetKey)> {
    let mentecon = fighter_effects(state, attacker).mentecon;
    let look_for_enemies = enemies || mentecon;
    let look_for_friendlies = !enemies || mentecon;
    let own_faction = fighter_faction(state, attacker);

    fighter_keys(state)
        .into_iter()
        .filter(|&k| k != attacker)
        .filter_map(|k| {
            let pos = combat_position(state, k);
            if HexCoord::distance_l1(centre, pos) > range {
                return None;
            }
            if ctx.map.safe_zones().is_no_combat(pos) {
                return None;
            }
            let friendly = fighter_faction(state, k) == own_faction;
            if (friendly && look_for_friendlies) || (!friendly && look_for_enemies) {
                Some((pos, k))
            } else {
                None
            }
        })
        .collect()
}

/// The target-acquisition phase.
///
/// Every fighter with any attack and outside no-combat zones searches
/// the L1 ball of its modified attack range.  Among the closest enemies
/// one is picked uniformly at random; independently a flag records
/// whether any friendly is in range of a friendly-area attack.
pub fn find_combat_targets(state: &mut WorldState, rnd: &mut Random, ctx: &Context) {
    for k in fighter_keys(state) {
        let cd = combat_data(state, k);
        if cd.attack_range(false).is_none() && cd.attack_range(true).is_none() {
            continue;
        }

        let pos = combat_position(state, k);
        if ctx.map.safe_zones().is_no_combat(pos) {
            set_fighter_target(state, k, None, false);
            continue;
        }

        let modifier = compute_modifier(state, k);

        let mut enemy_targets: Vec<TargetKey> = Vec::new();
        if let Some(base_range) = combat_data(state, k).attack_range(false) {
            let range = modifier.range.apply_u32(base_range) as CoordT;
            let mut closest = CoordT::MAX;
            for (target_pos, target) in collect_targets(state, ctx, k, pos, range, true) {
                let dist = HexCoord::distance_l1(pos, target_pos);
                if dist < closest {
                    closest = dist;
                    enemy_targets.clear();
                }
                if dist == closest {
                    enemy_targets.push(target);
                }
            }
        }

        let mut has_friendly = false;
        if let Some(base_range) = combat_data(state, k).attack_range(true) {
            let range = modifier.range.apply_u32(base_range) as CoordT;
            has_friendly = !collect_targets(state, ctx, k, pos, range, false).is_empty();
        }

        let target = if enemy_targets.is_empty() {
            None
        } else {
            let ind = rnd.next_int(enemy_targets.len() as u32) as usize;
            Some(enemy_targets[ind])
        };
        set_fighter_target(state, k, target, has_friendly);
    }
}

/* ************************************************************************** */
/* Damage dealing.                                                            */

/// Working state of one damage-dealing phase.
struct DamageProcessor<'a, 'ctx> {
    state: &'a mut WorldState,
    rnd: &'a mut Random,
    ctx: &'a Context<'ctx>,
    /// Modifier snapshots captured before any HP changes, so processing
    /// order never influences low-HP boosts.
    modifiers: BTreeMap<TargetKey, CombatModifier>,
    /// Effects accumulated this round, swapped in at the very end.
    new_effects: BTreeMap<TargetKey, CombatEffects>,
    /// HP drained per (target, attacker) by gain-HP attacks.
    gain_hp_drained: BTreeMap<TargetKey, BTreeMap<TargetKey, HpPair>>,
    /// Everything killed in earlier self-destruct rounds.
    already_dead: BTreeSet<TargetKey>,
}

impl<'a, 'ctx> DamageProcessor<'a, 'ctx> {
    fn new(state: &'a mut WorldState, rnd: &'a mut Random, ctx: &'a Context<'ctx>) -> Self {
        Self {
            state,
            rnd,
            ctx,
            modifiers: BTreeMap::new(),
            new_effects: BTreeMap::new(),
            gain_hp_drained: BTreeMap::new(),
            already_dead: BTreeSet::new(),
        }
    }

    /// Fighters participating in damage dealing, in canonical order.
    fn attackers(&self) -> Vec<TargetKey> {
        fighter_keys(self.state)
            .into_iter()
            .filter(|&k| {
                fighter_target(self.state, k).is_some()
                    || fighter_friendly_targets(self.state, k)
            })
            .collect()
    }

    fn roll_attack_damage(&mut self, dmg: &AttackDamage, modifier: &StatModifier) -> u32 {
        let min = modifier.apply_u32(dmg.min);
        let max = modifier.apply_u32(dmg.max);
        assert!(min <= max, "damage range inverted after modifiers");
        min + self.rnd.next_int(max - min + 1)
    }

    fn attack_hits_target(
        &mut self,
        target: TargetKey,
        dmg: &AttackDamage,
        hit_modifier: &StatModifier,
    ) -> bool {
        let chance = base_hit_chance(combat_data(self.state, target), dmg);
        let chance = hit_modifier.apply(i64::from(chance));

        // No roll at all for certain misses or certain hits.
        if chance <= 0 {
            return false;
        }
        if chance >= 100 {
            return true;
        }
        self.rnd.probability_roll(chance as u32, 100)
    }

    /// Apply a fixed damage amount to a target; the low-level variant
    /// without gain-HP handling.  Returns the damage actually done.
    fn apply_damage_raw(
        &mut self,
        dmg: u32,
        attacker: TargetKey,
        pb: &AttackDamage,
        attacker_mod: &CombatModifier,
        target: TargetKey,
        new_dead: &mut BTreeSet<TargetKey>,
    ) -> HpPair {
        assert!(
            !self
                .ctx
                .map
                .safe_zones()
                .is_no_combat(combat_position(self.state, target)),
            "damage aimed into a safe zone"
        );

        // Dead from a previous self-destruct round: nothing happens, not
        // even a hit roll.
        if self.already_dead.contains(&target) {
            return HpPair::default();
        }

        if !self.attack_hits_target(target, pb, &attacker_mod.hit_chance) {
            return HpPair::default();
        }

        let recv_mod = combat_data(self.state, target).received_damage_modifier;
        let dmg = recv_mod.apply(i64::from(dmg)) as u32;
        if dmg == 0 {
            return HpPair::default();
        }

        if attacker.kind == TargetKind::Character && target.kind == TargetKind::Character {
            self.state
                .damage_lists
                .add_entry(target.id, attacker.id, self.ctx.height);
        }

        let hp = fighter_hp(self.state, target);
        let done = compute_damage_split(dmg, pb, &hp);

        let hp = fighter_hp_mut(self.state, target);
        hp.shield -= done.shield;
        hp.armour -= done.armour;

        if !done.is_zero() && hp.total() == 0 {
            // Partial HP are ignored on death, but must never be full.
            assert!(hp.mhp.shield < 1_000 && hp.mhp.armour < 1_000);
            assert!(new_dead.insert(target), "target already in new_dead");
        }

        done
    }

    /// Apply damage for a real attack, recording drained HP for gain-HP
    /// attacks.
    fn apply_damage(
        &mut self,
        dmg: u32,
        attacker: TargetKey,
        attack: &Attack,
        attacker_mod: &CombatModifier,
        target: TargetKey,
        new_dead: &mut BTreeSet<TargetKey>,
    ) {
        let pb = attack
            .damage
            .clone()
            .unwrap_or(AttackDamage {
                min: 0,
                max: 0,
                weapon_size: None,
                shield_percent: None,
                armour_percent: None,
            });
        let done = self.apply_damage_raw(dmg, attacker, &pb, attacker_mod, target, new_dead);

        if attack.gain_hp && !done.is_zero() {
            let drained = self
                .gain_hp_drained
                .entry(target)
                .or_default()
                .entry(attacker)
                .or_default();
            drained.armour += done.armour;
            drained.shield += done.shield;
        }
    }

    /// Accumulate the effects of an attack on a target.
    fn apply_effects(&mut self, attack: &Attack, target: TargetKey) {
        let Some(effects) = &attack.effects else {
            return;
        };
        let entry = self.new_effects.entry(target).or_default();
        if let Some(m) = effects.speed {
            entry.speed += m;
        }
        if let Some(m) = effects.range {
            entry.range += m;
        }
        if let Some(m) = effects.hit_chance {
            entry.hit_chance += m;
        }
        if let Some(m) = effects.shield_regen {
            entry.shield_regen += m;
        }
        if effects.mentecon {
            entry.mentecon = true;
        }
    }

    /// Deal all damage of one fighter, restricted to attacks whose
    /// gain-HP flag matches `for_gain_hp`.
    fn deal_damage(&mut self, k: TargetKey, for_gain_hp: bool, new_dead: &mut BTreeSet<TargetKey>) {
        let cd = combat_data(self.state, k).clone();
        let pos = combat_position(self.state, k);
        assert!(
            !self.ctx.map.safe_zones().is_no_combat(pos),
            "attacker in a safe zone"
        );

        // A fighter with only friendly attacks can get here without a
        // proper target; those attacks have an area and no range.
        let target = fighter_target(self.state, k);
        let (target_pos, target_dist) = match target {
            Some(t) => {
                let p = combat_position(self.state, t);
                (Some(p), HexCoord::distance_l1(pos, p))
            }
            None => {
                assert!(fighter_friendly_targets(self.state, k));
                (None, CoordT::MAX)
            }
        };

        let modifier = self.modifiers[&k].clone();

        for attack in cd.attacks.iter().filter(|a| a.gain_hp == for_gain_hp) {
            if let Some(range) = attack.range {
                if target.is_none() {
                    continue;
                }
                if target_dist > modifier.range.apply_u32(range) as CoordT {
                    continue;
                }
            }

            let dmg = match &attack.damage {
                Some(d) => self.roll_attack_damage(d, &modifier.damage),
                None => 0,
            };

            if let Some(area) = attack.area {
                let centre = if attack.range.is_some() {
                    target_pos.expect("ranged area attack needs a target")
                } else {
                    pos
                };
                let area = modifier.range.apply_u32(area) as CoordT;
                let affected =
                    collect_targets(self.state, self.ctx, k, centre, area, !attack.friendlies);
                for (_, t) in affected {
                    self.apply_damage(dmg, k, attack, &modifier, t, new_dead);
                    self.apply_effects(attack, t);
                }
            } else {
                assert!(!attack.friendlies, "friendly attacks are area attacks");
                let t = target.expect("non-area attack needs a target");
                self.apply_damage(dmg, k, attack, &modifier, t, new_dead);
                self.apply_effects(attack, t);
            }
        }
    }

    /// Run all self-destructs of a freshly killed fighter.
    fn process_self_destructs(&mut self, k: TargetKey, new_dead: &mut BTreeSet<TargetKey>) {
        let pos = combat_position(self.state, k);
        let hp = fighter_hp(self.state, k);
        assert_eq!(hp.armour, 0);
        assert_eq!(hp.shield, 0);

        // The dead fighter is at zero HP, so all its low-HP boosts apply.
        let modifier = compute_modifier(self.state, k);
        let self_destructs = combat_data(self.state, k).self_destructs.clone();

        for sd in &self_destructs {
            let dmg = self.roll_attack_damage(&sd.damage, &modifier.damage);
            let area = modifier.range.apply_u32(sd.area) as CoordT;
            let affected = collect_targets(self.state, self.ctx, k, pos, area, true);
            for (_, t) in affected {
                self.apply_damage_raw(dmg, k, &sd.damage, &modifier, t, new_dead);
            }
        }
    }

    /// The full damage phase.
    fn process(&mut self) {
        for k in self.attackers() {
            let modifier = compute_modifier(self.state, k);
            assert!(self.modifiers.insert(k, modifier).is_none());
        }

        let mut new_dead: BTreeSet<TargetKey> = BTreeSet::new();

        // Gain-HP attacks first, so normal attacks do not strip the
        // shields before a syphon can drain them.
        for k in self.attackers() {
            self.deal_damage(k, true, &mut new_dead);
        }

        // Reconcile drained HP now, before normal attacks may bring
        // shields to zero: an attacker is credited only if the target
        // still has HP of the type left or it was the sole drainer.
        let mut gained: BTreeMap<TargetKey, HpPair> = BTreeMap::new();
        for (target, drains) in &self.gain_hp_drained {
            assert!(!drains.is_empty());
            let target_hp = fighter_hp(self.state, *target);

            for (attacker, drained) in drains {
                // Only shield drains exist in the game; supporting armour
                // drains as well would make the shield/armour split of
                // ordinary attacks order-dependent.
                assert_eq!(drained.armour, 0, "armour drain is not supported");
                assert!(drained.shield > 0);

                let mut credit = HpPair::default();
                if target_hp.armour > 0 || drains.len() == 1 {
                    credit.armour = drained.armour;
                }
                if target_hp.shield > 0 || drains.len() == 1 {
                    credit.shield = drained.shield;
                }

                if !credit.is_zero() {
                    let entry = gained.entry(*attacker).or_default();
                    entry.armour += credit.armour;
                    entry.shield += credit.shield;
                }
            }
        }

        for k in self.attackers() {
            self.deal_damage(k, false, &mut new_dead);
        }

        // Self-destruct rounds cascade until no new kills appear.
        while !new_dead.is_empty() {
            for k in &new_dead {
                assert!(self.already_dead.insert(*k), "fighter died twice");
            }
            let to_process = std::mem::take(&mut new_dead);
            for k in to_process {
                self.process_self_destructs(k, &mut new_dead);
            }
        }

        // Credit gained HP to surviving attackers only.
        for (k, gain) in &gained {
            if self.already_dead.contains(k) {
                tracing::debug!(?k, "drainer died, not crediting gained HP");
                continue;
            }
            let max = fighter_max_hp(self.state, *k);
            let hp = fighter_hp_mut(self.state, *k);
            hp.armour = (hp.armour + gain.armour).min(max.armour);
            hp.shield = (hp.shield + gain.shield).min(max.shield);
        }

        // Swap effects atomically: clear everything (including characters
        // that meanwhile entered a building), then write back the
        // accumulated round.
        for c in self.state.characters.values_mut() {
            c.effects = CombatEffects::default();
        }
        for b in self.state.buildings.values_mut() {
            b.effects = CombatEffects::default();
        }
        let new_effects = std::mem::take(&mut self.new_effects);
        for (k, effects) in new_effects {
            match k.kind {
                TargetKind::Character => {
                    self.state.characters.get_mut(&k.id).unwrap().effects = effects;
                }
                TargetKind::Building => {
                    self.state.buildings.get_mut(&k.id).unwrap().effects = effects;
                }
            }
        }
    }
}

/// Deal all combat damage for a block and return the set of fighters
/// that died (including self-destruct cascades).
pub fn deal_combat_damage(
    state: &mut WorldState,
    rnd: &mut Random,
    ctx: &Context,
) -> BTreeSet<TargetKey> {
    let mut proc = DamageProcessor::new(state, rnd, ctx);
    proc.process();
    proc.already_dead
}

/* ************************************************************************** */
/* Kill processing.                                                           */

/// Delete a character row and everything referencing it.
fn delete_character(state: &mut WorldState, id: IdT) {
    state.damage_lists.remove_character(id);
    state.delete_ongoings_for_character(id);
    state.characters.remove(&id);
}

fn process_character_kill(state: &mut WorldState, rnd: &mut Random, id: IdT) {
    let c = &state.characters[&id];
    let pos = c.pos.expect("killed characters are on the map");

    // A prospection in progress is cancelled and the region freed.
    let prospected_region = if c.is_busy() {
        let op = &state.ongoings[&c.ongoing.expect("busy characters have an op")];
        match &op.op {
            OngoingKind::Prospection { region } => Some(*region),
            _ => None,
        }
    } else {
        None
    };
    if let Some(region) = prospected_region {
        tracing::debug!(character = id, region, "cancelling prospection of killed character");
        let r = state.regions.get_mut(&region).expect("prospected region exists");
        assert_eq!(r.prospecting_character, Some(id));
        r.prospecting_character = None;
    }

    // Everything carried drops; equipped fitments have a chance to
    // survive as loot.  The vehicle itself is always destroyed.
    let c = &state.characters[&id];
    let mut drops = c.inventory.clone();
    for f in c.fitments.clone() {
        if rnd.probability_roll(EQUIPPED_FITMENT_DROP_PERCENT, 100) {
            drops.add(&f, 1);
        }
    }
    if !drops.is_empty() {
        state.loot_mut(pos).merge(&drops);
    }

    delete_character(state, id);
}

fn process_building_kill(state: &mut WorldState, rnd: &mut Random, id: IdT) {
    // Everything inside the building is pooled: account deposits,
    // characters (with vehicle and fitments), blueprints held by running
    // operations, reserved ask items and the construction inventory.
    let mut total = Inventory::new();

    let deposit_keys: Vec<(IdT, String)> = state
        .building_inventories
        .range((id, String::new())..(id + 1, String::new()))
        .map(|(k, _)| k.clone())
        .collect();
    for key in &deposit_keys {
        let inv = state.building_inventories[key].clone();
        total.merge(&inv);
    }

    for cid in state.characters_in_building(id) {
        let c = &state.characters[&cid];
        total.merge(&c.inventory.clone());
        total.add(&c.vehicle.clone(), 1);
        for f in c.fitments.clone() {
            total.add(&f, 1);
        }
        delete_character(state, cid);
    }

    let op_ids: Vec<IdT> = state
        .ongoings
        .values()
        .filter(|op| op.building_id == Some(id))
        .map(|op| op.id)
        .collect();
    for op_id in op_ids {
        match &state.ongoings[&op_id].op {
            OngoingKind::BlueprintCopy { original_type, .. } => {
                let t = original_type.clone();
                total.add(&t, 1);
            }
            OngoingKind::ItemConstruction { original_type: Some(t), .. } => {
                let t = t.clone();
                total.add(&t, 1);
            }
            _ => {}
        }
    }

    // Coins reserved in bids are refunded; items reserved in asks join
    // the drop pool.
    let order_ids: Vec<IdT> = state
        .orders
        .values()
        .filter(|o| o.building_id == id)
        .map(|o| o.id)
        .collect();
    for oid in &order_ids {
        let order = state.orders[oid].clone();
        match order.side {
            crate::world::OrderSide::Bid => {
                let refund = Inventory::product(order.quantity, order.price);
                state.account_mut(&order.account).balance += refund;
                tracing::debug!(
                    account = %order.account,
                    refund,
                    building = id,
                    "refunded coins for open bid in destroyed building"
                );
            }
            crate::world::OrderSide::Ask => {
                total.add(&order.item, order.quantity);
            }
        }
    }

    let b = &state.buildings[&id];
    let centre = b.centre;
    total.merge(&b.construction_inventory.clone());

    // Each pooled position drops with a fixed chance; the inventory map
    // is ordered by item name, which fixes the order of the rolls.
    let mut dropped = Inventory::new();
    for (item, count) in total.iter() {
        assert!(count > 0);
        if rnd.probability_roll(BUILDING_INVENTORY_DROP_PERCENT, 100) {
            dropped.add(item, count);
        }
    }
    if !dropped.is_empty() {
        state.loot_mut(centre).merge(&dropped);
    }

    for key in deposit_keys {
        state.building_inventories.remove(&key);
    }
    state.delete_ongoings_for_building(id);
    for oid in order_ids {
        state.orders.remove(&oid);
    }
    state.buildings.remove(&id);
}

/// Process all killed fighters, in canonical (type, id) order.
pub fn process_kills(state: &mut WorldState, dead: &BTreeSet<TargetKey>, rnd: &mut Random) {
    for k in dead {
        match k.kind {
            TargetKind::Character => process_character_kill(state, rnd, k.id),
            TargetKind::Building => process_building_kill(state, rnd, k.id),
        }
    }
}

/* ************************************************************************** */
/* Regeneration.                                                              */

/// Advance one HP type by its milli-HP rate.  Returns the new full and
/// partial values.
fn regenerate_hp_type(max: u32, mhp_rate: u32, cur: u32, milli: u32) -> (u32, u32) {
    assert!(cur < max || (cur == max && milli == 0), "HP above maximum");

    let mut new_milli = milli + mhp_rate;
    let mut new_cur = cur + new_milli / 1_000;
    new_milli %= 1_000;

    if new_cur >= max {
        new_cur = max;
        new_milli = 0;
    }
    (new_cur, new_milli)
}

/// The regeneration phase: armour and shield of every fighter advance by
/// their per-block milli-HP rates; the shield rate is modified by the
/// current shield-regen effect.
pub fn regenerate_hp(state: &mut WorldState) {
    let char_ids: Vec<IdT> = state.characters.keys().copied().collect();
    for id in char_ids {
        let c = state.characters.get_mut(&id).unwrap();
        if !c.can_regen() {
            continue;
        }
        let shield_rate = c.effects.shield_regen.apply_u32(c.regen_mhp.shield);
        let (cur, milli) =
            regenerate_hp_type(c.max_hp.armour, c.regen_mhp.armour, c.hp.armour, c.hp.mhp.armour);
        c.hp.armour = cur;
        c.hp.mhp.armour = milli;
        let (cur, milli) =
            regenerate_hp_type(c.max_hp.shield, shield_rate, c.hp.shield, c.hp.mhp.shield);
        c.hp.shield = cur;
        c.hp.mhp.shield = milli;
    }

    let building_ids: Vec<IdT> = state.buildings.keys().copied().collect();
    for id in building_ids {
        let b = state.buildings.get_mut(&id).unwrap();
        if !b.can_regen() {
            continue;
        }
        let shield_rate = b.effects.shield_regen.apply_u32(b.regen_mhp.shield);
        let (cur, milli) =
            regenerate_hp_type(b.max_hp.armour, b.regen_mhp.armour, b.hp.armour, b.hp.mhp.armour);
        b.hp.armour = cur;
        b.hp.mhp.armour = milli;
        let (cur, milli) =
            regenerate_hp_type(b.max_hp.shield, shield_rate, b.hp.shield, b.hp.mhp.shield);
        b.hp.shield = cur;
        b.hp.mhp.shield = milli;
    }
}

/* ************************************************************************** */

/// The coupled HP phase at the start of a block: deal damage, attribute
/// fame, process kills, regenerate.
pub fn all_hp_updates(state: &mut WorldState, rnd: &mut Random, ctx: &Context) {
    let dead = deal_combat_damage(state, rnd, ctx);

    for k in &dead {
        fame::update_for_kill(state, *k);
    }

    process_kills(state, &dead, rnd);
    regenerate_hp(state);
}
