//! Vehicle fitment validation and derived character stats.
//!
//! A character's effective stats are a pure function of its vehicle type
//! and the list of equipped fitments.  They are recomputed from scratch
//! whenever either changes, so no incremental update can drift.

use crate::components::{CombatData, Faction, MiningData};
use crate::config::RoConfig;
use crate::modifier::StatModifier;
use crate::world::Character;

/// Check whether a set of fitments is valid on the given vehicle.
///
/// Validates slot counts, total complexity (taking supported-complexity
/// modifiers of the fitments themselves into account), vehicle size
/// restrictions and faction restrictions.
#[must_use]
pub fn check_vehicle_fitments(
    vehicle: &str,
    fitments: &[String],
    faction: Faction,
    cfg: &RoConfig,
) -> bool {
    let Some(vehicle_item) = cfg.item(vehicle) else {
        return false;
    };
    let Some(vehicle_data) = &vehicle_item.vehicle else {
        return false;
    };

    let mut complexity_mod = StatModifier::default();
    let mut complexity_required: u64 = 0;
    let mut slots_required: std::collections::BTreeMap<&str, u32> = Default::default();

    for f in fitments {
        let Some(item) = cfg.item(f) else {
            return false;
        };
        let Some(fitment) = &item.fitment else {
            return false;
        };

        complexity_required += u64::from(item.complexity);
        *slots_required.entry(fitment.slot.as_str()).or_default() += 1;
        complexity_mod += fitment.complexity;

        if let Some(size) = fitment.vehicle_size {
            if size != vehicle_data.size {
                tracing::debug!(fitment = %f, "fitment does not fit vehicle size");
                return false;
            }
        }
        if let Some(required) = fitment.faction {
            if required != faction {
                tracing::debug!(fitment = %f, "fitment restricted to another faction");
                return false;
            }
        }
    }

    let complexity_available = complexity_mod.apply(i64::from(vehicle_data.complexity));
    if complexity_required > complexity_available as u64 {
        tracing::debug!(
            vehicle,
            complexity_required,
            complexity_available,
            "fitments exceed vehicle complexity"
        );
        return false;
    }

    for (slot, needed) in slots_required {
        let available = vehicle_data.equipment_slots.get(slot).copied().unwrap_or(0);
        if needed > available {
            tracing::debug!(vehicle, slot, needed, available, "not enough fitment slots");
            return false;
        }
    }

    true
}

/// Recompute all derived stats of a character from its vehicle and
/// fitments.  Hit points are reset to the new maximum.
///
/// # Panics
///
/// Panics if the stored vehicle or a fitment is not configured; rows only
/// ever hold validated types.
pub fn derive_character_stats(c: &mut Character, cfg: &RoConfig) {
    let vehicle_data = cfg
        .item(&c.vehicle)
        .and_then(|i| i.vehicle.as_ref())
        .unwrap_or_else(|| panic!("character {} has invalid vehicle {}", c.id, c.vehicle));

    let mut cargo = StatModifier::default();
    let mut speed = StatModifier::default();
    let mut max_armour = StatModifier::default();
    let mut max_shield = StatModifier::default();
    let mut armour_regen = StatModifier::default();
    let mut shield_regen = StatModifier::default();
    let mut range = StatModifier::default();
    let mut damage = StatModifier::default();
    let mut received_damage = StatModifier::default();
    let mut hit_chance = StatModifier::default();
    let mut mining = StatModifier::default();

    let mut combat = CombatData {
        attacks: vehicle_data.attacks.clone(),
        target_size: Some(vehicle_data.size),
        ..CombatData::default()
    };

    for f in &c.fitments {
        let fitment = cfg
            .item(f)
            .and_then(|i| i.fitment.as_ref())
            .unwrap_or_else(|| panic!("character {} has invalid fitment {f}", c.id));

        cargo += fitment.cargo;
        speed += fitment.speed;
        max_armour += fitment.max_armour;
        max_shield += fitment.max_shield;
        armour_regen += fitment.armour_regen;
        shield_regen += fitment.shield_regen;
        range += fitment.range;
        damage += fitment.damage;
        received_damage += fitment.received_damage;
        hit_chance += fitment.hit_chance;
        mining += fitment.mining;

        if let Some(attack) = &fitment.attack {
            combat.attacks.push(attack.clone());
        }
        if let Some(sd) = &fitment.self_destruct {
            combat.self_destructs.push(sd.clone());
        }
        if let Some(boost) = &fitment.low_hp_boost {
            combat.low_hp_boosts.push(boost.clone());
        }
    }

    // Range and damage modifiers are baked into the attacks themselves.
    for attack in &mut combat.attacks {
        if let Some(r) = &mut attack.range {
            *r = range.apply_u32(*r);
        }
        if let Some(a) = &mut attack.area {
            *a = range.apply_u32(*a);
        }
        if let Some(d) = &mut attack.damage {
            d.min = damage.apply_u32(d.min);
            d.max = damage.apply_u32(d.max);
        }
    }
    for sd in &mut combat.self_destructs {
        sd.area = range.apply_u32(sd.area);
        sd.damage.min = damage.apply_u32(sd.damage.min);
        sd.damage.max = damage.apply_u32(sd.damage.max);
    }

    combat.received_damage_modifier = received_damage;
    combat.hit_chance_modifier = hit_chance;

    c.cargo_space = cargo.apply(vehicle_data.cargo_space as i64) as u64;
    c.speed = speed.apply_u32(vehicle_data.speed);
    c.max_hp.armour = max_armour.apply_u32(vehicle_data.max_hp.armour);
    c.max_hp.shield = max_shield.apply_u32(vehicle_data.max_hp.shield);
    c.regen_mhp.armour = armour_regen.apply_u32(vehicle_data.regen_mhp.armour);
    c.regen_mhp.shield = shield_regen.apply_u32(vehicle_data.regen_mhp.shield);
    c.hp.armour = c.max_hp.armour;
    c.hp.shield = c.max_hp.shield;
    c.hp.mhp = Default::default();
    c.combat = combat;
    c.mining = vehicle_data.mining_rate.map(|rate| MiningData {
        rate: crate::components::MiningRate {
            min: mining.apply(rate.min as i64) as u64,
            max: mining.apply(rate.max as i64) as u64,
        },
        active: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Chain;
    use crate::world::WorldState;

    fn cfg() -> RoConfig {
        RoConfig::for_chain(Chain::Regtest)
    }

    fn character_with(vehicle: &str, fitments: &[&str]) -> Character {
        let mut w = WorldState::new();
        let id = w.create_character("alice", Faction::Red, vehicle);
        let mut c = w.characters.remove(&id).unwrap();
        c.fitments = fitments.iter().map(|s| (*s).to_owned()).collect();
        c
    }

    #[test]
    fn slot_limits_are_enforced() {
        let cfg = cfg();
        let ok = vec!["plating".to_owned(), "turbo".to_owned()];
        assert!(check_vehicle_fitments("scarab", &ok, Faction::Red, &cfg));

        // Scarab has two low slots only.
        let too_many = vec![
            "plating".to_owned(),
            "turbo".to_owned(),
            "expander".to_owned(),
        ];
        assert!(!check_vehicle_fitments("scarab", &too_many, Faction::Red, &cfg));

        // And no high slot at all.
        let high = vec!["beam laser".to_owned()];
        assert!(!check_vehicle_fitments("scarab", &high, Faction::Red, &cfg));
        assert!(check_vehicle_fitments("razor", &high, Faction::Red, &cfg));
    }

    #[test]
    fn complexity_is_enforced() {
        let cfg = cfg();
        // Razor supports 25 complexity; two lasers (5+5) plus syphon (5)
        // would need three high slots though, so use laser + syphon +
        // plating: 5 + 5 + 3 = 13, fine.
        let ok = vec![
            "beam laser".to_owned(),
            "syphon".to_owned(),
            "plating".to_owned(),
        ];
        assert!(check_vehicle_fitments("razor", &ok, Faction::Red, &cfg));

        // Scarab supports 10: plating + shield booster (3+3) plus two
        // more is impossible by slots anyway; check complexity directly
        // with an over-complex pair on a small budget.
        let heavy = vec!["plating".to_owned(), "shield booster".to_owned()];
        assert!(check_vehicle_fitments("scarab", &heavy, Faction::Red, &cfg));
    }

    #[test]
    fn unknown_types_fail_validation() {
        let cfg = cfg();
        assert!(!check_vehicle_fitments("hoverboard", &[], Faction::Red, &cfg));
        assert!(!check_vehicle_fitments(
            "scarab",
            &["warp drive".to_owned()],
            Faction::Red,
            &cfg
        ));
        // A non-fitment item is not equippable.
        assert!(!check_vehicle_fitments(
            "scarab",
            &["raw a".to_owned()],
            Faction::Red,
            &cfg
        ));
    }

    #[test]
    fn base_stats_without_fitments() {
        let cfg = cfg();
        let mut c = character_with("scarab", &[]);
        derive_character_stats(&mut c, &cfg);

        assert_eq!(c.speed, 2_000);
        assert_eq!(c.cargo_space, 1_000);
        assert_eq!(c.max_hp.armour, 100);
        assert_eq!(c.hp.armour, 100);
        assert_eq!(c.hp.shield, 30);
        assert!(c.combat.attacks.is_empty());
        assert!(c.mining.is_some());
    }

    #[test]
    fn fitments_modify_stats() {
        let cfg = cfg();
        let mut c = character_with("scarab", &["plating", "turbo"]);
        derive_character_stats(&mut c, &cfg);

        assert_eq!(c.max_hp.armour, 150, "plating adds 50% armour");
        assert_eq!(c.speed, 3_000, "turbo adds 50% speed");
        assert_eq!(c.max_hp.shield, 30, "shield untouched");
    }

    #[test]
    fn weapon_fitments_add_attacks() {
        let cfg = cfg();
        let mut c = character_with("razor", &["beam laser", "blast charge"]);
        derive_character_stats(&mut c, &cfg);

        // Vehicle gun plus the laser.
        assert_eq!(c.combat.attacks.len(), 2);
        assert_eq!(c.combat.self_destructs.len(), 1);
        assert_eq!(c.combat.attack_range(false), Some(10));
    }

    #[test]
    fn mining_modifier_scales_the_rate() {
        let cfg = cfg();
        let mut plain = character_with("mule", &[]);
        derive_character_stats(&mut plain, &cfg);
        let mut boosted = character_with("mule", &["mining laser"]);
        derive_character_stats(&mut boosted, &cfg);

        let plain_rate = plain.mining.unwrap().rate;
        let boosted_rate = boosted.mining.unwrap().rate;
        assert_eq!(boosted_rate.min, plain_rate.min * 2);
        assert_eq!(boosted_rate.max, plain_rate.max * 2);
    }

    #[test]
    fn derivation_is_idempotent() {
        let cfg = cfg();
        let mut c = character_with("razor", &["beam laser", "plating"]);
        derive_character_stats(&mut c, &cfg);
        let snapshot = c.clone();
        derive_character_stats(&mut c, &cfg);
        assert_eq!(c, snapshot);
    }
}
