//! End-to-end combat scenarios exercising the damage phase, kill
//! processing and their interaction with movement and trading.

use strata_core::combat::{deal_combat_damage, process_kills};
use strata_core::components::{
    Attack, AttackDamage, Faction, SelfDestruct, TargetKey,
};
use strata_core::config::{Chain, RoConfig};
use strata_core::context::Context;
use strata_core::fame;
use strata_core::hex::HexCoord;
use strata_core::map::BaseMap;
use strata_core::rnd::Random;
use strata_core::world::{IdT, OrderSide, WorldState};

const SEED: &str = "6f750b36d22f1dc3d0a6e483af45301022646dfc3b3ba2187865f5a7d6d83ab1";

struct Fixture {
    cfg: RoConfig,
    map: BaseMap,
    state: WorldState,
    rnd: Random,
}

impl Fixture {
    fn new() -> Self {
        let cfg = RoConfig::for_chain(Chain::Regtest);
        // A plain map without safe zones, so combat works everywhere.
        let map = BaseMap::new(200, 24);
        Self {
            cfg,
            map,
            state: WorldState::new(),
            rnd: Random::from_block_hash(SEED).unwrap(),
        }
    }

    fn ctx(&self) -> Context<'_> {
        Context::new(Chain::Regtest, &self.map, &self.cfg, 100, 0)
    }

    /// A bare combat character: full control over its stats.
    fn fighter(
        &mut self,
        owner: &str,
        faction: Faction,
        pos: HexCoord,
        armour: u32,
        shield: u32,
    ) -> IdT {
        self.state.account_mut(owner).faction = Some(faction);
        let id = self.state.create_character(owner, faction, "scarab");
        let c = self.state.characters.get_mut(&id).unwrap();
        c.pos = Some(pos);
        c.hp.armour = armour;
        c.hp.shield = shield;
        // Generous maxima so drained HP can always be recovered in full.
        c.max_hp.armour = (armour * 2).max(100);
        c.max_hp.shield = (shield * 2).max(100);
        id
    }

    fn give_attack(&mut self, id: IdT, range: u32, min: u32, max: u32) {
        self.state
            .characters
            .get_mut(&id)
            .unwrap()
            .combat
            .attacks
            .push(Attack {
                range: Some(range),
                area: None,
                friendlies: false,
                gain_hp: false,
                damage: Some(AttackDamage {
                    min,
                    max,
                    weapon_size: None,
                    shield_percent: None,
                    armour_percent: None,
                }),
                effects: None,
            });
    }

    fn give_syphon(&mut self, id: IdT, range: u32, drain: u32) {
        self.state
            .characters
            .get_mut(&id)
            .unwrap()
            .combat
            .attacks
            .push(Attack {
                range: Some(range),
                area: None,
                friendlies: false,
                gain_hp: true,
                damage: Some(AttackDamage {
                    min: drain,
                    max: drain,
                    weapon_size: None,
                    shield_percent: Some(100),
                    armour_percent: Some(0),
                }),
                effects: None,
            });
    }

    fn give_self_destruct(&mut self, id: IdT, area: u32, dmg: u32) {
        self.state
            .characters
            .get_mut(&id)
            .unwrap()
            .combat
            .self_destructs
            .push(SelfDestruct {
                area,
                damage: AttackDamage {
                    min: dmg,
                    max: dmg,
                    weapon_size: None,
                    shield_percent: None,
                    armour_percent: None,
                },
            });
    }

    fn set_target(&mut self, attacker: IdT, target: IdT) {
        self.state.characters.get_mut(&attacker).unwrap().target =
            Some(TargetKey::character(target));
    }

    fn hp(&self, id: IdT) -> (u32, u32) {
        let c = &self.state.characters[&id];
        (c.hp.armour, c.hp.shield)
    }
}

#[test]
fn self_destruct_cascade_kills_and_fame() {
    let mut f = Fixture::new();

    // X (red) shoots A (green) from outside the blast radius; A's blast
    // catches B (red) two tiles away; B's blast catches C (green) two
    // tiles further.  C is outside A's blast radius and friendly to A
    // anyway.
    let x = f.fighter("xo", Faction::Red, HexCoord::new(-3, 0), 100, 0);
    let a = f.fighter("ao", Faction::Green, HexCoord::new(0, 0), 1, 0);
    let b = f.fighter("bo", Faction::Red, HexCoord::new(2, 0), 5, 0);
    let c = f.fighter("co", Faction::Green, HexCoord::new(4, 0), 5, 0);

    f.give_attack(x, 5, 10, 10);
    f.set_target(x, a);
    f.give_self_destruct(a, 2, 10);
    f.give_self_destruct(b, 2, 10);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    let dead = deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);

    let expected: std::collections::BTreeSet<_> = [
        TargetKey::character(a),
        TargetKey::character(b),
        TargetKey::character(c),
    ]
    .into_iter()
    .collect();
    assert_eq!(dead, expected);
    assert_eq!(f.hp(x), (100, 0), "the shooter is untouched");

    // Fame is credited exactly once per victim.
    for k in &dead {
        fame::update_for_kill(&mut f.state, *k);
    }
    process_kills(&mut f.state, &dead, &mut f.rnd);

    // Kills process in id order: each owner first loses the fame for
    // its own death (floored at zero), then earns the kill credit.
    assert_eq!(f.state.accounts["xo"].fame, 100, "killed A");
    assert_eq!(f.state.accounts["ao"].fame, 100, "lost A at zero fame, then killed B");
    assert_eq!(f.state.accounts["bo"].fame, 100, "lost B at zero fame, then killed C");
    assert_eq!(f.state.accounts["co"].fame, 0, "lost C");
    assert_eq!(f.state.accounts["xo"].kills, 1);
    assert_eq!(f.state.accounts["ao"].kills, 1);
    assert_eq!(f.state.accounts["bo"].kills, 1);

    assert!(!f.state.characters.contains_key(&a));
    assert!(!f.state.characters.contains_key(&b));
    assert!(!f.state.characters.contains_key(&c));
    assert!(f.state.characters.contains_key(&x));
}

#[test]
fn gain_hp_multi_attacker_exhaustion() {
    let mut f = Fixture::new();

    // Two syphons drain exactly the target's whole shield between them:
    // with several attackers and nothing left, nobody recovers.
    let t = f.fighter("to", Faction::Red, HexCoord::new(0, 0), 5, 10);
    let s1 = f.fighter("so", Faction::Green, HexCoord::new(1, 0), 10, 0);
    let s2 = f.fighter("so", Faction::Green, HexCoord::new(-1, 0), 10, 0);

    f.give_syphon(s1, 3, 5);
    f.give_syphon(s2, 3, 5);
    f.set_target(s1, t);
    f.set_target(s2, t);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    let dead = deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);
    assert!(dead.is_empty(), "the target survives on armour");

    assert_eq!(f.hp(t), (5, 0), "shield fully drained");
    assert_eq!(f.hp(s1), (10, 0), "no recovery for the first drainer");
    assert_eq!(f.hp(s2), (10, 0), "no recovery for the second drainer");
}

#[test]
fn gain_hp_single_attacker_recovers() {
    let mut f = Fixture::new();

    let t = f.fighter("to", Faction::Red, HexCoord::new(0, 0), 5, 5);
    let s = f.fighter("so", Faction::Green, HexCoord::new(1, 0), 10, 0);
    f.give_syphon(s, 3, 5);
    f.set_target(s, t);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    let dead = deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);
    assert!(dead.is_empty());

    assert_eq!(f.hp(t), (5, 0));
    // The sole drainer recovers exactly what was drained.
    assert_eq!(f.hp(s), (10, 5));
}

#[test]
fn gain_hp_partial_drain_with_shield_left_credits_all() {
    let mut f = Fixture::new();

    // Shield 20, two drains of 5 each: 10 left, so both recover.
    let t = f.fighter("to", Faction::Red, HexCoord::new(0, 0), 5, 20);
    let s1 = f.fighter("so", Faction::Green, HexCoord::new(1, 0), 10, 0);
    let s2 = f.fighter("so", Faction::Green, HexCoord::new(-1, 0), 10, 0);
    f.give_syphon(s1, 3, 5);
    f.give_syphon(s2, 3, 5);
    f.set_target(s1, t);
    f.set_target(s2, t);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);

    assert_eq!(f.hp(t), (5, 10));
    assert_eq!(f.hp(s1), (10, 5));
    assert_eq!(f.hp(s2), (10, 5));
}

#[test]
fn dead_drainers_get_nothing() {
    let mut f = Fixture::new();

    // The syphon drains, but a counter-attack kills it in the same
    // block: the gained HP are never credited.
    let t = f.fighter("to", Faction::Red, HexCoord::new(0, 0), 50, 5);
    let s = f.fighter("so", Faction::Green, HexCoord::new(1, 0), 1, 0);
    f.give_syphon(s, 3, 5);
    f.set_target(s, t);
    f.give_attack(t, 3, 20, 20);
    f.set_target(t, s);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    let dead = deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);
    assert_eq!(dead.len(), 1);
    assert!(dead.contains(&TargetKey::character(s)));
}

#[test]
fn building_destruction_refunds_bidders_and_drops_loot() {
    let mut f = Fixture::new();

    let centre = HexCoord::new(10, 10);
    let building =
        f.state
            .create_building("vault", Some("owner"), Faction::Red, centre, 0);
    f.state.account_mut("owner").faction = Some(Faction::Red);

    // 100 ore stored by Z, a bid of X reserving 50 coins, and one
    // character of Y inside with vehicle, fitment and cargo.
    f.state.account_mut("zeta").faction = Some(Faction::Red);
    f.state
        .building_inventory_mut(building, "zeta")
        .add("raw a", 100);

    f.state.account_mut("xavier").faction = Some(Faction::Red);
    f.state.account_mut("xavier").balance = 50;
    assert!(strata_core::trading::place_order(
        &mut f.state,
        building,
        "xavier",
        OrderSide::Bid,
        "raw a",
        10,
        5
    ));
    assert_eq!(f.state.accounts["xavier"].balance, 0);

    f.state.account_mut("yvonne").faction = Some(Faction::Red);
    let inside = f.state.create_character("yvonne", Faction::Red, "scarab");
    {
        let c = f.state.characters.get_mut(&inside).unwrap();
        c.in_building = Some(building);
        c.fitments.push("plating".to_owned());
        c.inventory.add("raw b", 3);
    }

    let dead = [TargetKey::building(building)].into_iter().collect();
    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    process_kills(&mut f.state, &dead, &mut f.rnd);

    // The bid reservation came back in full.
    assert_eq!(f.state.accounts["xavier"].balance, 50);

    // Building, deposits, orders and the character inside are gone.
    assert!(!f.state.buildings.contains_key(&building));
    assert!(!f.state.characters.contains_key(&inside));
    assert!(f.state.orders.is_empty());
    assert!(f
        .state
        .building_inventories
        .keys()
        .all(|(b, _)| *b != building));

    // Whatever dropped did so at the centre, in full piles out of the
    // pooled set {plating, raw a, raw b, scarab}.
    if let Some(loot) = f.state.ground_loot.get(&centre) {
        for (item, count) in loot.iter() {
            let expected = match item {
                "plating" => 1,
                "raw a" => 100,
                "raw b" => 3,
                "scarab" => 1,
                other => panic!("unexpected loot {other}"),
            };
            assert_eq!(count, expected, "partial pile of {item}");
        }
    }
}

#[test]
fn building_destruction_is_deterministic() {
    let run = || {
        let mut f = Fixture::new();
        let centre = HexCoord::new(10, 10);
        let building =
            f.state
                .create_building("vault", Some("owner"), Faction::Red, centre, 0);
        f.state.account_mut("owner").faction = Some(Faction::Red);
        f.state
            .building_inventory_mut(building, "zeta")
            .add("raw a", 100);
        f.state
            .building_inventory_mut(building, "zeta")
            .add("raw c", 7);

        let dead = [TargetKey::building(building)].into_iter().collect();
        let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
        process_kills(&mut f.state, &dead, &mut f.rnd);
        f.state.state_hash()
    };
    assert_eq!(run(), run());
}

#[test]
fn killed_character_drops_inventory_and_cancels_prospection() {
    let mut f = Fixture::new();

    let pos = HexCoord::new(5, 5);
    let victim = f.fighter("vo", Faction::Red, pos, 1, 0);
    {
        let c = f.state.characters.get_mut(&victim).unwrap();
        c.inventory.add("raw a", 42);
    }
    // The victim is mid-prospection.
    let region_id = f.map.region_id(pos);
    let op = f.state.create_ongoing(
        105,
        Some(victim),
        None,
        strata_core::world::OngoingKind::Prospection { region: region_id },
    );
    {
        let c = f.state.characters.get_mut(&victim).unwrap();
        c.busy_blocks = 5;
        c.ongoing = Some(op);
    }
    f.state.region_mut(region_id).prospecting_character = Some(victim);

    let killer = f.fighter("ko", Faction::Green, HexCoord::new(6, 5), 100, 0);
    f.give_attack(killer, 5, 10, 10);
    f.set_target(killer, victim);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    let dead = deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);
    process_kills(&mut f.state, &dead, &mut f.rnd);

    assert!(!f.state.characters.contains_key(&victim));
    assert_eq!(f.state.ground_loot[&pos].count("raw a"), 42);
    assert_eq!(f.state.regions[&region_id].prospecting_character, None);
    assert!(f.state.ongoings.is_empty());
}

#[test]
fn low_hp_boost_applies_from_the_snapshot() {
    let mut f = Fixture::new();

    // The attacker sits at 10% armour, below its 20% boost threshold:
    // its 5..5 damage doubles to 10.
    let attacker = f.fighter("ao", Faction::Red, HexCoord::new(0, 0), 100, 0);
    {
        let c = f.state.characters.get_mut(&attacker).unwrap();
        c.max_hp.armour = 1_000;
        c.combat.low_hp_boosts.push(strata_core::components::LowHpBoost {
            max_hp_percent: 20,
            damage: strata_core::modifier::StatModifier::new(100),
            range: strata_core::modifier::StatModifier::default(),
        });
    }
    let target = f.fighter("to", Faction::Green, HexCoord::new(1, 0), 50, 0);
    f.give_attack(attacker, 3, 5, 5);
    f.set_target(attacker, target);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    deal_combat_damage(&mut f.state, &mut f.rnd, &ctx);
    assert_eq!(f.hp(target), (40, 0), "boosted damage of 10 was dealt");
}

#[test]
fn no_combat_zone_blocks_targeting() {
    let mut f = Fixture::new();
    f.map = BaseMap::new(200, 24).with_safe_zones(strata_core::map::SafeZones {
        neutral: vec![strata_core::config::Zone {
            centre: HexCoord::new(0, 0),
            radius: 2,
        }],
        starters: Vec::new(),
    });

    let safe = f.fighter("so", Faction::Red, HexCoord::new(0, 0), 10, 0);
    let outside = f.fighter("oo", Faction::Green, HexCoord::new(5, 0), 10, 0);
    f.give_attack(outside, 10, 5, 5);
    f.give_attack(safe, 10, 5, 5);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    strata_core::combat::find_combat_targets(&mut f.state, &mut f.rnd, &ctx);

    assert_eq!(
        f.state.characters[&outside].target, None,
        "fighters inside the sanctuary cannot be targeted"
    );
    assert_eq!(
        f.state.characters[&safe].target, None,
        "fighters inside the sanctuary cannot target"
    );
}

#[test]
fn closest_enemy_is_preferred() {
    let mut f = Fixture::new();
    let attacker = f.fighter("ao", Faction::Red, HexCoord::new(0, 0), 10, 0);
    let near = f.fighter("no", Faction::Green, HexCoord::new(2, 0), 10, 0);
    let far = f.fighter("fo", Faction::Green, HexCoord::new(5, 0), 10, 0);
    f.give_attack(attacker, 10, 1, 1);

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    strata_core::combat::find_combat_targets(&mut f.state, &mut f.rnd, &ctx);

    assert_eq!(
        f.state.characters[&attacker].target,
        Some(TargetKey::character(near))
    );
    let _ = far;
}

#[test]
fn mentecon_turns_friendlies_into_targets() {
    let mut f = Fixture::new();
    let afflicted = f.fighter("ao", Faction::Red, HexCoord::new(0, 0), 10, 0);
    let friendly = f.fighter("fo", Faction::Red, HexCoord::new(1, 0), 10, 0);
    f.give_attack(afflicted, 10, 1, 1);
    f.state.characters.get_mut(&afflicted).unwrap().effects.mentecon = true;

    let ctx = Context::new(Chain::Regtest, &f.map, &f.cfg, 100, 0);
    strata_core::combat::find_combat_targets(&mut f.state, &mut f.rnd, &ctx);

    assert_eq!(
        f.state.characters[&afflicted].target,
        Some(TargetKey::character(friendly)),
        "a mentecon makes the friendly a target"
    );
}
