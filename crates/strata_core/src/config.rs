//! Per-chain read-only configuration.
//!
//! The engine is parameterised by a static configuration value ("RoConfig")
//! holding the item, vehicle, fitment, building and prize tables together
//! with all consensus-relevant tuning parameters.  The configuration is
//! constructed once per process and passed through the [`crate::context`]
//! value; it is never mutated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{
    Attack, AttackDamage, Faction, HpPair, LowHpBoost, MiningRate, SelfDestruct,
};
use crate::hex::{CoordT, HexCoord};
use crate::modifier::StatModifier;

/// The host chain the engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chain {
    /// Production network.
    Main,
    /// Public test network.
    Test,
    /// Local regression-test network.
    Regtest,
}

impl Chain {
    /// Parse a chain name as used on the command line.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Self::Main),
            "test" => Some(Self::Test),
            "regtest" => Some(Self::Regtest),
            _ => None,
        }
    }
}

/// An exact probability as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    /// Numerator.
    pub numer: u32,
    /// Denominator.
    pub denom: u32,
}

impl Fraction {
    /// Create a new fraction.
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        Self { numer, denom }
    }
}

/// A prospecting prize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeConfig {
    /// Base name; the inventory item is `"<name> prize"`.
    pub name: String,
    /// Total number available across the whole game.
    pub available: u64,
    /// Chance to find one per prospection in a normal area.
    pub chance: Fraction,
    /// Chance to find one per prospection in a low-prize area.
    pub low_chance: Fraction,
}

impl PrizeConfig {
    /// Inventory item name awarded for this prize.
    #[must_use]
    pub fn item_name(&self) -> String {
        format!("{} prize", self.name)
    }
}

/// A mineable resource and where it occurs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Item name of the resource.
    pub name: String,
    /// x coordinate of the belt where this resource is most common.
    pub belt_x: CoordT,
    /// Weight of this resource at the centre of its belt.
    pub base_weight: u32,
    /// Minimum amount seeded into a freshly prospected region.
    pub amount_min: u64,
    /// Maximum amount seeded into a freshly prospected region.
    pub amount_max: u64,
    /// Artefacts found alongside this resource.  Rolled in order; the
    /// first successful roll wins and ends the sequence.
    pub artefacts: Vec<(String, Fraction)>,
}

impl ResourceConfig {
    /// Region weight of this resource at the given position.  Decays with
    /// distance from the belt but never quite vanishes, so every resource
    /// can occur anywhere.
    #[must_use]
    pub fn weight_at(&self, pos: HexCoord) -> u32 {
        let dist = u64::from(pos.x.abs_diff(self.belt_x));
        let w = u64::from(self.base_weight) * 1_000 / (1_000 + dist);
        (w as u32).max(1)
    }
}

/// Vehicle base stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Size class (target size and fitment compatibility).
    pub size: u32,
    /// Cargo space in space units.
    pub cargo_space: u64,
    /// Base speed in movement points per block.
    pub speed: u32,
    /// Maximum HP.
    pub max_hp: HpPair,
    /// Regeneration in milli-HP per block.
    pub regen_mhp: HpPair,
    /// Built-in attacks.
    #[serde(default)]
    pub attacks: Vec<Attack>,
    /// Mining yield, if the vehicle can mine.
    #[serde(default)]
    pub mining_rate: Option<MiningRate>,
    /// Whether the vehicle can prospect regions.
    #[serde(default)]
    pub can_prospect: bool,
    /// Fitment slots by slot name.
    #[serde(default)]
    pub equipment_slots: BTreeMap<String, u32>,
    /// Fitment complexity the vehicle supports.
    pub complexity: u32,
}

/// Stat changes and extras granted by a fitment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitmentConfig {
    /// Slot the fitment occupies.
    pub slot: String,
    /// If set, only vehicles of this size class accept the fitment.
    #[serde(default)]
    pub vehicle_size: Option<u32>,
    /// If set, only vehicles of this faction accept the fitment.
    #[serde(default)]
    pub faction: Option<Faction>,
    /// Cargo space modification.
    #[serde(default)]
    pub cargo: StatModifier,
    /// Speed modification.
    #[serde(default)]
    pub speed: StatModifier,
    /// Maximum armour modification.
    #[serde(default)]
    pub max_armour: StatModifier,
    /// Maximum shield modification.
    #[serde(default)]
    pub max_shield: StatModifier,
    /// Armour regeneration modification.
    #[serde(default)]
    pub armour_regen: StatModifier,
    /// Shield regeneration modification.
    #[serde(default)]
    pub shield_regen: StatModifier,
    /// Attack range modification.
    #[serde(default)]
    pub range: StatModifier,
    /// Attack damage modification.
    #[serde(default)]
    pub damage: StatModifier,
    /// Received damage modification.
    #[serde(default)]
    pub received_damage: StatModifier,
    /// Hit chance modification.
    #[serde(default)]
    pub hit_chance: StatModifier,
    /// Mining rate modification.
    #[serde(default)]
    pub mining: StatModifier,
    /// Supported-complexity modification.
    #[serde(default)]
    pub complexity: StatModifier,
    /// Extra attack granted by the fitment.
    #[serde(default)]
    pub attack: Option<Attack>,
    /// Self-destruct charge granted by the fitment.
    #[serde(default)]
    pub self_destruct: Option<SelfDestruct>,
    /// Low-HP boost granted by the fitment.
    #[serde(default)]
    pub low_hp_boost: Option<LowHpBoost>,
}

/// Marks an item as a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintConfig {
    /// Item type this blueprint produces.
    pub for_item: String,
    /// Whether this is an original (copyable, returned after use) or a
    /// copy (consumed by construction).
    pub original: bool,
}

/// Construction recipe for an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Required materials per produced item.
    pub materials: BTreeMap<String, u64>,
    /// Construction time per produced item, in blocks.
    pub blocks: u64,
}

/// Static definition of one item type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Cargo space taken per unit.
    pub space: u64,
    /// Fitment complexity required (fitments only).
    #[serde(default)]
    pub complexity: u32,
    /// Vehicle data if the item is a vehicle.
    #[serde(default)]
    pub vehicle: Option<VehicleConfig>,
    /// Fitment data if the item is a fitment.
    #[serde(default)]
    pub fitment: Option<FitmentConfig>,
    /// Blueprint data if the item is a blueprint.
    #[serde(default)]
    pub blueprint: Option<BlueprintConfig>,
    /// Recipe if the item can be constructed.
    #[serde(default)]
    pub recipe: Option<Recipe>,
}

/// Construction data of a building type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingConstruction {
    /// Materials consumed for the full building.
    pub materials: BTreeMap<String, u64>,
    /// Blocks from foundation to finished building.
    pub blocks: u64,
}

/// Static definition of one building type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Occupied tiles relative to the centre, before rotation.
    pub shape: Vec<HexCoord>,
    /// Maximum HP.
    pub max_hp: HpPair,
    /// Regeneration in milli-HP per block.
    pub regen_mhp: HpPair,
    /// Built-in attacks.
    #[serde(default)]
    pub attacks: Vec<Attack>,
    /// Size class as a combat target.
    pub target_size: u32,
    /// Construction data; `None` for types that only exist from the
    /// initial map seed.
    #[serde(default)]
    pub construction: Option<BuildingConstruction>,
}

/// A circular map zone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Zone {
    /// Centre tile.
    pub centre: HexCoord,
    /// L1 radius.
    pub radius: CoordT,
}

impl Zone {
    /// Whether the zone contains the given tile.
    #[must_use]
    pub fn contains(&self, c: HexCoord) -> bool {
        HexCoord::distance_l1(self.centre, c) <= self.radius
    }
}

/// Consensus-relevant tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Sliding window (blocks) of the damage lists.
    pub damage_list_blocks: u64,
    /// Maximum characters per account.
    pub character_limit: u32,
    /// Coin cost of creating a character.
    pub character_cost: i64,
    /// Blocked step attempts before the cached path is invalidated.
    pub blocked_step_retries: u32,
    /// Edge-weight multiplier for stepping onto an occupied tile where
    /// vehicles do not block outright.
    pub multi_vehicle_slowdown: u32,
    /// Blocks a prospection takes.
    pub prospecting_blocks: u64,
    /// Blocks after which a prospected region may be re-prospected.
    pub prospection_expiry_blocks: u64,
    /// Maximum L1 distance from a building at which it can be entered.
    pub building_enter_radius: CoordT,
    /// Radius of the ring on which pre-fork spawns are placed.
    pub spawn_ring_radius: CoordT,
    /// Spawn ring / starter building centres per playable faction.
    pub spawn_centres: BTreeMap<Faction, HexCoord>,
    /// Armour points repaired per block by the repair service.
    pub armour_repair_hp_per_block: u32,
    /// Repair cost in milli-coins per armour point.
    pub armour_repair_cost_milli: i64,
    /// Blocks per blueprint copy.
    pub blueprint_copy_blocks: u64,
    /// Coin cost per blueprint copy.
    pub blueprint_copy_cost: i64,
    /// Coin cost per constructed item.
    pub construction_cost: i64,
    /// Maximum valid chosen speed in a move.
    pub max_chosen_speed: u32,
    /// Total coin cap; also the bound on coin amounts in moves.
    pub max_coin_amount: i64,
    /// Prospecting prizes, rolled in order.
    pub prizes: Vec<PrizeConfig>,
    /// Mineable resources.
    pub resources: Vec<ResourceConfig>,
    /// Zones with reduced prize chances.
    pub low_prize_zones: Vec<Zone>,
}

impl Params {
    /// Whether prizes are found with reduced chance at the position.
    #[must_use]
    pub fn is_low_prize_zone(&self, pos: HexCoord) -> bool {
        self.low_prize_zones.iter().any(|z| z.contains(pos))
    }
}

/// The full read-only configuration for one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoConfig {
    /// Tuning parameters.
    pub params: Params,
    /// All item types by name.
    pub items: BTreeMap<String, ItemConfig>,
    /// All building types by name.
    pub buildings: BTreeMap<String, BuildingConfig>,
}

impl RoConfig {
    /// Look up an item type.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&ItemConfig> {
        self.items.get(name)
    }

    /// Look up a building type.
    #[must_use]
    pub fn building(&self, name: &str) -> Option<&BuildingConfig> {
        self.buildings.get(name)
    }

    /// Construct the configuration for the given chain.
    ///
    /// The game data itself is identical on all chains; only fork
    /// schedules (handled by [`crate::forks`]) differ.
    #[must_use]
    pub fn for_chain(_chain: Chain) -> Self {
        let mut items = BTreeMap::new();

        for name in [
            "raw a", "raw b", "raw c", "raw d", "raw e", "raw f", "raw g", "raw h", "raw i",
        ] {
            items.insert(name.to_owned(), ItemConfig { space: 10, ..ItemConfig::default() });
        }
        items.insert("art r".to_owned(), ItemConfig { space: 20, ..ItemConfig::default() });
        items.insert("art c".to_owned(), ItemConfig { space: 20, ..ItemConfig::default() });
        for name in ["gold prize", "silver prize", "bronze prize"] {
            items.insert(name.to_owned(), ItemConfig { space: 0, ..ItemConfig::default() });
        }

        items.insert(
            "scarab".to_owned(),
            ItemConfig {
                space: 1_000,
                vehicle: Some(VehicleConfig {
                    size: 1,
                    cargo_space: 1_000,
                    speed: 2_000,
                    max_hp: HpPair::new(100, 30),
                    regen_mhp: HpPair::new(0, 500),
                    attacks: Vec::new(),
                    mining_rate: Some(MiningRate { min: 10, max: 30 }),
                    can_prospect: true,
                    equipment_slots: BTreeMap::from([("low".to_owned(), 2)]),
                    complexity: 10,
                }),
                ..ItemConfig::default()
            },
        );
        items.insert(
            "mule".to_owned(),
            ItemConfig {
                space: 2_000,
                vehicle: Some(VehicleConfig {
                    size: 2,
                    cargo_space: 5_000,
                    speed: 1_000,
                    max_hp: HpPair::new(300, 50),
                    regen_mhp: HpPair::new(0, 500),
                    attacks: Vec::new(),
                    mining_rate: Some(MiningRate { min: 30, max: 80 }),
                    can_prospect: true,
                    equipment_slots: BTreeMap::from([
                        ("low".to_owned(), 2),
                        ("high".to_owned(), 1),
                    ]),
                    complexity: 20,
                }),
                ..ItemConfig::default()
            },
        );
        items.insert(
            "razor".to_owned(),
            ItemConfig {
                space: 2_000,
                vehicle: Some(VehicleConfig {
                    size: 2,
                    cargo_space: 500,
                    speed: 3_000,
                    max_hp: HpPair::new(150, 100),
                    regen_mhp: HpPair::new(0, 1_000),
                    attacks: vec![Attack {
                        range: Some(10),
                        area: None,
                        friendlies: false,
                        gain_hp: false,
                        damage: Some(AttackDamage {
                            min: 1,
                            max: 10,
                            weapon_size: Some(2),
                            shield_percent: None,
                            armour_percent: None,
                        }),
                        effects: None,
                    }],
                    mining_rate: None,
                    can_prospect: false,
                    equipment_slots: BTreeMap::from([
                        ("low".to_owned(), 1),
                        ("high".to_owned(), 2),
                    ]),
                    complexity: 25,
                }),
                ..ItemConfig::default()
            },
        );

        let fitment = |slot: &str, complexity: u32, f: FitmentConfig| ItemConfig {
            space: 100,
            complexity,
            fitment: Some(FitmentConfig { slot: slot.to_owned(), ..f }),
            ..ItemConfig::default()
        };
        items.insert(
            "plating".to_owned(),
            fitment("low", 3, FitmentConfig {
                max_armour: StatModifier::new(50),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "shield booster".to_owned(),
            fitment("low", 3, FitmentConfig {
                max_shield: StatModifier::new(50),
                shield_regen: StatModifier::new(50),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "turbo".to_owned(),
            fitment("low", 2, FitmentConfig {
                speed: StatModifier::new(50),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "expander".to_owned(),
            fitment("low", 2, FitmentConfig {
                cargo: StatModifier::new(100),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "targeting array".to_owned(),
            fitment("low", 2, FitmentConfig {
                hit_chance: StatModifier::new(20),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "berserker rig".to_owned(),
            fitment("low", 3, FitmentConfig {
                low_hp_boost: Some(LowHpBoost {
                    max_hp_percent: 20,
                    damage: StatModifier::new(100),
                    range: StatModifier::new(50),
                }),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "beam laser".to_owned(),
            fitment("high", 5, FitmentConfig {
                attack: Some(Attack {
                    range: Some(10),
                    area: None,
                    friendlies: false,
                    gain_hp: false,
                    damage: Some(AttackDamage {
                        min: 2,
                        max: 12,
                        weapon_size: Some(2),
                        shield_percent: None,
                        armour_percent: None,
                    }),
                    effects: None,
                }),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "mining laser".to_owned(),
            fitment("high", 4, FitmentConfig {
                mining: StatModifier::new(100),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "syphon".to_owned(),
            fitment("high", 5, FitmentConfig {
                attack: Some(Attack {
                    range: Some(3),
                    area: None,
                    friendlies: false,
                    gain_hp: true,
                    damage: Some(AttackDamage {
                        min: 5,
                        max: 5,
                        weapon_size: None,
                        shield_percent: Some(100),
                        armour_percent: Some(0),
                    }),
                    effects: None,
                }),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "blast charge".to_owned(),
            fitment("high", 4, FitmentConfig {
                self_destruct: Some(SelfDestruct {
                    area: 2,
                    damage: AttackDamage {
                        min: 10,
                        max: 10,
                        weapon_size: None,
                        shield_percent: None,
                        armour_percent: None,
                    },
                }),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "inhibitor".to_owned(),
            fitment("high", 5, FitmentConfig {
                attack: Some(Attack {
                    range: Some(5),
                    area: None,
                    friendlies: false,
                    gain_hp: false,
                    damage: None,
                    effects: Some(crate::components::AttackEffects {
                        speed: Some(StatModifier::new(-50)),
                        ..crate::components::AttackEffects::default()
                    }),
                }),
                ..FitmentConfig::default()
            }),
        );
        items.insert(
            "mentecon projector".to_owned(),
            fitment("high", 6, FitmentConfig {
                attack: Some(Attack {
                    range: Some(5),
                    area: None,
                    friendlies: false,
                    gain_hp: false,
                    damage: None,
                    effects: Some(crate::components::AttackEffects {
                        mentecon: true,
                        ..crate::components::AttackEffects::default()
                    }),
                }),
                ..FitmentConfig::default()
            }),
        );

        items.insert(
            "beam laser bp o".to_owned(),
            ItemConfig {
                space: 50,
                blueprint: Some(BlueprintConfig {
                    for_item: "beam laser".to_owned(),
                    original: true,
                }),
                ..ItemConfig::default()
            },
        );
        items.insert(
            "beam laser bp c".to_owned(),
            ItemConfig {
                space: 50,
                blueprint: Some(BlueprintConfig {
                    for_item: "beam laser".to_owned(),
                    original: false,
                }),
                ..ItemConfig::default()
            },
        );
        if let Some(laser) = items.get_mut("beam laser") {
            laser.recipe = Some(Recipe {
                materials: BTreeMap::from([("raw a".to_owned(), 3), ("raw b".to_owned(), 1)]),
                blocks: 10,
            });
        }

        let mut buildings = BTreeMap::new();
        buildings.insert(
            "citadel".to_owned(),
            BuildingConfig {
                shape: HexCoord::ORIGIN.l1_ball(1).collect(),
                max_hp: HpPair::new(5_000, 1_000),
                regen_mhp: HpPair::new(0, 2_000),
                attacks: Vec::new(),
                target_size: 10,
                construction: None,
            },
        );
        buildings.insert(
            "vault".to_owned(),
            BuildingConfig {
                shape: vec![HexCoord::ORIGIN, HexCoord::new(1, 0), HexCoord::new(0, 1)],
                max_hp: HpPair::new(1_000, 200),
                regen_mhp: HpPair::new(0, 1_000),
                attacks: Vec::new(),
                target_size: 5,
                construction: Some(BuildingConstruction {
                    materials: BTreeMap::from([
                        ("raw a".to_owned(), 100),
                        ("raw b".to_owned(), 50),
                    ]),
                    blocks: 20,
                }),
            },
        );
        buildings.insert(
            "turret".to_owned(),
            BuildingConfig {
                shape: vec![HexCoord::ORIGIN],
                max_hp: HpPair::new(500, 500),
                regen_mhp: HpPair::new(0, 2_000),
                attacks: vec![Attack {
                    range: Some(15),
                    area: None,
                    friendlies: false,
                    gain_hp: false,
                    damage: Some(AttackDamage {
                        min: 1,
                        max: 15,
                        weapon_size: Some(3),
                        shield_percent: None,
                        armour_percent: None,
                    }),
                    effects: None,
                }],
                target_size: 3,
                construction: Some(BuildingConstruction {
                    materials: BTreeMap::from([
                        ("raw a".to_owned(), 50),
                        ("raw c".to_owned(), 20),
                    ]),
                    blocks: 15,
                }),
            },
        );

        let resources = [
            ("raw a", -4_000, 50),
            ("raw b", -3_000, 40),
            ("raw c", -2_000, 35),
            ("raw d", -1_000, 30),
            ("raw e", 0, 25),
            ("raw f", 1_000, 20),
            ("raw g", 2_000, 15),
            ("raw h", 3_000, 12),
            ("raw i", 4_000, 10),
        ]
        .into_iter()
        .map(|(name, belt_x, base_weight)| {
            let artefacts = match name {
                "raw a" => vec![("art r".to_owned(), Fraction::new(1, 1))],
                "raw f" => vec![
                    ("art c".to_owned(), Fraction::new(1, 2)),
                    ("art r".to_owned(), Fraction::new(1, 2)),
                ],
                _ => Vec::new(),
            };
            ResourceConfig {
                name: name.to_owned(),
                belt_x,
                base_weight,
                amount_min: 100_000,
                amount_max: 1_000_000,
                artefacts,
            }
        })
        .collect();

        let params = Params {
            damage_list_blocks: 100,
            character_limit: 20,
            character_cost: 5,
            blocked_step_retries: 10,
            multi_vehicle_slowdown: 8,
            prospecting_blocks: 10,
            prospection_expiry_blocks: 100,
            building_enter_radius: 2,
            spawn_ring_radius: 8,
            spawn_centres: BTreeMap::from([
                (Faction::Red, HexCoord::new(-2_000, 0)),
                (Faction::Green, HexCoord::new(2_000, 100)),
                (Faction::Blue, HexCoord::new(0, -2_000)),
            ]),
            armour_repair_hp_per_block: 500,
            armour_repair_cost_milli: 10,
            blueprint_copy_blocks: 10,
            blueprint_copy_cost: 1,
            construction_cost: 1,
            max_chosen_speed: 1_000_000,
            max_coin_amount: 100_000_000_000,
            prizes: vec![
                PrizeConfig {
                    name: "gold".to_owned(),
                    available: 3,
                    chance: Fraction::new(1, 1_000),
                    low_chance: Fraction::new(1, 2_000),
                },
                PrizeConfig {
                    name: "silver".to_owned(),
                    available: 10_000,
                    chance: Fraction::new(100, 1_000),
                    low_chance: Fraction::new(55, 1_000),
                },
                PrizeConfig {
                    name: "bronze".to_owned(),
                    available: 1,
                    chance: Fraction::new(10, 1_000),
                    low_chance: Fraction::new(5, 1_000),
                },
            ],
            resources,
            low_prize_zones: vec![Zone {
                centre: HexCoord::new(-3_000, 500),
                radius: 2_500,
            }],
        };

        Self { params, items, buildings }
    }
}
