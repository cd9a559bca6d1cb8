//! Data components shared by characters and buildings.
//!
//! These types are pure data.  They appear both in the per-chain static
//! configuration (as base stats of vehicles, fitments and buildings) and
//! in the world state (as the derived stats of concrete entities).  All of
//! them serialize deterministically.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::hex::HexCoord;
use crate::modifier::StatModifier;
use crate::world::IdT;

/// Player faction.
///
/// `Ancient` is reserved for neutral map structures; accounts and
/// characters never carry it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Faction {
    /// The red faction.
    Red,
    /// The green faction.
    Green,
    /// The blue faction.
    Blue,
    /// Neutral map structures.
    Ancient,
}

impl Faction {
    /// Parse the single-letter move encoding (`"r"`, `"g"`, `"b"`).
    #[must_use]
    pub fn from_move_str(s: &str) -> Option<Self> {
        match s {
            "r" => Some(Self::Red),
            "g" => Some(Self::Green),
            "b" => Some(Self::Blue),
            _ => None,
        }
    }

    /// The three playable factions, in their canonical order.
    pub const PLAYABLE: [Self; 3] = [Self::Red, Self::Green, Self::Blue];
}

/// A pair of armour and shield values.
///
/// Used for maximum HP, regeneration rates and damage amounts alike.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct HpPair {
    /// Armour component.
    pub armour: u32,
    /// Shield component.
    pub shield: u32,
}

impl HpPair {
    /// Create a new pair.
    #[must_use]
    pub const fn new(armour: u32, shield: u32) -> Self {
        Self { armour, shield }
    }

    /// Whether both components are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.armour == 0 && self.shield == 0
    }
}

/// Current hit points of a fighter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct HP {
    /// Full armour points.
    pub armour: u32,
    /// Full shield points.
    pub shield: u32,
    /// Partial (milli-)HP carried between blocks by regeneration,
    /// always below 1000 per component.
    pub mhp: HpPair,
}

impl HP {
    /// Total full HP.  A fighter dies when this reaches zero, regardless
    /// of partial HP.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.armour + self.shield
    }
}

/// Damage description of a single attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackDamage {
    /// Minimum damage roll.
    pub min: u32,
    /// Maximum damage roll (inclusive).
    pub max: u32,
    /// Weapon size class for hit-chance computation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_size: Option<u32>,
    /// Percentage of the base damage that can be applied to shields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shield_percent: Option<u32>,
    /// Percentage of the base damage that can be applied to armour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armour_percent: Option<u32>,
}

/// Non-damage effects inflicted by an attack for the following round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackEffects {
    /// Modification of the target's movement speed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<StatModifier>,
    /// Modification of the target's attack range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<StatModifier>,
    /// Modification of the target's hit chance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_chance: Option<StatModifier>,
    /// Modification of the target's shield regeneration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shield_regen: Option<StatModifier>,
    /// Whether the target is afflicted by a mentecon, making every
    /// fighter count as its enemy.
    #[serde(default)]
    pub mentecon: bool,
}

/// A single attack of a fighter.
///
/// Attacks with `range` target the selected enemy; if they additionally
/// have `area`, the splash is centred on the target.  Attacks with only
/// `area` are centred on the attacker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Targeting range, if this attack requires a selected target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<u32>,
    /// Area-of-effect radius, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    /// Whether this attack affects friendlies instead of enemies.
    #[serde(default)]
    pub friendlies: bool,
    /// Whether damage drained by this attack is returned to the attacker.
    #[serde(default)]
    pub gain_hp: bool,
    /// Damage dealt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<AttackDamage>,
    /// Effects inflicted, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<AttackEffects>,
}

/// Damage dealt to everything around a fighter when it is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfDestruct {
    /// Area of effect around the dying fighter.
    pub area: u32,
    /// Damage rolled against every fighter in the area.
    pub damage: AttackDamage,
}

/// Conditional combat boost active while armour is at or below a
/// percentage of its maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowHpBoost {
    /// Armour threshold in percent of maximum armour.
    pub max_hp_percent: u32,
    /// Damage modification while active.
    #[serde(default)]
    pub damage: StatModifier,
    /// Range modification while active.
    #[serde(default)]
    pub range: StatModifier,
}

/// Full combat capabilities of a fighter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatData {
    /// All attacks of the fighter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attacks: Vec<Attack>,
    /// Self-destruct charges triggered on death.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub self_destructs: Vec<SelfDestruct>,
    /// Conditional low-HP boosts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_hp_boosts: Vec<LowHpBoost>,
    /// Modification applied to all damage received.
    #[serde(default)]
    pub received_damage_modifier: StatModifier,
    /// Base modification of the fighter's own hit chance.
    #[serde(default)]
    pub hit_chance_modifier: StatModifier,
    /// Size class of the fighter as a target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_size: Option<u32>,
}

impl CombatData {
    /// Range of the fighter's attacks, or `None` if it has no matching
    /// attacks at all.  With `friendly` set, only friendly-area attacks
    /// are considered; otherwise only hostile ones.  For attacks centred
    /// on the attacker, the area counts as the range.
    #[must_use]
    pub fn attack_range(&self, friendly: bool) -> Option<u32> {
        self.attacks
            .iter()
            .filter(|a| a.friendlies == friendly)
            .filter_map(|a| a.range.or(a.area))
            .max()
    }
}

/// Combat effects currently applied to a fighter.
///
/// These are replaced wholesale at the end of each damage phase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CombatEffects {
    /// Accumulated speed modification.
    #[serde(default)]
    pub speed: StatModifier,
    /// Accumulated range modification.
    #[serde(default)]
    pub range: StatModifier,
    /// Accumulated hit-chance modification.
    #[serde(default)]
    pub hit_chance: StatModifier,
    /// Accumulated shield-regeneration modification.
    #[serde(default)]
    pub shield_regen: StatModifier,
    /// Whether a mentecon affliction is active.
    #[serde(default)]
    pub mentecon: bool,
}

/// Kind of a combat target.
///
/// The derived ordering (characters before buildings) together with the
/// id gives the canonical processing order for target sets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TargetKind {
    /// A character on the map.
    Character,
    /// A building.
    Building,
}

/// Canonical key identifying a fighter for ordering and lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TargetKey {
    /// Entity kind.
    pub kind: TargetKind,
    /// Database id.
    pub id: IdT,
}

impl TargetKey {
    /// Key for a character.
    #[must_use]
    pub const fn character(id: IdT) -> Self {
        Self { kind: TargetKind::Character, id }
    }

    /// Key for a building.
    #[must_use]
    pub const fn building(id: IdT) -> Self {
        Self { kind: TargetKind::Building, id }
    }
}

/// Active movement of a character.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Movement {
    /// Remaining waypoints, front first.
    pub waypoints: VecDeque<HexCoord>,
    /// Precomputed steps towards the first waypoint, front first.
    /// Recomputed lazily whenever empty or invalidated.
    pub steps: VecDeque<HexCoord>,
    /// Optional cap on the movement points spent per block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_speed: Option<u32>,
}

/// Volatile movement bookkeeping, reset whenever movement stops.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct VolatileMovement {
    /// Accumulated partial movement points toward the next step.
    pub partial_step: u32,
    /// Consecutive blocks the next step has been blocked.
    pub blocked_turns: u32,
}

/// Uniform per-block mining yield range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct MiningRate {
    /// Minimum units mined per block.
    pub min: u64,
    /// Maximum units mined per block (inclusive).
    pub max: u64,
}

/// Mining state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningData {
    /// Per-block yield range, derived from vehicle and fitments.
    pub rate: MiningRate,
    /// Whether the character is actively mining.
    pub active: bool,
}
