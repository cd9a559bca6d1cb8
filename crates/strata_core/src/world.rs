//! The entity store holding all per-block game state.
//!
//! Every persistent row lives in one of the ordered tables of
//! [`WorldState`].  Iteration over any table is deterministic because the
//! backing maps are ordered by their keys (ids, names or coordinates), so
//! no extra sorting pass is ever needed before consensus-relevant loops.
//!
//! Mutation follows the exclusive-borrow model: the `&mut` reference
//! returned by an accessor is the exclusive right to modify that row, and
//! changes are visible immediately.  A whole block transition either runs
//! to completion or the process aborts; there is no partial-state
//! recovery (see the crate-level notes on invariant failures).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::components::{
    CombatData, CombatEffects, Faction, HpPair, MiningData, Movement, TargetKey,
    VolatileMovement, HP,
};
use crate::error::Result;
use crate::fame::DamageLists;
use crate::hex::HexCoord;
use crate::inventory::{Inventory, Quantity};
use crate::map::RegionId;

/// Database identity of a row.
pub type IdT = u64;

/// Serde adapter storing an ordered map as a list of `(key, value)`
/// pairs.  JSON object keys must be strings, so maps keyed by
/// coordinates or tuples go through this representation; the list is in
/// key order, keeping the serialization canonical.
pub(crate) mod ordered_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        V: Serialize,
        S: Serializer,
    {
        let pairs: Vec<(&K, &V)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

/// A player account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account name (primary key).
    pub name: String,
    /// Chosen faction; `None` until the account is initialised.
    pub faction: Option<Faction>,
    /// Total kills credited to the account.
    pub kills: u64,
    /// Fame score.
    pub fame: i64,
    /// Banked coin balance.
    pub balance: i64,
}

impl Account {
    fn new(name: String) -> Self {
        Self { name, faction: None, kills: 0, fame: 0, balance: 0 }
    }
}

/// A character (vehicle) in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Database id.
    pub id: IdT,
    /// Owning account name.
    pub owner: String,
    /// Faction, always equal to the owner's.
    pub faction: Faction,
    /// Map position; `None` while inside a building.
    pub pos: Option<HexCoord>,
    /// Building the character is inside, if any.
    pub in_building: Option<IdT>,
    /// Building the character intends to enter, if any.
    pub enter_building: Option<IdT>,
    /// Remaining blocks of the current ongoing operation.
    pub busy_blocks: u32,
    /// Id of the current ongoing operation, if any.
    pub ongoing: Option<IdT>,
    /// Vehicle item type.
    pub vehicle: String,
    /// Equipped fitments.
    pub fitments: Vec<String>,
    /// Derived movement speed in movement points per block.
    pub speed: u32,
    /// Derived cargo space.
    pub cargo_space: u64,
    /// Carried items.
    pub inventory: Inventory,
    /// Derived combat capabilities.
    pub combat: CombatData,
    /// Current hit points.
    pub hp: HP,
    /// Derived maximum hit points.
    pub max_hp: HpPair,
    /// Derived regeneration in milli-HP per block.
    pub regen_mhp: HpPair,
    /// Combat effects applied to the character.
    pub effects: CombatEffects,
    /// Selected combat target.
    pub target: Option<TargetKey>,
    /// Whether friendlies are in range of a friendly-area attack.
    pub friendly_targets: bool,
    /// Active movement, if the character is moving.
    pub movement: Option<Movement>,
    /// Volatile movement bookkeeping.
    pub volatile_mv: VolatileMovement,
    /// Mining capability and state.
    pub mining: Option<MiningData>,
}

impl Character {
    /// Whether the character is locked by an ongoing operation.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy_blocks > 0
    }

    /// Whether the character is currently moving.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.movement.is_some()
    }

    /// Position used for combat; characters inside buildings do not take
    /// part in combat at all.
    #[must_use]
    pub fn combat_position(&self) -> Option<HexCoord> {
        self.pos
    }

    /// Remaining cargo space given the configured item table.
    #[must_use]
    pub fn free_cargo_space(&self, cfg: &crate::config::RoConfig) -> u64 {
        self.cargo_space.saturating_sub(self.inventory.used_space(cfg))
    }

    /// Whether regeneration can change anything for this fighter.
    #[must_use]
    pub fn can_regen(&self) -> bool {
        can_regen(&self.hp, &self.max_hp, &self.regen_mhp)
    }
}

/// Owner-tunable configuration of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OwnerConfig {
    /// Fee in percent charged by the owner on top of service base costs.
    pub service_fee_percent: u32,
}

/// A building on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Database id.
    pub id: IdT,
    /// Building type name.
    pub typ: String,
    /// Owning account; `None` for ancient map seeds.
    pub owner: Option<String>,
    /// Faction of the building.
    pub faction: Faction,
    /// Centre tile.
    pub centre: HexCoord,
    /// Shape rotation in sixths of a full turn.
    pub rotation: u32,
    /// Whether this is still an unfinished foundation.
    pub foundation: bool,
    /// Materials stored for construction while a foundation.
    pub construction_inventory: Inventory,
    /// Ongoing construction operation, if one is running.
    pub ongoing_construction: Option<IdT>,
    /// Combat capabilities.
    pub combat: CombatData,
    /// Current hit points.
    pub hp: HP,
    /// Maximum hit points.
    pub max_hp: HpPair,
    /// Regeneration in milli-HP per block.
    pub regen_mhp: HpPair,
    /// Combat effects applied to the building.
    pub effects: CombatEffects,
    /// Selected combat target.
    pub target: Option<TargetKey>,
    /// Whether friendlies are in range of a friendly-area attack.
    pub friendly_targets: bool,
    /// Owner-tunable configuration.
    pub owner_config: OwnerConfig,
}

impl Building {
    /// Whether regeneration can change anything for this building.
    #[must_use]
    pub fn can_regen(&self) -> bool {
        can_regen(&self.hp, &self.max_hp, &self.regen_mhp)
    }
}

fn can_regen(hp: &HP, max_hp: &HpPair, regen: &HpPair) -> bool {
    (regen.armour > 0 && hp.armour < max_hp.armour)
        || (regen.shield > 0 && hp.shield < max_hp.shield)
}

/// Result of a finished prospection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospection {
    /// Name of the prospecting account.
    pub name: String,
    /// Height at which prospection finished.
    pub height: u64,
    /// Resource found in the region.
    pub resource: String,
}

/// A map region's mutable state.
///
/// Rows are materialised lazily on first non-trivial change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    /// Units of the prospected resource left to mine.
    pub resource_left: Quantity,
    /// Finished prospection result, if any.
    pub prospection: Option<Prospection>,
    /// Character currently prospecting the region, if any.
    pub prospecting_character: Option<IdT>,
}

impl Region {
    /// Whether the row carries any information worth persisting.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.resource_left == 0
            && self.prospection.is_none()
            && self.prospecting_character.is_none()
    }
}

/// Variant data of an ongoing multi-block operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OngoingKind {
    /// A character prospecting a region.
    Prospection {
        /// The region being prospected.
        region: RegionId,
    },
    /// Armour repair inside a building.
    ArmourRepair,
    /// Copying a blueprint inside a building.
    BlueprintCopy {
        /// Account the blueprints belong to.
        account: String,
        /// Original blueprint type, returned when done.
        original_type: String,
        /// Copy blueprint type produced.
        copy_type: String,
        /// Number of copies being made.
        num_copies: Quantity,
    },
    /// Constructing items from a blueprint inside a building.
    ItemConstruction {
        /// Account the output belongs to.
        account: String,
        /// Item type being produced.
        output_type: String,
        /// Items still to be delivered by this operation.
        num_items: Quantity,
        /// Original blueprint to return when the last batch is done;
        /// `None` when construction runs from consumed copies.
        original_type: Option<String>,
    },
    /// Promoting a foundation to a full building.
    BuildingConstruction,
    /// Applying a new owner configuration to a building.
    BuildingConfigUpdate {
        /// The configuration to swap in.
        new_config: OwnerConfig,
    },
}

/// An ongoing multi-block operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OngoingOp {
    /// Database id.
    pub id: IdT,
    /// Height at which the operation is processed next.
    pub height: u64,
    /// Character owning the operation, if any.
    pub character_id: Option<IdT>,
    /// Building owning the operation, if any.
    pub building_id: Option<IdT>,
    /// Variant data.
    pub op: OngoingKind,
}

/// Side of a trade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buying items; coins are reserved.
    Bid,
    /// Selling items; items are reserved.
    Ask,
}

/// An open trade order inside a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Database id; also the time priority.
    pub id: IdT,
    /// Building hosting the order.
    pub building_id: IdT,
    /// Account that placed the order.
    pub account: String,
    /// Item being traded.
    pub item: String,
    /// Remaining quantity.
    pub quantity: Quantity,
    /// Price per unit in coins.
    pub price: i64,
    /// Bid or ask.
    pub side: OrderSide,
}

/// The complete game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Next id to hand out.
    next_id: IdT,
    /// Accounts by name.
    pub accounts: BTreeMap<String, Account>,
    /// Characters by id.
    pub characters: BTreeMap<IdT, Character>,
    /// Buildings by id.
    pub buildings: BTreeMap<IdT, Building>,
    /// Regions by region id (lazily materialised).
    pub regions: BTreeMap<RegionId, Region>,
    /// Ongoing operations by id.
    pub ongoings: BTreeMap<IdT, OngoingOp>,
    /// Open trade orders by id.
    pub orders: BTreeMap<IdT, Order>,
    /// Loot piles on the ground by coordinate.
    #[serde(with = "ordered_pairs")]
    pub ground_loot: BTreeMap<HexCoord, Inventory>,
    /// Per-building, per-account item deposits.
    #[serde(with = "ordered_pairs")]
    pub building_inventories: BTreeMap<(IdT, String), Inventory>,
    /// Combat damage attribution lists.
    pub damage_lists: DamageLists,
    /// Global found counters for prizes.
    pub item_counts: BTreeMap<String, u64>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            accounts: BTreeMap::new(),
            characters: BTreeMap::new(),
            buildings: BTreeMap::new(),
            regions: BTreeMap::new(),
            ongoings: BTreeMap::new(),
            orders: BTreeMap::new(),
            ground_loot: BTreeMap::new(),
            building_inventories: BTreeMap::new(),
            damage_lists: DamageLists::default(),
            item_counts: BTreeMap::new(),
        }
    }

    /// Hand out the next database id.
    pub fn allocate_id(&mut self) -> IdT {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Make sure all ids up to and including `id` are considered used.
    /// The initial map seed reserves a fixed range so that later tweaks
    /// to initialisation do not shift regular ids.
    pub fn reserve_ids_up_to(&mut self, id: IdT) {
        if self.next_id <= id {
            self.next_id = id + 1;
        }
    }

    /// Get or create the account row for a name.
    pub fn account_mut(&mut self, name: &str) -> &mut Account {
        self.accounts
            .entry(name.to_owned())
            .or_insert_with(|| Account::new(name.to_owned()))
    }

    /// Number of characters owned by the given account.
    #[must_use]
    pub fn character_count(&self, owner: &str) -> u32 {
        self.characters.values().filter(|c| c.owner == owner).count() as u32
    }

    /// Create a new character row with empty stats.  The caller derives
    /// vehicle stats and sets the position afterwards.
    pub fn create_character(&mut self, owner: &str, faction: Faction, vehicle: &str) -> IdT {
        assert!(faction != Faction::Ancient, "characters cannot be ancient");
        let id = self.allocate_id();
        self.characters.insert(
            id,
            Character {
                id,
                owner: owner.to_owned(),
                faction,
                pos: None,
                in_building: None,
                enter_building: None,
                busy_blocks: 0,
                ongoing: None,
                vehicle: vehicle.to_owned(),
                fitments: Vec::new(),
                speed: 0,
                cargo_space: 0,
                inventory: Inventory::new(),
                combat: CombatData::default(),
                hp: HP::default(),
                max_hp: HpPair::default(),
                regen_mhp: HpPair::default(),
                effects: CombatEffects::default(),
                target: None,
                friendly_targets: false,
                movement: None,
                volatile_mv: VolatileMovement::default(),
                mining: None,
            },
        );
        id
    }

    /// Create a new building row with empty stats.
    pub fn create_building(
        &mut self,
        typ: &str,
        owner: Option<&str>,
        faction: Faction,
        centre: HexCoord,
        rotation: u32,
    ) -> IdT {
        let id = self.allocate_id();
        self.buildings.insert(
            id,
            Building {
                id,
                typ: typ.to_owned(),
                owner: owner.map(str::to_owned),
                faction,
                centre,
                rotation,
                foundation: false,
                construction_inventory: Inventory::new(),
                ongoing_construction: None,
                combat: CombatData::default(),
                hp: HP::default(),
                max_hp: HpPair::default(),
                regen_mhp: HpPair::default(),
                effects: CombatEffects::default(),
                target: None,
                friendly_targets: false,
                owner_config: OwnerConfig::default(),
            },
        );
        id
    }

    /// Ids of all characters inside the given building, ascending.
    #[must_use]
    pub fn characters_in_building(&self, building: IdT) -> Vec<IdT> {
        self.characters
            .values()
            .filter(|c| c.in_building == Some(building))
            .map(|c| c.id)
            .collect()
    }

    /// Get or create the mutable region row.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        self.regions.entry(id).or_default()
    }

    /// Get or create the loot pile at a coordinate.
    pub fn loot_mut(&mut self, pos: HexCoord) -> &mut Inventory {
        self.ground_loot.entry(pos).or_default()
    }

    /// Get or create the deposit of an account in a building.
    pub fn building_inventory_mut(&mut self, building: IdT, account: &str) -> &mut Inventory {
        self.building_inventories
            .entry((building, account.to_owned()))
            .or_default()
    }

    /// Create a new ongoing operation and return its id.
    pub fn create_ongoing(
        &mut self,
        height: u64,
        character_id: Option<IdT>,
        building_id: Option<IdT>,
        op: OngoingKind,
    ) -> IdT {
        let id = self.allocate_id();
        self.ongoings
            .insert(id, OngoingOp { id, height, character_id, building_id, op });
        id
    }

    /// Delete all ongoing operations attached to a character.
    pub fn delete_ongoings_for_character(&mut self, character: IdT) {
        self.ongoings
            .retain(|_, op| op.character_id != Some(character));
    }

    /// Delete all ongoing operations attached to a building.
    pub fn delete_ongoings_for_building(&mut self, building: IdT) {
        self.ongoings.retain(|_, op| op.building_id != Some(building));
    }

    /// Drop empty loot piles, deposits and trivial region rows.
    ///
    /// Run at the end of each block so the serialized state never carries
    /// rows without content.
    pub fn prune_empty_rows(&mut self) {
        self.ground_loot.retain(|_, inv| !inv.is_empty());
        self.building_inventories.retain(|_, inv| !inv.is_empty());
        self.regions.retain(|_, r| !r.is_trivial());
    }

    /// Serialize the state to canonical JSON bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a state previously produced by [`Self::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Hex-encoded SHA-256 over the canonical serialization.
    ///
    /// All tables are ordered maps, so equal states hash equally.
    #[must_use]
    pub fn state_hash(&self) -> String {
        let bytes = self.serialize().expect("state must serialize");
        hex::encode(Sha256::digest(bytes))
    }
}
