//! # Strata Core
//!
//! Deterministic state-transition engine for the Strata game world.
//!
//! For every confirmed block of the host chain, the engine takes the
//! previous world state together with the block's metadata, admin commands
//! and player moves, and computes the next state.  Every node on the
//! network must arrive at a bit-identical result, so this crate contains
//! **only** deterministic logic:
//! - No IO
//! - No system randomness (a single seeded stream drives all rolls)
//! - No floating-point math (all consensus arithmetic is exact integers)
//! - No hash-order iteration (all state tables are ordered maps)
//!
//! ## Crate Structure
//!
//! - [`hex`] - axial hex-grid primitives
//! - [`map`] - read-only base-map oracle (passability, regions, safe zones)
//! - [`rnd`] - deterministic random stream seeded from the block hash
//! - [`world`] - the entity store holding all per-block state
//! - [`pathfinder`] - hex path finding with faction-aware edge weights
//! - [`moves`] - parsing and processing of admin and player moves
//! - [`ongoings`] - multi-block operation scheduling
//! - [`combat`] - target acquisition, damage dealing and kill processing
//! - [`pipeline`] - the per-block phase driver

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buildings;
pub mod coins;
pub mod combat;
pub mod components;
pub mod config;
pub mod context;
pub mod dynobstacles;
pub mod error;
pub mod fame;
pub mod fitments;
pub mod forks;
pub mod hex;
pub mod inventory;
pub mod map;
pub mod mining;
pub mod modifier;
pub mod movement;
pub mod moves;
pub mod ongoings;
pub mod pathfinder;
pub mod pipeline;
pub mod prospecting;
pub mod rnd;
pub mod services;
pub mod spawn;
pub mod trading;
pub mod validation;
pub mod world;

/// Re-export of commonly used types.
pub mod prelude {
    pub use crate::components::{Attack, AttackDamage, CombatData, Faction, HpPair, TargetKey, HP};
    pub use crate::config::{Chain, RoConfig};
    pub use crate::context::Context;
    pub use crate::error::{Result, StateError};
    pub use crate::forks::{Fork, ForkHandler};
    pub use crate::hex::HexCoord;
    pub use crate::inventory::{Inventory, Quantity, MAX_ITEM_QUANTITY};
    pub use crate::map::BaseMap;
    pub use crate::pipeline::GameLogic;
    pub use crate::rnd::Random;
    pub use crate::world::{IdT, WorldState};
}
