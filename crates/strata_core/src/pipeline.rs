//! The per-block state-transition driver.
//!
//! The phase order in [`GameLogic::update_state`] is contract, not
//! convenience: every phase both consumes the shared random stream and
//! observes the state left behind by its predecessors, so reordering any
//! two phases desynchronises the network.

use serde_json::Value;

use crate::buildings;
use crate::combat;
use crate::config::{Chain, RoConfig};
use crate::context::Context;
use crate::dynobstacles::DynObstacles;
use crate::error::{Result, StateError};
use crate::map::BaseMap;
use crate::mining;
use crate::movement;
use crate::moves::MoveProcessor;
use crate::ongoings;
use crate::rnd::Random;
use crate::validation;
use crate::world::WorldState;

/// The state-transition engine for one chain.
///
/// Owns the immutable per-chain inputs (configuration and base map) and
/// implements the host-chain callback surface against [`WorldState`]
/// values.
pub struct GameLogic {
    chain: Chain,
    config: RoConfig,
    map: BaseMap,
}

impl GameLogic {
    /// Create the engine for a chain.
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        let config = RoConfig::for_chain(chain);
        let map = BaseMap::for_params(&config.params);
        Self { chain, config, map }
    }

    /// The chain this engine runs on.
    #[must_use]
    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// The static configuration.
    #[must_use]
    pub fn config(&self) -> &RoConfig {
        &self.config
    }

    /// The static base map.
    #[must_use]
    pub fn map(&self) -> &BaseMap {
        &self.map
    }

    /// Height and block hash from which the game starts on this chain.
    #[must_use]
    pub fn initial_state_block(&self) -> (u64, &'static str) {
        match self.chain {
            Chain::Main => (
                1_439_030,
                "58199cbb9398e8ed93c86fd837b71312e8603cad2d561464fa8f547a9631a9ad",
            ),
            Chain::Test => (
                71_320,
                "d108326a2fa4d4295a323d1203f46b49cddf88798b5e9b1f9be62f5be2d2fa52",
            ),
            Chain::Regtest => (
                0,
                "6f750b36d22f1dc3d0a6e483af45301022646dfc3b3ba2187865f5a7d6d83ab1",
            ),
        }
    }

    /// Build the initial game state: the seeded map buildings.
    #[must_use]
    pub fn initialise_state(&self) -> WorldState {
        let mut state = WorldState::new();
        buildings::initialise_buildings(&mut state, &self.config);
        state
    }

    /// Process one block: parse the block metadata and seed, then run
    /// the full transition pipeline.
    ///
    /// The block JSON carries `block: {height, timestamp, rngseed}` plus
    /// the `admin` and `moves` arrays; unknown fields are ignored.
    pub fn update_state(&self, state: &mut WorldState, block_data: &Value) -> Result<()> {
        let block = block_data
            .get("block")
            .and_then(Value::as_object)
            .ok_or_else(|| StateError::MalformedBlock("missing block object".into()))?;
        let height = block
            .get("height")
            .and_then(Value::as_u64)
            .ok_or_else(|| StateError::MalformedBlock("missing height".into()))?;
        let timestamp = block
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| StateError::MalformedBlock("missing timestamp".into()))?;
        let seed = block
            .get("rngseed")
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::MalformedBlock("missing rngseed".into()))?;
        let mut rnd = Random::from_block_hash(seed)?;

        let empty = Value::Array(Vec::new());
        let admin = block_data.get("admin").unwrap_or(&empty);
        let moves = block_data.get("moves").unwrap_or(&empty);

        self.update_state_with(state, &mut rnd, height, timestamp, admin, moves);
        Ok(())
    }

    /// The transition pipeline with all inputs already parsed.
    pub fn update_state_with(
        &self,
        state: &mut WorldState,
        rnd: &mut Random,
        height: u64,
        timestamp: i64,
        admin: &Value,
        moves: &Value,
    ) {
        let ctx = Context::new(self.chain, &self.map, &self.config, height, timestamp);
        tracing::debug!(height, "processing block");

        state
            .damage_lists
            .remove_old(ctx.params().damage_list_blocks, height);

        combat::all_hp_updates(state, rnd, &ctx);
        ongoings::process_all_ongoings(state, rnd, &ctx);

        let mut dyn_obstacles = DynObstacles::new(state, &self.config);
        {
            let mut proc = MoveProcessor::new(state, &mut dyn_obstacles, rnd, &ctx);
            proc.process_admin(admin);
            proc.process_all(moves);
        }

        mining::process_all_mining(state, rnd, &ctx);
        movement::process_all_movement(state, &mut dyn_obstacles, &ctx);

        // Entering buildings comes after moves and movement, so players
        // get in as soon as possible (even in the block confirming the
        // intent), and before combat targeting, so entering shelters
        // from this round's target acquisition.
        buildings::process_enter_buildings(state, &ctx);

        combat::find_combat_targets(state, rnd, &ctx);

        state.prune_empty_rows();

        if cfg!(debug_assertions) {
            validation::validate_state(state, &ctx);
        }
    }
}
