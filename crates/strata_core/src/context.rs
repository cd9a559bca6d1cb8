//! Per-block processing context.
//!
//! Bundles the immutable inputs of a block transition: chain, base map,
//! configuration, block height and timestamp.  The context is passed down
//! explicitly; nothing in the engine reads process-global state.

use crate::config::{Chain, Params, RoConfig};
use crate::forks::{Fork, ForkHandler};
use crate::map::BaseMap;

/// Immutable context of one block transition.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// The chain being processed.
    pub chain: Chain,
    /// The static base map.
    pub map: &'a BaseMap,
    /// The static configuration.
    pub config: &'a RoConfig,
    /// Height of the block being processed.
    pub height: u64,
    /// Timestamp of the block being processed.
    pub timestamp: i64,
}

impl<'a> Context<'a> {
    /// Create a context.
    #[must_use]
    pub fn new(
        chain: Chain,
        map: &'a BaseMap,
        config: &'a RoConfig,
        height: u64,
        timestamp: i64,
    ) -> Self {
        Self { chain, map, config, height, timestamp }
    }

    /// Shortcut to the consensus parameters.
    #[must_use]
    pub fn params(&self) -> &'a Params {
        &self.config.params
    }

    /// Whether the given fork is active at this block.
    #[must_use]
    pub fn fork_active(&self, fork: Fork) -> bool {
        ForkHandler::new(self.chain, self.height).is_active(fork)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_state_follows_height() {
        let cfg = RoConfig::for_chain(Chain::Regtest);
        let map = BaseMap::for_params(&cfg.params);

        let before = Context::new(Chain::Regtest, &map, &cfg, 499, 0);
        let after = Context::new(Chain::Regtest, &map, &cfg, 500, 0);
        assert!(!before.fork_active(Fork::UnblockSpawns));
        assert!(after.fork_active(Fork::UnblockSpawns));
    }
}
