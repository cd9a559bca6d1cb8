//! Named hardforks and their activation state.
//!
//! Rule changes are gated through [`ForkHandler`] so that consensus code
//! never branches on raw block heights directly.  Each fork activates at a
//! fixed per-chain height.

use crate::config::Chain;

/// Hardforks of the game rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    /// Test fork without any rule changes, used to exercise the fork
    /// machinery itself.
    Dummy,

    /// Fixes blocked spawn areas:  new characters spawn inside their
    /// faction's starter building rather than on the ring around it, and
    /// vehicles no longer block movement outright but heavily slow down
    /// entering an occupied tile.
    UnblockSpawns,
}

/// Exposes the activation state of forks for a particular block height.
#[derive(Debug, Clone, Copy)]
pub struct ForkHandler {
    chain: Chain,
    height: u64,
}

impl ForkHandler {
    /// Create a handler for the given chain and block height.
    #[must_use]
    pub const fn new(chain: Chain, height: u64) -> Self {
        Self { chain, height }
    }

    /// Returns true if the given fork is active at this height.
    #[must_use]
    pub fn is_active(&self, fork: Fork) -> bool {
        let activation = match (fork, self.chain) {
            (Fork::Dummy, Chain::Main) => 3_000_000,
            (Fork::Dummy, Chain::Test) => 150_000,
            (Fork::Dummy, Chain::Regtest) => 1_000,

            (Fork::UnblockSpawns, Chain::Main) => 1_460_000,
            (Fork::UnblockSpawns, Chain::Test) => 72_000,
            (Fork::UnblockSpawns, Chain::Regtest) => 500,
        };
        self.height >= activation
    }
}
