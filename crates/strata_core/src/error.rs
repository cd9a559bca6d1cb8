//! Error types for the state-transition engine.
//!
//! Only conditions that a caller can reasonably handle are errors here.
//! Consensus invariant violations are *not* errors: they abort the process
//! via panics, since a node whose state diverged must halt rather than
//! continue on a broken state.

use thiserror::Error;

/// Result type alias using [`StateError`].
pub type Result<T> = std::result::Result<T, StateError>;

/// Top-level error type for non-fatal engine failures.
#[derive(Debug, Error)]
pub enum StateError {
    /// The block JSON did not have the expected structure.
    #[error("Malformed block data: {0}")]
    MalformedBlock(String),

    /// A chain name could not be recognised.
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// A block-hash seed string was not valid hex of the right length.
    #[error("Invalid block hash seed: {0}")]
    InvalidSeed(String),

    /// State serialization failed.
    #[error("State serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
