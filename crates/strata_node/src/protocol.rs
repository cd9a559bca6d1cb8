//! JSON-lines command and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command received on stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Reset to the initial game state.
    Init,
    /// Process one block.
    Block {
        /// Full block data: `block` metadata plus `admin` and `moves`.
        data: Value,
    },
    /// Return the full game state as JSON.
    State,
    /// Return the state hash.
    Hash,
    /// Return the chain's initial-state block.
    InitialBlock,
}

/// A response written to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    /// Command executed.
    Ok {
        /// Command-specific payload, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Command failed.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl Response {
    /// A plain success without payload.
    #[must_use]
    pub fn ok() -> Self {
        Self::Ok { data: None }
    }

    /// A success carrying a payload.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self::Ok { data: Some(data) }
    }

    /// An error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}
