//! Command execution against a game-state instance.

use serde_json::json;

use strata_core::prelude::*;

use crate::protocol::{Command, Response};

/// Holds the engine and the current state, executing protocol commands.
pub struct NodeRunner {
    logic: GameLogic,
    state: WorldState,
}

impl NodeRunner {
    /// Create a runner with a freshly initialised state.
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        let logic = GameLogic::new(chain);
        let state = logic.initialise_state();
        Self { logic, state }
    }

    /// Read access to the current state.
    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Execute one command and produce its response.
    pub fn execute(&mut self, cmd: Command) -> Response {
        match cmd {
            Command::Init => {
                self.state = self.logic.initialise_state();
                Response::ok()
            }
            Command::Block { data } => match self.logic.update_state(&mut self.state, &data) {
                Ok(()) => Response::with_data(json!({"hash": self.state.state_hash()})),
                Err(e) => Response::error(e.to_string()),
            },
            Command::State => match serde_json::to_value(&self.state) {
                Ok(v) => Response::with_data(v),
                Err(e) => Response::error(e.to_string()),
            },
            Command::Hash => Response::with_data(json!({"hash": self.state.state_hash()})),
            Command::InitialBlock => {
                let (height, hash) = self.logic.initial_state_block();
                Response::with_data(json!({"height": height, "hash": hash}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64) -> Command {
        Command::Block {
            data: json!({
                "block": {
                    "height": height,
                    "timestamp": 1_000 + height as i64,
                    "rngseed":
                        "6f750b36d22f1dc3d0a6e483af45301022646dfc3b3ba2187865f5a7d6d83ab1"
                },
                "moves": [],
            }),
        }
    }

    #[test]
    fn block_processing_reports_the_state_hash() {
        let mut runner = NodeRunner::new(Chain::Regtest);

        match runner.execute(block(1)) {
            Response::Ok { data } => {
                let hash = data.unwrap()["hash"].as_str().unwrap().to_owned();
                assert_eq!(hash, runner.state().state_hash());
            }
            Response::Error { message } => panic!("block failed: {message}"),
        }
    }

    #[test]
    fn init_resets_the_state() {
        let mut runner = NodeRunner::new(Chain::Regtest);
        let initial = runner.state().state_hash();
        runner.execute(block(1));
        runner.execute(Command::Init);
        assert_eq!(runner.state().state_hash(), initial);
    }

    #[test]
    fn malformed_blocks_report_errors() {
        let mut runner = NodeRunner::new(Chain::Regtest);
        let response = runner.execute(Command::Block { data: json!({}) });
        assert!(matches!(response, Response::Error { .. }));
    }

    #[test]
    fn initial_block_constants() {
        let mut runner = NodeRunner::new(Chain::Regtest);
        match runner.execute(Command::InitialBlock) {
            Response::Ok { data } => {
                assert_eq!(data.unwrap()["height"], 0);
            }
            Response::Error { message } => panic!("{message}"),
        }
    }
}
