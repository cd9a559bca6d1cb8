//! Headless block-processing driver for the Strata engine.
//!
//! Exposes the host-chain callback surface over a JSON-lines protocol:
//! commands arrive one JSON object per line on stdin, responses leave as
//! one JSON object per line on stdout, logs go to stderr.  This is the
//! integration point for chain daemons, integration tests and replay
//! verification; the consensus logic itself lives in `strata_core`.

pub mod protocol;
pub mod runner;

pub use protocol::{Command, Response};
pub use runner::NodeRunner;
