//! Headless Strata node driver.
//!
//! Reads JSON commands line by line from stdin and writes one JSON
//! response per line to stdout.  Logs go to stderr.
//!
//! ```bash
//! # Process a block on regtest
//! echo '{"cmd":"block","data":{...}}' | strata_node --chain regtest
//! ```

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_node::{Command, NodeRunner, Response};

#[derive(Parser)]
#[command(name = "strata_node")]
#[command(about = "Headless Strata game-state processor")]
#[command(version)]
struct Cli {
    /// Chain to run on (main, test or regtest).
    #[arg(long, default_value = "regtest")]
    chain: String,

    /// Enable verbose logging to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let Some(chain) = strata_core::config::Chain::from_str_opt(&cli.chain) else {
        eprintln!("unknown chain: {}", cli.chain);
        std::process::exit(1);
    };

    let mut runner = NodeRunner::new(chain);
    tracing::info!(chain = %cli.chain, "node driver ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Command>(&line) {
            Ok(cmd) => runner.execute(cmd),
            Err(e) => Response::error(format!("bad command: {e}")),
        };

        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &response).expect("response serializes");
        out.write_all(b"\n").expect("stdout writable");
        out.flush().expect("stdout flushable");
    }
}
