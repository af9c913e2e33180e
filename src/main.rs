//! Wallet ledger feed replay CLI
//!
//! Replays a CSV feed of wallet operations through the ledger engine and
//! prints the final wallets as CSV on stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- feed.csv > wallets.csv
//! cargo run -- --strategy sync feed.csv > wallets.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 feed.csv > wallets.csv
//! cargo run -- --currency USD --tier-cap 500 --tier-cap 5000 --log-level debug feed.csv
//! ```
//!
//! # Processing Strategies
//!
//! - **sync**: Sequential replay in file order
//! - **async**: Batched replay, users partitioned across tokio tasks (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, output failure)

use std::process;
use tracing::error;
use wallet_ledger_engine::{cli, logging, strategy};

fn main() {
    let args = cli::parse_args();
    logging::init(args.log_level.as_deref());

    let batch = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy.clone(), args.to_engine_config(), batch);

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        error!(error = %e, input = %args.input_file.display(), "feed replay failed");
        process::exit(1);
    }
}
