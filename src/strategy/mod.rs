//! Processing strategy module for feed replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and wallet processing. This allows different
//! implementations (synchronous, asynchronous batch) to be selected at runtime.

use crate::cli::StrategyType;
use crate::config::EngineConfig;
use crate::types::{Receipt, TransactionRecord, WalletError};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads feed records from a CSV file, applies them through a
/// fresh in-memory processor and writes the final wallet states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the feed at `input_path` and write final wallets to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the feed was replayed (rejected rows included)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// Malformed rows and rejected operations are logged and skipped; they
    /// never cause this method to return an error.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sync or Async
/// * `engine` - Processor configuration shared by both strategies
/// * `batch` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    engine: EngineConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(engine)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            engine,
            batch.unwrap_or_default(),
        )),
    }
}

/// Log the outcome of one replayed record
pub(crate) fn report(
    record: &TransactionRecord,
    result: &Result<Option<Receipt>, WalletError>,
) {
    match result {
        Ok(Some(receipt)) if receipt.replayed => {
            debug!(user = %record.user, tx = %record.tx, "duplicate feed row replayed");
        }
        Ok(_) => {}
        Err(e) => {
            warn!(
                user = %record.user,
                tx = %record.tx,
                error = %e,
                status = e.status_code(),
                "feed row rejected"
            );
        }
    }
}
