//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It replays the feed in batches with user-based
//! partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (user partitioning + tasks)
//!         └── InMemoryProcessor
//!             ├── InMemoryBalanceStore (per-user wallet locks)
//!             └── InMemoryLedgerJournal (idempotent journal)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed sequentially, so a user whose rows span batches
//!   still sees them in file order
//! - Within a batch, each user's rows run in one task, in file order
//! - Different users run concurrently on the tokio multi-threaded runtime

use crate::config::EngineConfig;
use crate::core::{BatchProcessor, InMemoryProcessor, SystemClock};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallets_csv;
use crate::strategy::{report, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch processing
///
/// Controls how records are batched and the number of runtime worker threads.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of records per batch
    pub batch_size: usize,
    /// Number of tokio worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "invalid batch_size 0, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches 0, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// AsyncProcessingStrategy is Send + Sync. Every call to `process` builds its
/// own runtime and its own in-memory processor.
#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    engine: EngineConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(engine: EngineConfig, config: BatchConfig) -> Self {
        Self { engine, config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the feed in batches
    ///
    /// 1. Creates a tokio multi-threaded runtime
    /// 2. Reads batches with AsyncReader
    /// 3. Applies each batch through BatchProcessor and waits for it
    /// 4. Writes the final wallets with `write_wallets_csv`
    ///
    /// Fatal errors (file not found, runtime errors) are returned immediately.
    /// Row errors are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = InMemoryProcessor::in_memory(&self.engine, Arc::new(SystemClock));
            let batch_processor = BatchProcessor::new(processor.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files need the compat shim
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for outcome in batch_processor.process_batch(batch).await {
                    report(&outcome.record, &outcome.result);
                    if outcome.result.is_ok() {
                        applied += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }

            info!(applied, rejected, strategy = "async", "feed replayed");

            write_wallets_csv(&processor.all_wallets(), output)
        })
    }
}
