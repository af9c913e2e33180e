//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. It coordinates the SyncReader (CSV input) with an
//! in-memory TransactionProcessor (wallet logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Wallet operations to `TransactionProcessor::apply`
//! - CSV output to `csv_format::write_wallets_csv`
//!
//! # Memory Efficiency
//!
//! Records are streamed one at a time. Memory grows with the number of
//! wallets and journal entries, not with the size of the input file.

use crate::config::EngineConfig;
use crate::core::{InMemoryProcessor, SystemClock};
use crate::io::csv_format::write_wallets_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{report, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use wallet_ledger_engine::config::EngineConfig;
/// use wallet_ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(EngineConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("feed.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    engine: EngineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(engine: EngineConfig) -> Self {
        Self { engine }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the feed sequentially
    ///
    /// 1. Creates a fresh in-memory processor
    /// 2. Streams records from the CSV file and applies each in file order
    /// 3. Writes the final wallets with `write_wallets_csv`
    ///
    /// Fatal errors (file not found, I/O errors) are returned immediately.
    /// Row errors are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let processor = InMemoryProcessor::in_memory(&self.engine, Arc::new(SystemClock));
        let reader = SyncReader::new(input_path)?;

        let mut applied = 0usize;
        let mut skipped = 0usize;
        for result in reader {
            match result {
                Ok(record) => {
                    let outcome = processor.apply(&record);
                    report(&record, &outcome);
                    if outcome.is_ok() {
                        applied += 1;
                    } else {
                        skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed record");
                    skipped += 1;
                }
            }
        }

        info!(applied, skipped, strategy = "sync", "feed replayed");

        write_wallets_csv(&processor.all_wallets(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,tx,amount,payout,won,reference\n";

    /// Helper function to create a temporary feed for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(format!("{}{}", HEADER, rows).as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(rows: &str) -> String {
        let file = create_temp_csv(rows);
        let mut output = Vec::new();
        SyncProcessingStrategy::default()
            .process(file.path(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sync_strategy_processes_valid_deposit() {
        let output = run("deposit,alice,a-1,100.00,,,\n");

        assert_eq!(
            output,
            "user,deposit,bonus,winnings,locked,available,status\n\
             alice,100.00,0.00,0.00,0.00,100.00,ACTIVE\n"
        );
    }

    #[test]
    fn test_sync_strategy_bet_lifecycle() {
        let output = run("deposit,alice,a-1,100,,,\n\
                          lock,alice,a-2,40,,,\n\
                          settle,alice,a-3,40,100,true,match-1\n");

        assert!(
            output.contains("alice,60.00,0.00,100.00,0.00,160.00,ACTIVE"),
            "{}",
            output
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = SyncProcessingStrategy::default().process(Path::new("nonexistent.csv"), &mut output);

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_skips_rejected_operations() {
        let output = run("deposit,alice,a-1,50,,,\n\
                          withdrawal,alice,a-2,80,,,\n\
                          deposit,alice,a-1,50,,,\n");

        assert!(output.contains("alice,50.00,0.00,0.00,0.00,50.00,ACTIVE"), "{}", output);
    }

    #[test]
    fn test_sync_strategy_continues_on_malformed_record() {
        let output = run("deposit,alice,a-1,100.0,,,\n\
                          deposit,bob,b-1,invalid,,,\n\
                          deposit,carol,c-1,50.0,,,\n");

        assert!(output.contains("alice,"));
        assert!(!output.contains("bob,"));
        assert!(output.contains("carol,"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }

    #[test]
    fn test_sync_strategy_uses_configured_tier_caps() {
        let file = create_temp_csv("deposit,alice,a-1,150,,,\n");
        let engine = EngineConfig::default().with_tier_caps(vec![rust_decimal::Decimal::from(100)]);
        let mut output = Vec::new();

        SyncProcessingStrategy::new(engine)
            .process(file.path(), &mut output)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("alice,0.00,0.00,0.00,0.00,0.00,ACTIVE"), "{}", output);
    }
}
