//! End-to-end integration tests
//!
//! These tests validate the complete feed replay pipeline using predefined
//! CSV fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays every row through a fresh processor
//! 3. Generates the wallet CSV
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path deposits, bonuses, bets and withdrawals
//! - Bet lock and settlement flows, including settlement errors
//! - Bucket priorities for withdrawals and bets
//! - Rejections (insufficient funds, daily limits, suspended wallets)
//! - User-chosen deposit limits and self-exclusion
//! - Idempotent replays and key conflicts
//! - Malformed rows and currency rounding
//!
//! Each fixture is run with both the sync and the async strategy.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;
    use wallet_ledger_engine::cli::StrategyType;
    use wallet_ledger_engine::config::EngineConfig;
    use wallet_ledger_engine::strategy::{create_strategy, BatchConfig};

    /// Replay `tests/fixtures/{fixture_name}/input.csv` and compare with expected.csv
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType, batch: Option<BatchConfig>) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let strategy = create_strategy(strategy_type.clone(), EngineConfig::default(), batch);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay feed: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("bet_lifecycle")]
    #[case("withdraw_priority")]
    #[case("insufficient_funds")]
    #[case("daily_limits")]
    #[case("idempotent_replays")]
    #[case("suspended_wallet")]
    #[case("malformed_data")]
    #[case("settlement_errors")]
    #[case("bonus_expiry")]
    #[case("interleaved_users")]
    #[case("self_limits")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy, None);
    }

    /// Tiny batches force every user's rows to span several batches
    #[rstest]
    #[case("happy_path")]
    #[case("idempotent_replays")]
    #[case("suspended_wallet")]
    #[case("bonus_expiry")]
    #[case("self_limits")]
    fn test_fixtures_with_small_batches(#[case] fixture: &str, #[values(1, 3)] batch_size: usize) {
        run_test_fixture(
            fixture,
            StrategyType::Async,
            Some(BatchConfig::new(batch_size, 2)),
        );
    }
}
