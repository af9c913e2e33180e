use crate::config::EngineConfig;
use crate::strategy::BatchConfig;
use chrono::Duration;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Replay a wallet operation feed and print the final wallets
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Replay a wallet operation feed and print the final wallets", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing feed records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the feed
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for batched"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of runtime worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Currency assigned to new wallets
    #[arg(long = "currency", value_name = "CODE", default_value = crate::config::DEFAULT_CURRENCY)]
    pub currency: String,

    /// Daily deposit cap per KYC tier, in tier order
    #[arg(
        long = "tier-cap",
        value_name = "AMOUNT",
        help = "Daily deposit cap; repeat once per KYC tier starting at tier 0"
    )]
    pub tier_caps: Vec<Decimal>,

    /// Lifetime of bonus credits in days
    #[arg(
        long = "bonus-expiry-days",
        value_name = "DAYS",
        help = "Days before a bonus credit expires (default: 30)"
    )]
    pub bonus_expiry_days: Option<u32>,

    /// Log filter, overrides RUST_LOG
    #[arg(long = "log-level", value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are replaced with
    /// defaults by `BatchConfig::new`.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_currency(self.currency.clone())
            .with_tier_caps(self.tier_caps.clone());
        match self.bonus_expiry_days {
            Some(days) => config.with_bonus_expiry(Duration::days(i64::from(days))),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "input.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], None, Some(8))]
    #[case::no_options(&["program", "input.csv"], None, None)]
    #[case::all_options(
        &["program", "--strategy", "async", "--batch-size", "2000", "--max-concurrent", "8", "input.csv"],
        Some(2000),
        Some(8)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent_batches, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        let config = parsed.to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_engine_config_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "input.csv"]).unwrap();

        assert_eq!(parsed.to_engine_config(), EngineConfig::default());
        assert_eq!(parsed.log_level, None);
    }

    #[test]
    fn test_engine_config_from_flags() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--currency",
            "USD",
            "--tier-cap",
            "500",
            "--tier-cap",
            "5000.50",
            "--bonus-expiry-days",
            "14",
            "--log-level",
            "debug",
            "input.csv",
        ])
        .unwrap();

        let config = parsed.to_engine_config();
        assert_eq!(config.currency, "USD");
        assert_eq!(config.bonus_expiry, Duration::days(14));
        assert_eq!(
            config.tier_caps,
            vec![Decimal::from(500), Decimal::new(500050, 2)]
        );
        assert_eq!(parsed.log_level.as_deref(), Some("debug"));
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::invalid_tier_cap(&["program", "--tier-cap", "lots", "input.csv"])]
    #[case::negative_bonus_expiry(&["program", "--bonus-expiry-days", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
