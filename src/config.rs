//! Engine configuration
//!
//! `EngineConfig` carries the settings the transaction processor needs:
//! the wallet currency, the KYC-tier daily deposit caps, the lengths of the
//! daily and weekly deposit windows, the default bonus expiry and the TTL of
//! the advisory balance projection.

use chrono::Duration;
use rust_decimal::Decimal;

/// Default wallet currency
pub const DEFAULT_CURRENCY: &str = "INR";

/// Default daily deposit caps, indexed by KYC tier
pub const DEFAULT_TIER_CAPS: [i64; 3] = [10_000, 100_000, 1_000_000];

/// Default rolling deposit window
pub const DEFAULT_DEPOSIT_WINDOW_HOURS: i64 = 24;

/// Default window for weekly self-imposed deposit limits
pub const DEFAULT_WEEKLY_WINDOW_DAYS: i64 = 7;

/// Default lifetime of a bonus grant that names no expiry
pub const DEFAULT_BONUS_EXPIRY_DAYS: i64 = 30;

/// Default balance projection TTL
pub const DEFAULT_PROJECTION_TTL_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Currency assigned to new wallets
    pub currency: String,

    /// Daily deposit cap per KYC tier (index = tier)
    ///
    /// Tiers beyond the table use tier 0's cap.
    pub tier_caps: Vec<Decimal>,

    /// Length of the rolling deposit-limit window
    pub deposit_window: Duration,

    /// Length of the window for weekly self-imposed limits
    pub weekly_window: Duration,

    /// Expiry applied to bonus credits that arrive without one
    pub bonus_expiry: Duration,

    /// How long a published balance stays fresh in the projection
    pub projection_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            tier_caps: DEFAULT_TIER_CAPS.iter().map(|&cap| Decimal::from(cap)).collect(),
            deposit_window: Duration::hours(DEFAULT_DEPOSIT_WINDOW_HOURS),
            weekly_window: Duration::days(DEFAULT_WEEKLY_WINDOW_DAYS),
            bonus_expiry: Duration::days(DEFAULT_BONUS_EXPIRY_DAYS),
            projection_ttl: Duration::seconds(DEFAULT_PROJECTION_TTL_SECS),
        }
    }
}

impl EngineConfig {
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Replace the tier cap table
    ///
    /// An empty table keeps the defaults.
    pub fn with_tier_caps(mut self, caps: Vec<Decimal>) -> Self {
        if !caps.is_empty() {
            self.tier_caps = caps;
        }
        self
    }

    /// Replace the default bonus expiry; non-positive values are ignored
    pub fn with_bonus_expiry(mut self, expiry: Duration) -> Self {
        if expiry > Duration::zero() {
            self.bonus_expiry = expiry;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.currency, "INR");
        assert_eq!(
            config.tier_caps,
            vec![
                Decimal::from(10_000),
                Decimal::from(100_000),
                Decimal::from(1_000_000)
            ]
        );
        assert_eq!(config.deposit_window, Duration::hours(24));
        assert_eq!(config.weekly_window, Duration::days(7));
        assert_eq!(config.bonus_expiry, Duration::days(30));
        assert_eq!(config.projection_ttl, Duration::seconds(30));
    }

    #[test]
    fn test_empty_tier_caps_keep_defaults() {
        let config = EngineConfig::default().with_tier_caps(vec![]);
        assert_eq!(config.tier_caps.len(), 3);

        let config = EngineConfig::default().with_tier_caps(vec![Decimal::from(500)]);
        assert_eq!(config.tier_caps, vec![Decimal::from(500)]);
    }

    #[test]
    fn test_bonus_expiry_must_be_positive() {
        let config = EngineConfig::default().with_bonus_expiry(Duration::zero());
        assert_eq!(config.bonus_expiry, Duration::days(30));

        let config = EngineConfig::default().with_bonus_expiry(Duration::days(3));
        assert_eq!(config.bonus_expiry, Duration::days(3));
    }
}
