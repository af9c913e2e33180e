//! Deposit limits
//!
//! Three rules gate every deposit: the KYC-tier daily cap, the limits the
//! user set on themselves (daily and weekly) and a running self-exclusion.
//! The counters and settings live on the wallet row, so the window resets
//! and the reservation all happen inside the caller's locked unit of work and
//! concurrent deposits for one user cannot race a reset.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::types::{LimitPeriod, Wallet, WalletError};

#[derive(Debug, Clone)]
pub struct LimitEnforcer {
    caps: Vec<Decimal>,
    window: Duration,
    weekly_window: Duration,
}

impl LimitEnforcer {
    pub fn new(caps: Vec<Decimal>, window: Duration, weekly_window: Duration) -> Self {
        Self {
            caps,
            window,
            weekly_window,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.tier_caps.clone(),
            config.deposit_window,
            config.weekly_window,
        )
    }

    /// Daily cap for a KYC tier; unknown tiers get tier 0's cap
    pub fn cap_for(&self, tier: u8) -> Decimal {
        self.caps
            .get(usize::from(tier))
            .or_else(|| self.caps.first())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn roll_windows(&self, wallet: &mut Wallet, now: DateTime<Utc>) {
        if now - wallet.last_deposit_reset > self.window {
            debug!(
                user_id = %wallet.user_id,
                previous_used = %wallet.daily_deposit_used,
                "resetting daily deposit window"
            );
            wallet.daily_deposit_used = Decimal::ZERO;
            wallet.last_deposit_reset = now;
        }
        if now - wallet.last_weekly_reset > self.weekly_window {
            debug!(
                user_id = %wallet.user_id,
                previous_used = %wallet.weekly_deposit_used,
                "resetting weekly deposit window"
            );
            wallet.weekly_deposit_used = Decimal::ZERO;
            wallet.last_weekly_reset = now;
        }
    }

    /// Refuse the deposit if `used` would pass the user's own limit
    fn check_self_limit(
        wallet: &Wallet,
        period: LimitPeriod,
        counted: Decimal,
        amount: Decimal,
        used: Decimal,
    ) -> Result<(), WalletError> {
        match wallet.self_limit(period) {
            Some(limit) if used > limit => {
                warn!(
                    user_id = %wallet.user_id,
                    %period,
                    used = %counted,
                    requested = %amount,
                    limit = %limit,
                    "self-imposed deposit limit exceeded"
                );
                Err(WalletError::self_limit_exceeded(
                    &wallet.user_id,
                    period,
                    counted,
                    amount,
                    limit,
                ))
            }
            _ => Ok(()),
        }
    }

    /// Reset elapsed windows, check every deposit rule, then reserve `amount`
    ///
    /// Checks run in order: self-exclusion, tier cap, daily self-limit,
    /// weekly self-limit. On success both counters include `amount`. On
    /// rejection the wallet may still carry a window reset; callers discard
    /// the working copy on error, so nothing is persisted either way.
    ///
    /// # Errors
    ///
    /// * `SelfExcluded` while a self-exclusion is running
    /// * `LimitExceeded` if `daily_deposit_used + amount` would exceed the cap
    /// * `SelfLimitExceeded` if a daily or weekly self-limit would be passed
    /// * `ArithmeticOverflow` if a counter cannot hold the sum
    pub fn check_and_reserve(
        &self,
        wallet: &mut Wallet,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), WalletError> {
        if let Some(until) = wallet.excluded_at(now) {
            warn!(
                user_id = %wallet.user_id,
                until = %until,
                "deposit refused during self-exclusion"
            );
            return Err(WalletError::self_excluded(&wallet.user_id, until));
        }

        self.roll_windows(wallet, now);

        let cap = self.cap_for(wallet.kyc_tier);
        let daily_used = wallet
            .daily_deposit_used
            .checked_add(amount)
            .ok_or_else(|| WalletError::arithmetic_overflow("deposit limit", &wallet.user_id))?;

        if daily_used > cap {
            warn!(
                user_id = %wallet.user_id,
                tier = wallet.kyc_tier,
                used = %wallet.daily_deposit_used,
                requested = %amount,
                cap = %cap,
                "daily deposit limit exceeded"
            );
            return Err(WalletError::limit_exceeded(
                &wallet.user_id,
                wallet.daily_deposit_used,
                amount,
                cap,
            ));
        }

        let weekly_used = wallet
            .weekly_deposit_used
            .checked_add(amount)
            .ok_or_else(|| WalletError::arithmetic_overflow("deposit limit", &wallet.user_id))?;

        Self::check_self_limit(
            wallet,
            LimitPeriod::Daily,
            wallet.daily_deposit_used,
            amount,
            daily_used,
        )?;
        Self::check_self_limit(
            wallet,
            LimitPeriod::Weekly,
            wallet.weekly_deposit_used,
            amount,
            weekly_used,
        )?;

        wallet.daily_deposit_used = daily_used;
        wallet.weekly_deposit_used = weekly_used;
        Ok(())
    }
}
