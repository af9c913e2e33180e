//! Wallet-related types for the wallet ledger engine
//!
//! This module defines the Wallet row and the four named buckets that make up
//! a user's funds, along with the currency rounding helpers shared by every
//! operation.

use super::bonus::{BonusGrant, GrantStatus};
use super::transaction::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places carried by every persisted amount
pub const CURRENCY_SCALE: u32 = 2;

/// Round an amount to currency precision (midpoint away from zero)
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// One of the four named sub-balances composing a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Real money deposited through the payment gateway
    Deposit,
    /// Promotional money; spendable on bets, never withdrawable
    Bonus,
    /// Realized game winnings
    Winnings,
    /// Stake reserved against an open bet
    Locked,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Deposit,
        Bucket::Bonus,
        Bucket::Winnings,
        Bucket::Locked,
    ];
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Deposit => write!(f, "deposit"),
            Bucket::Bonus => write!(f, "bonus"),
            Bucket::Winnings => write!(f, "winnings"),
            Bucket::Locked => write!(f, "locked"),
        }
    }
}

/// Wallet status flag, set by the external suspension / fraud workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletStatus {
    Active,
    Suspended,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Active => write!(f, "ACTIVE"),
            WalletStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

/// Period of a user-chosen deposit limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPeriod {
    Daily,
    Weekly,
}

impl fmt::Display for LimitPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitPeriod::Daily => write!(f, "daily"),
            LimitPeriod::Weekly => write!(f, "weekly"),
        }
    }
}

/// Per-user wallet row
///
/// Holds the user's funds split into buckets plus the state consumed from
/// collaborators (KYC tier, status), the rolling deposit-limit counters, the
/// user's own responsible-gaming settings and the bonus grants.
/// The externally reported balance is always derived via [`Wallet::available`]
/// and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// The owning user
    pub user_id: UserId,

    /// Real money deposited
    pub deposit_balance: Decimal,

    /// Promotional funds
    pub bonus_balance: Decimal,

    /// Realized winnings
    pub winnings_balance: Decimal,

    /// Funds reserved against open bets
    ///
    /// Locked money has already been moved out of the three spendable
    /// buckets, and it is subtracted again when computing the available
    /// balance.
    pub locked_balance: Decimal,

    /// Wallet currency, fixed at creation
    pub currency: String,

    /// KYC tier assigned by the external KYC workflow
    pub kyc_tier: u8,

    /// Deposits counted against the current daily window
    pub daily_deposit_used: Decimal,

    /// Start of the current daily deposit window
    pub last_deposit_reset: DateTime<Utc>,

    /// Deposits counted against the current weekly window
    pub weekly_deposit_used: Decimal,

    /// Start of the current weekly deposit window
    pub last_weekly_reset: DateTime<Utc>,

    /// Daily deposit limit chosen by the user, applied on top of the tier cap
    pub daily_self_limit: Option<Decimal>,

    /// Weekly deposit limit chosen by the user
    pub weekly_self_limit: Option<Decimal>,

    /// Deposits are refused until this instant
    pub self_excluded_until: Option<DateTime<Utc>>,

    /// Promotional grants in grant order
    pub bonus_grants: Vec<BonusGrant>,

    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new wallet with zero balances, ACTIVE status and tier 0
    pub fn new(user_id: &str, currency: &str, now: DateTime<Utc>) -> Self {
        Wallet {
            user_id: user_id.to_string(),
            deposit_balance: Decimal::ZERO,
            bonus_balance: Decimal::ZERO,
            winnings_balance: Decimal::ZERO,
            locked_balance: Decimal::ZERO,
            currency: currency.to_string(),
            kyc_tier: 0,
            daily_deposit_used: Decimal::ZERO,
            last_deposit_reset: now,
            weekly_deposit_used: Decimal::ZERO,
            last_weekly_reset: now,
            daily_self_limit: None,
            weekly_self_limit: None,
            self_excluded_until: None,
            bonus_grants: Vec::new(),
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Available balance: `deposit + bonus + winnings - locked`
    ///
    /// Saturates instead of overflowing; operations use
    /// [`Wallet::checked_available`] when the value drives a decision.
    pub fn available(&self) -> Decimal {
        self.deposit_balance
            .saturating_add(self.bonus_balance)
            .saturating_add(self.winnings_balance)
            .saturating_sub(self.locked_balance)
    }

    /// Available balance, or `None` if the bucket sum does not fit a Decimal
    pub fn checked_available(&self) -> Option<Decimal> {
        self.deposit_balance
            .checked_add(self.bonus_balance)?
            .checked_add(self.winnings_balance)?
            .checked_sub(self.locked_balance)
    }

    /// Funds that may leave the platform (winnings and deposit, never bonus)
    pub fn withdrawable(&self) -> Decimal {
        self.winnings_balance.saturating_add(self.deposit_balance)
    }

    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }

    pub fn bucket(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Deposit => self.deposit_balance,
            Bucket::Bonus => self.bonus_balance,
            Bucket::Winnings => self.winnings_balance,
            Bucket::Locked => self.locked_balance,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut Decimal {
        match bucket {
            Bucket::Deposit => &mut self.deposit_balance,
            Bucket::Bonus => &mut self.bonus_balance,
            Bucket::Winnings => &mut self.winnings_balance,
            Bucket::Locked => &mut self.locked_balance,
        }
    }

    /// Whether every bucket is non-negative
    pub fn buckets_non_negative(&self) -> bool {
        Bucket::ALL
            .iter()
            .all(|&bucket| !self.bucket(bucket).is_sign_negative())
    }

    /// Round every persisted amount to currency precision
    pub fn round_buckets(&mut self) {
        for bucket in Bucket::ALL {
            let rounded = round_currency(self.bucket(bucket));
            *self.bucket_mut(bucket) = rounded;
        }
        self.daily_deposit_used = round_currency(self.daily_deposit_used);
        self.weekly_deposit_used = round_currency(self.weekly_deposit_used);
    }

    pub fn self_limit(&self, period: LimitPeriod) -> Option<Decimal> {
        match period {
            LimitPeriod::Daily => self.daily_self_limit,
            LimitPeriod::Weekly => self.weekly_self_limit,
        }
    }

    pub fn self_limit_mut(&mut self, period: LimitPeriod) -> &mut Option<Decimal> {
        match period {
            LimitPeriod::Daily => &mut self.daily_self_limit,
            LimitPeriod::Weekly => &mut self.weekly_self_limit,
        }
    }

    /// End of a self-exclusion still running at `now`
    pub fn excluded_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.self_excluded_until.filter(|until| *until > now)
    }

    /// Active grants whose expiry has passed, oldest first
    pub fn due_grants(&self, now: DateTime<Utc>) -> Vec<BonusGrant> {
        self.bonus_grants
            .iter()
            .filter(|grant| grant.is_due(now))
            .cloned()
            .collect()
    }

    pub fn grant_mut(&mut self, grant_id: &str) -> Option<&mut BonusGrant> {
        self.bonus_grants
            .iter_mut()
            .find(|grant| grant.grant_id == grant_id)
    }

    /// Close every active grant once no bonus money is left behind them
    pub fn close_spent_grants(&mut self) {
        if !self.bonus_balance.is_zero() {
            return;
        }
        for grant in &mut self.bonus_grants {
            if grant.status == GrantStatus::Active {
                grant.status = GrantStatus::Used;
            }
        }
    }
}
