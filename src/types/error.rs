//! Error types for the wallet ledger engine
//!
//! This module defines every error a wallet operation can return. Each
//! variant carries the context needed to diagnose it and maps to a
//! caller-visible status code.
//!
//! # Error Classes
//!
//! - **Business**: rejections caused by the request or the wallet state
//!   (insufficient funds, limits, inactive wallet). Never retried by the engine.
//! - **Replay**: the idempotency key was already used.
//! - **Infrastructure**: storage failures (safe to retry with the same key) and
//!   settlement inconsistencies (a sequencing bug upstream).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::wallet::LimitPeriod;

/// Main error type for the wallet ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    /// Amount is zero or negative after rounding to currency precision
    ///
    /// Rejected before any lock is taken.
    #[error("Invalid amount {amount}: must be greater than zero")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Request is missing a required field (e.g. an empty transaction id)
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Description of the problem
        reason: String,
    },

    /// Wallet is not ACTIVE and rejects all mutations
    #[error("Wallet for user {user_id} is {status}")]
    WalletInactive {
        /// The owning user
        user_id: String,
        /// Current wallet status
        status: String,
    },

    /// Available balance is lower than the requested amount, or the
    /// operation would leave the available balance negative
    #[error(
        "Insufficient funds for user {user_id}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// The owning user
        user_id: String,
        /// Available balance at the time of the request
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// Withdrawal cannot be covered by winnings and deposit alone
    #[error("Insufficient withdrawable funds for user {user_id}: withdrawable {withdrawable}, requested {requested}")]
    InsufficientWithdrawable {
        /// The owning user
        user_id: String,
        /// Winnings plus deposit
        withdrawable: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// Deposit would breach the KYC-tier daily cap
    #[error("Daily deposit limit exceeded for user {user_id}: used {used}, requested {requested}, cap {cap}")]
    LimitExceeded {
        /// The owning user
        user_id: String,
        /// Deposits already counted in the current window
        used: Decimal,
        /// Requested deposit
        requested: Decimal,
        /// Cap for the wallet's tier
        cap: Decimal,
    },

    /// Deposit would breach a limit the user set on themselves
    #[error("Self-imposed {period} deposit limit exceeded for user {user_id}: used {used}, requested {requested}, limit {limit}")]
    SelfLimitExceeded {
        /// The owning user
        user_id: String,
        /// Window the limit applies to
        period: LimitPeriod,
        /// Deposits already counted in that window
        used: Decimal,
        /// Requested deposit
        requested: Decimal,
        /// The user's limit
        limit: Decimal,
    },

    /// The user excluded themselves and the exclusion has not ended
    #[error("User {user_id} is self-excluded until {until}")]
    SelfExcluded {
        /// The owning user
        user_id: String,
        /// End of the exclusion
        until: DateTime<Utc>,
    },

    /// Locked balance is smaller than the stake being settled
    ///
    /// Signals an upstream sequencing bug; logged at error level.
    #[error("Settlement error for user {user_id}: locked {locked}, stake {stake}")]
    SettlementError {
        /// The owning user
        user_id: String,
        /// Locked balance at settlement time
        locked: Decimal,
        /// Stake being settled
        stake: Decimal,
    },

    /// The idempotency key already has a journal entry
    ///
    /// Benign: the processor turns it into a replay of the recorded result.
    #[error("Transaction {transaction_id} already processed")]
    AlreadyProcessed {
        /// The idempotency key
        transaction_id: String,
    },

    /// The idempotency key was used for a different user or operation
    #[error("Transaction {transaction_id} was already used for a different request")]
    IdempotencyConflict {
        /// The idempotency key
        transaction_id: String,
    },

    /// Checked decimal arithmetic overflowed
    #[error("Arithmetic overflow in {operation} for user {user_id}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// The owning user
        user_id: String,
    },

    /// Lock, persist or append failed; nothing was written
    #[error("Storage error: {message}")]
    StorageError {
        /// Description of the failure
        message: String,
    },
}

/// Broad category of a [`WalletError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Business,
    Replay,
    Infrastructure,
}

// Helper functions for creating common errors

impl WalletError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        WalletError::InvalidAmount { amount }
    }

    /// Create an InvalidRequest error
    pub fn invalid_request(reason: &str) -> Self {
        WalletError::InvalidRequest {
            reason: reason.to_string(),
        }
    }

    /// Create a WalletInactive error
    pub fn wallet_inactive(user_id: &str, status: impl ToString) -> Self {
        WalletError::WalletInactive {
            user_id: user_id.to_string(),
            status: status.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(user_id: &str, available: Decimal, requested: Decimal) -> Self {
        WalletError::InsufficientFunds {
            user_id: user_id.to_string(),
            available,
            requested,
        }
    }

    /// Create an InsufficientWithdrawable error
    pub fn insufficient_withdrawable(
        user_id: &str,
        withdrawable: Decimal,
        requested: Decimal,
    ) -> Self {
        WalletError::InsufficientWithdrawable {
            user_id: user_id.to_string(),
            withdrawable,
            requested,
        }
    }

    /// Create a LimitExceeded error
    pub fn limit_exceeded(user_id: &str, used: Decimal, requested: Decimal, cap: Decimal) -> Self {
        WalletError::LimitExceeded {
            user_id: user_id.to_string(),
            used,
            requested,
            cap,
        }
    }

    /// Create a SelfLimitExceeded error
    pub fn self_limit_exceeded(
        user_id: &str,
        period: LimitPeriod,
        used: Decimal,
        requested: Decimal,
        limit: Decimal,
    ) -> Self {
        WalletError::SelfLimitExceeded {
            user_id: user_id.to_string(),
            period,
            used,
            requested,
            limit,
        }
    }

    /// Create a SelfExcluded error
    pub fn self_excluded(user_id: &str, until: DateTime<Utc>) -> Self {
        WalletError::SelfExcluded {
            user_id: user_id.to_string(),
            until,
        }
    }

    /// Create a SettlementError
    pub fn settlement(user_id: &str, locked: Decimal, stake: Decimal) -> Self {
        WalletError::SettlementError {
            user_id: user_id.to_string(),
            locked,
            stake,
        }
    }

    /// Create an AlreadyProcessed error
    pub fn already_processed(transaction_id: &str) -> Self {
        WalletError::AlreadyProcessed {
            transaction_id: transaction_id.to_string(),
        }
    }

    /// Create an IdempotencyConflict error
    pub fn idempotency_conflict(transaction_id: &str) -> Self {
        WalletError::IdempotencyConflict {
            transaction_id: transaction_id.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, user_id: &str) -> Self {
        WalletError::ArithmeticOverflow {
            operation: operation.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Create a StorageError
    pub fn storage(message: impl Into<String>) -> Self {
        WalletError::StorageError {
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            WalletError::AlreadyProcessed { .. } => ErrorClass::Replay,
            WalletError::StorageError { .. } | WalletError::SettlementError { .. } => {
                ErrorClass::Infrastructure
            }
            _ => ErrorClass::Business,
        }
    }

    /// Whether the caller may retry with the same idempotency key
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::StorageError { .. })
    }

    /// HTTP-equivalent status code reported to callers
    pub fn status_code(&self) -> u16 {
        match self {
            WalletError::InvalidAmount { .. } | WalletError::InvalidRequest { .. } => 400,
            WalletError::InsufficientFunds { .. }
            | WalletError::InsufficientWithdrawable { .. } => 402,
            WalletError::WalletInactive { .. } | WalletError::SelfExcluded { .. } => 403,
            WalletError::IdempotencyConflict { .. } => 409,
            WalletError::LimitExceeded { .. }
            | WalletError::SelfLimitExceeded { .. }
            | WalletError::ArithmeticOverflow { .. } => 422,
            WalletError::AlreadyProcessed { .. } => 200,
            WalletError::SettlementError { .. } => 500,
            WalletError::StorageError { .. } => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use rust_decimal::Decimal;

    #[rstest]
    #[case::invalid_amount(
        WalletError::InvalidAmount { amount: Decimal::new(-500, 2) },
        "Invalid amount -5.00: must be greater than zero"
    )]
    #[case::wallet_inactive(
        WalletError::wallet_inactive("alice", "SUSPENDED"),
        "Wallet for user alice is SUSPENDED"
    )]
    #[case::insufficient_funds(
        WalletError::InsufficientFunds { user_id: "bob".to_string(), available: Decimal::new(5000, 2), requested: Decimal::new(10000, 2) },
        "Insufficient funds for user bob: available 50.00, requested 100.00"
    )]
    #[case::insufficient_withdrawable(
        WalletError::insufficient_withdrawable("bob", Decimal::new(60, 0), Decimal::new(70, 0)),
        "Insufficient withdrawable funds for user bob: withdrawable 60, requested 70"
    )]
    #[case::limit_exceeded(
        WalletError::limit_exceeded("carol", Decimal::new(6000, 0), Decimal::new(6000, 0), Decimal::new(10000, 0)),
        "Daily deposit limit exceeded for user carol: used 6000, requested 6000, cap 10000"
    )]
    #[case::self_limit(
        WalletError::self_limit_exceeded("carol", LimitPeriod::Weekly, Decimal::new(800, 0), Decimal::new(300, 0), Decimal::new(1000, 0)),
        "Self-imposed weekly deposit limit exceeded for user carol: used 800, requested 300, limit 1000"
    )]
    #[case::self_excluded(
        WalletError::self_excluded("carol", Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        "User carol is self-excluded until 2024-03-01 09:00:00 UTC"
    )]
    #[case::settlement(
        WalletError::settlement("dave", Decimal::new(10, 0), Decimal::new(40, 0)),
        "Settlement error for user dave: locked 10, stake 40"
    )]
    #[case::already_processed(
        WalletError::already_processed("tx-1"),
        "Transaction tx-1 already processed"
    )]
    #[case::idempotency_conflict(
        WalletError::idempotency_conflict("tx-1"),
        "Transaction tx-1 was already used for a different request"
    )]
    #[case::arithmetic_overflow(
        WalletError::arithmetic_overflow("deposit", "erin"),
        "Arithmetic overflow in deposit for user erin"
    )]
    #[case::storage(
        WalletError::storage("wallet lock poisoned"),
        "Storage error: wallet lock poisoned"
    )]
    fn test_error_display(#[case] error: WalletError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_amount(WalletError::invalid_amount(Decimal::ZERO), 400)]
    #[case::inactive(WalletError::wallet_inactive("u", "SUSPENDED"), 403)]
    #[case::insufficient(WalletError::insufficient_funds("u", Decimal::ZERO, Decimal::ONE), 402)]
    #[case::withdrawable(WalletError::insufficient_withdrawable("u", Decimal::ZERO, Decimal::ONE), 402)]
    #[case::limit(WalletError::limit_exceeded("u", Decimal::ZERO, Decimal::ONE, Decimal::ZERO), 422)]
    #[case::self_limit(WalletError::self_limit_exceeded("u", LimitPeriod::Daily, Decimal::ZERO, Decimal::ONE, Decimal::ZERO), 422)]
    #[case::self_excluded(WalletError::self_excluded("u", Utc::now()), 403)]
    #[case::conflict(WalletError::idempotency_conflict("tx"), 409)]
    #[case::overflow(WalletError::arithmetic_overflow("deposit", "u"), 422)]
    #[case::settlement(WalletError::settlement("u", Decimal::ZERO, Decimal::ONE), 500)]
    #[case::storage(WalletError::storage("down"), 503)]
    fn test_status_codes(#[case] error: WalletError, #[case] expected: u16) {
        assert_eq!(error.status_code(), expected);
    }

    #[rstest]
    #[case::business(WalletError::insufficient_funds("u", Decimal::ZERO, Decimal::ONE), ErrorClass::Business, false)]
    #[case::replay(WalletError::already_processed("tx"), ErrorClass::Replay, false)]
    #[case::storage(WalletError::storage("down"), ErrorClass::Infrastructure, true)]
    #[case::settlement(WalletError::settlement("u", Decimal::ZERO, Decimal::ONE), ErrorClass::Infrastructure, false)]
    fn test_classification(
        #[case] error: WalletError,
        #[case] class: ErrorClass,
        #[case] retryable: bool,
    ) {
        assert_eq!(error.class(), class);
        assert_eq!(error.is_retryable(), retryable);
    }
}
