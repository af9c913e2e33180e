//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `wallet`: the wallet row, buckets and currency rounding
//! - `bonus`: promotional grants and their expiry
//! - `ledger`: immutable journal entries
//! - `transaction`: request/response contract, operations and feed records
//! - `error`: Error types for the wallet ledger engine

pub mod bonus;
pub mod error;
pub mod ledger;
pub mod transaction;
pub mod wallet;

pub use bonus::{BonusGrant, GrantStatus};
pub use error::{ErrorClass, WalletError};
pub use ledger::{BucketMovement, BucketTag, EntryType, LedgerEntry};
pub use transaction::{
    CreditKind, FeedType, Operation, OperationContext, Receipt, RequestKind, TransactionRecord,
    TransactionRequest, TransactionResponse, UserId,
};
pub use wallet::{round_currency, Bucket, LimitPeriod, Wallet, WalletStatus, CURRENCY_SCALE};
