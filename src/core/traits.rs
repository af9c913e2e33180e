//! Core traits for wallet storage, the ledger journal and time
//!
//! This module defines the seams the [`TransactionProcessor`] is built on, so
//! the in-memory implementations used by the batch driver and tests can be
//! swapped for database-backed ones without touching the operations.
//!
//! [`TransactionProcessor`]: super::TransactionProcessor

use chrono::{DateTime, Utc};

use crate::types::{LedgerEntry, Wallet, WalletError};

/// Trait for owning wallet rows and serializing access to them
///
/// Implementations can use an in-process per-user mutex table, database row
/// locks (`SELECT ... FOR UPDATE`), or a distributed lock.
pub trait BalanceStore: Send + Sync {
    /// Run `f` with exclusive access to one user's wallet
    ///
    /// The wallet is created with zero balances if absent. `f` receives a
    /// working copy; the copy replaces the stored row only if `f` returns
    /// `Ok`. The lock is released on every exit path. Locks are per user, so
    /// calls for different users never wait on each other.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The wallet owner
    /// * `f` - The locked unit of work
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The closure's value; the row has been persisted
    /// * `Err(WalletError)` - The closure's error or a `StorageError`; the
    ///   stored row is unchanged
    fn with_locked_wallet<T, F>(&self, user_id: &str, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&mut Wallet) -> Result<T, WalletError>;

    /// Read-only snapshot of a wallet, creating it if absent
    fn snapshot(&self, user_id: &str) -> Result<Wallet, WalletError> {
        self.with_locked_wallet(user_id, |wallet| Ok(wallet.clone()))
    }

    /// Snapshots of every wallet, in no particular order
    fn all_wallets(&self) -> Vec<Wallet>;
}

/// Trait for the append-only journal of balance-affecting events
///
/// The presence of an entry for an idempotency key is the single source of
/// truth for "already processed".
pub trait LedgerJournal: Send + Sync {
    /// Find the entry recorded for an idempotency key
    fn lookup(&self, idempotency_key: &str) -> Result<Option<LedgerEntry>, WalletError>;

    /// Append an entry, assigning its sequence number
    ///
    /// Fails with `AlreadyProcessed` if the key already has an entry, and
    /// with `StorageError` if the journal cannot be written.
    fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, WalletError>;

    /// A user's entries in journal order
    fn entries_for(&self, user_id: &str) -> Vec<LedgerEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
