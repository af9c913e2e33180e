//! In-memory wallet storage with per-user locking
//!
//! This module provides the `InMemoryBalanceStore` struct, which owns every
//! wallet row and serializes access to each one.
//!
//! # Design
//!
//! Wallets live in a `DashMap` keyed by user id, each behind its own
//! `Arc<Mutex<Wallet>>`. A locked unit of work clones the `Arc` out of the map
//! and drops the map guard before taking the wallet mutex, so a long operation
//! on one user never blocks other users that happen to share a DashMap shard.
//!
//! # Atomicity
//!
//! The closure passed to `with_locked_wallet` mutates a copy of the row. The
//! copy is written back only when the closure succeeds; any error, or a panic,
//! leaves the stored row exactly as it was.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::traits::{BalanceStore, Clock};
use crate::types::{UserId, Wallet, WalletError};

/// Thread-safe wallet table
pub struct InMemoryBalanceStore {
    /// Per-user wallet cells
    ///
    /// The outer map only guards cell creation; the inner mutex is the
    /// per-user row lock.
    wallets: DashMap<UserId, Arc<Mutex<Wallet>>>,

    /// Currency assigned to newly created wallets
    currency: String,

    clock: Arc<dyn Clock>,
}

impl InMemoryBalanceStore {
    /// Create an empty store
    ///
    /// # Arguments
    ///
    /// * `currency` - Currency for wallets created on first access
    /// * `clock` - Time source for `created_at` / `last_deposit_reset`
    pub fn new(currency: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            wallets: DashMap::new(),
            currency: currency.into(),
            clock,
        }
    }

    /// Number of wallets created so far
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    /// Get the cell for a user, creating the wallet lazily
    fn cell(&self, user_id: &str) -> Arc<Mutex<Wallet>> {
        if let Some(cell) = self.wallets.get(user_id) {
            return Arc::clone(cell.value());
        }

        let entry = self.wallets.entry(user_id.to_string()).or_insert_with(|| {
            debug!(user_id, currency = %self.currency, "creating wallet");
            Arc::new(Mutex::new(Wallet::new(
                user_id,
                &self.currency,
                self.clock.now(),
            )))
        });
        Arc::clone(entry.value())
    }
}

/// Take a wallet lock, recovering it if a previous holder panicked
///
/// Holders only ever mutate a copy, so the guarded row is intact even when
/// the lock is poisoned.
fn lock_wallet<'a>(user_id: &str, cell: &'a Mutex<Wallet>) -> MutexGuard<'a, Wallet> {
    match cell.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(user_id, "recovering poisoned wallet lock");
            cell.clear_poison();
            poisoned.into_inner()
        }
    }
}

impl BalanceStore for InMemoryBalanceStore {
    fn with_locked_wallet<T, F>(&self, user_id: &str, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&mut Wallet) -> Result<T, WalletError>,
    {
        let cell = self.cell(user_id);
        let mut stored = lock_wallet(user_id, &cell);

        let mut working = stored.clone();
        let value = f(&mut working)?;
        *stored = working;

        Ok(value)
    }

    fn all_wallets(&self) -> Vec<Wallet> {
        let cells: Vec<(UserId, Arc<Mutex<Wallet>>)> = self
            .wallets
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        cells
            .iter()
            .map(|(user_id, cell)| lock_wallet(user_id, cell).clone())
            .collect()
    }
}

impl std::fmt::Debug for InMemoryBalanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBalanceStore")
            .field("wallets", &self.wallets.len())
            .field("currency", &self.currency)
            .finish()
    }
}
