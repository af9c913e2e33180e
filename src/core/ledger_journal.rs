//! In-memory append-only ledger journal
//!
//! This module provides the `InMemoryLedgerJournal` struct, which records every
//! balance-affecting event and enforces idempotency-key uniqueness.
//!
//! # Design
//!
//! Entries are stored in a `DashMap` keyed by idempotency key. The insert goes
//! through the map's entry API, so two concurrent appends for the same key
//! cannot both succeed: the loser sees an occupied slot and gets
//! `AlreadyProcessed`. A secondary index keeps each user's keys in append
//! order for history and reconciliation queries.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::traits::LedgerJournal;
use crate::types::{LedgerEntry, UserId, WalletError};

/// Thread-safe append-only journal
#[derive(Debug, Default)]
pub struct InMemoryLedgerJournal {
    /// Entries by idempotency key
    entries: DashMap<String, LedgerEntry>,

    /// Idempotency keys per user, in append order
    by_user: DashMap<UserId, Vec<String>>,

    /// Last assigned sequence number
    sequence: AtomicU64,
}

impl InMemoryLedgerJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerJournal for InMemoryLedgerJournal {
    fn lookup(&self, idempotency_key: &str) -> Result<Option<LedgerEntry>, WalletError> {
        Ok(self
            .entries
            .get(idempotency_key)
            .map(|entry| entry.value().clone()))
    }

    fn append(&self, mut entry: LedgerEntry) -> Result<LedgerEntry, WalletError> {
        match self.entries.entry(entry.idempotency_key.clone()) {
            Entry::Occupied(_) => Err(WalletError::already_processed(&entry.idempotency_key)),
            Entry::Vacant(slot) => {
                entry.sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                self.by_user
                    .entry(entry.user_id.clone())
                    .or_default()
                    .push(entry.idempotency_key.clone());
                slot.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    fn entries_for(&self, user_id: &str) -> Vec<LedgerEntry> {
        // Copy the keys out first so no by_user guard is held while reading
        // entries (append locks the two maps in the opposite order).
        let keys = self
            .by_user
            .get(user_id)
            .map(|keys| keys.value().clone())
            .unwrap_or_default();

        let mut entries: Vec<LedgerEntry> = keys
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entry| entry.value().clone()))
            .collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BucketMovement, BucketTag, Bucket, EntryType, Operation};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;

    fn deposit_entry(key: &str, user: &str, amount: i64) -> LedgerEntry {
        let amount = Decimal::new(amount, 0);
        LedgerEntry {
            sequence: 0,
            idempotency_key: key.to_string(),
            user_id: user.to_string(),
            entry_type: EntryType::Deposit,
            amount,
            bucket: BucketTag::Deposit,
            movements: vec![BucketMovement::credit(Bucket::Deposit, amount)],
            operation: Operation::Deposit { amount },
            reference_id: String::new(),
            reference_type: String::new(),
            balance_after: amount,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_assigns_increasing_sequence() {
        let journal = InMemoryLedgerJournal::new();

        let first = journal.append(deposit_entry("tx-1", "alice", 10)).unwrap();
        let second = journal.append(deposit_entry("tx-2", "bob", 20)).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(journal.len(), 2);
    }

    #[test]
    fn test_duplicate_key_is_already_processed() {
        let journal = InMemoryLedgerJournal::new();
        journal.append(deposit_entry("tx-1", "alice", 10)).unwrap();

        let result = journal.append(deposit_entry("tx-1", "alice", 10));

        assert_eq!(result, Err(WalletError::already_processed("tx-1")));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn test_lookup_returns_recorded_entry() {
        let journal = InMemoryLedgerJournal::new();
        assert!(journal.is_empty());
        assert_eq!(journal.lookup("tx-1").unwrap(), None);

        let appended = journal.append(deposit_entry("tx-1", "alice", 10)).unwrap();

        assert_eq!(journal.lookup("tx-1").unwrap(), Some(appended));
    }

    #[test]
    fn test_entries_for_filters_by_user_in_order() {
        let journal = InMemoryLedgerJournal::new();
        journal.append(deposit_entry("a-1", "alice", 1)).unwrap();
        journal.append(deposit_entry("b-1", "bob", 2)).unwrap();
        journal.append(deposit_entry("a-2", "alice", 3)).unwrap();

        let keys: Vec<String> = journal
            .entries_for("alice")
            .into_iter()
            .map(|entry| entry.idempotency_key)
            .collect();

        assert_eq!(keys, vec!["a-1", "a-2"]);
        assert!(journal.entries_for("nobody").is_empty());
    }

    #[test]
    fn test_concurrent_appends_same_key_only_one_wins() {
        let journal = Arc::new(InMemoryLedgerJournal::new());
        let mut handles = vec![];

        for _ in 0..20 {
            let journal_clone = Arc::clone(&journal);
            handles.push(thread::spawn(move || {
                journal_clone.append(deposit_entry("tx-race", "alice", 5)).is_ok()
            }));
        }

        let wins = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(journal.len(), 1);
        assert_eq!(journal.entries_for("alice").len(), 1);
    }
}
