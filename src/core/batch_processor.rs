//! Batch processing with user-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! feed records with one tokio task per user.
//!
//! # Design
//!
//! A batch is partitioned by user id. Records for different users run
//! concurrently; records for the same user run sequentially in feed order.
//! The per-user wallet lock already serializes same-user operations, so the
//! partitioning is what keeps their *order* deterministic.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── InMemoryProcessor  (shared, Arc-backed)
//! ```

use std::collections::HashMap;

use tracing::error;

use super::processor::InMemoryProcessor;
use crate::types::{Receipt, TransactionRecord, UserId, WalletError};

/// Result of processing a single feed record
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The record that was processed
    pub record: TransactionRecord,

    /// The outcome: a receipt for money rows, `None` for collaborator rows
    pub result: Result<Option<Receipt>, WalletError>,
}

/// Batch processor with user-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    processor: InMemoryProcessor,
}

impl BatchProcessor {
    pub fn new(processor: InMemoryProcessor) -> Self {
        Self { processor }
    }

    /// Group a batch by user, keeping each user's records in feed order
    pub fn partition_by_user(
        &self,
        batch: Vec<TransactionRecord>,
    ) -> HashMap<UserId, Vec<TransactionRecord>> {
        let mut user_batches: HashMap<UserId, Vec<TransactionRecord>> = HashMap::new();

        for record in batch {
            user_batches
                .entry(record.user.clone())
                .or_default()
                .push(record);
        }

        user_batches
    }

    /// Apply one user's records sequentially
    pub async fn process_user_transactions(
        &self,
        transactions: Vec<TransactionRecord>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(transactions.len());

        for record in transactions {
            let result = self.processor.apply(&record);
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Apply a batch, one task per user
    ///
    /// # Returns
    ///
    /// One result per record. Results are grouped by user in no particular
    /// user order, but each user's results keep feed order.
    pub async fn process_batch(&self, batch: Vec<TransactionRecord>) -> Vec<ProcessingResult> {
        let user_batches = self.partition_by_user(batch);

        let mut tasks = Vec::new();
        for (_user_id, transactions) in user_batches {
            let processor = self.clone();
            let task = tokio::spawn(async move {
                processor.process_user_transactions(transactions).await
            });
            tasks.push(task);
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(user_results) => results.extend(user_results),
                Err(e) => {
                    error!(error = %e, "batch task panicked");
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::clock::SystemClock;
    use crate::types::{FeedType, RequestKind};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn record(kind: FeedType, user: &str, tx: &str, amount: i64) -> TransactionRecord {
        TransactionRecord {
            tx_type: kind,
            user: user.to_string(),
            tx: tx.to_string(),
            amount: Some(Decimal::from(amount)),
            payout: None,
            won: None,
            reference: None,
        }
    }

    fn deposit(user: &str, tx: &str, amount: i64) -> TransactionRecord {
        record(FeedType::Request(RequestKind::Deposit), user, tx, amount)
    }

    fn batch_processor() -> (BatchProcessor, InMemoryProcessor) {
        let processor =
            InMemoryProcessor::in_memory(&EngineConfig::default(), Arc::new(SystemClock));
        (BatchProcessor::new(processor.clone()), processor)
    }

    #[test]
    fn test_partition_by_user_empty_batch() {
        let (batch_processor, _) = batch_processor();

        assert!(batch_processor.partition_by_user(vec![]).is_empty());
    }

    #[test]
    fn test_partition_by_user_keeps_order() {
        let (batch_processor, _) = batch_processor();

        let partitioned = batch_processor.partition_by_user(vec![
            deposit("a", "1", 10),
            deposit("b", "2", 10),
            deposit("a", "3", 10),
            deposit("a", "4", 10),
        ]);

        assert_eq!(partitioned.len(), 2);
        let a: Vec<&str> = partitioned["a"].iter().map(|r| r.tx.as_str()).collect();
        assert_eq!(a, vec!["1", "3", "4"]);
        assert_eq!(partitioned["b"].len(), 1);
    }

    #[tokio::test]
    async fn test_process_batch_applies_every_record() {
        let (batch_processor, processor) = batch_processor();

        let results = batch_processor
            .process_batch(vec![
                deposit("a", "a-1", 100),
                deposit("b", "b-1", 50),
                record(FeedType::Request(RequestKind::Withdrawal), "a", "a-2", 30),
                record(FeedType::Request(RequestKind::Withdrawal), "b", "b-2", 80),
            ])
            .await;

        assert_eq!(results.len(), 4);
        let failures = results.iter().filter(|r| r.result.is_err()).count();
        assert_eq!(failures, 1);

        assert_eq!(processor.balance("a").unwrap().available(), Decimal::from(70));
        assert_eq!(processor.balance("b").unwrap().available(), Decimal::from(50));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_user_order_is_preserved_across_tasks() {
        let (batch_processor, processor) = batch_processor();

        let mut batch = Vec::new();
        for user in 0..20 {
            let user = format!("user-{}", user);
            batch.push(deposit(&user, &format!("{}-d", user), 10));
            batch.push(record(FeedType::Lock, &user, &format!("{}-l", user), 5));
        }

        let results = batch_processor.process_batch(batch).await;

        assert!(results.iter().all(|r| r.result.is_ok()));
        for wallet in processor.all_wallets() {
            assert_eq!(wallet.locked_balance, Decimal::from(5));
            assert_eq!(wallet.available(), Decimal::ZERO);
        }
    }
}
