//! Journal-to-wallet reconciliation
//!
//! Every wallet starts at zero and only changes through journaled operations,
//! so summing the per-bucket movements of a user's entries must reproduce the
//! stored bucket values exactly.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::types::{Bucket, LedgerEntry, UserId, Wallet};

/// Disagreement between the journal and the stored wallet for one bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketDrift {
    pub bucket: Bucket,
    /// Sum of the journal's movements for this bucket
    pub journaled: Decimal,
    /// Value on the wallet row
    pub stored: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub user_id: UserId,
    /// Number of journal entries folded
    pub entries: usize,
    pub drift: Vec<BucketDrift>,
}

impl Reconciliation {
    /// Fold `entries` and compare the result with `wallet`
    pub fn compute(wallet: &Wallet, entries: &[LedgerEntry]) -> Self {
        let mut journaled: HashMap<Bucket, Decimal> = HashMap::new();
        for movement in entries.iter().flat_map(|entry| entry.movements.iter()) {
            let total = journaled.entry(movement.bucket).or_insert(Decimal::ZERO);
            *total = total.saturating_add(movement.delta);
        }

        let drift = Bucket::ALL
            .iter()
            .filter_map(|&bucket| {
                let journaled = journaled.get(&bucket).copied().unwrap_or(Decimal::ZERO);
                let stored = wallet.bucket(bucket);
                (journaled != stored).then_some(BucketDrift {
                    bucket,
                    journaled,
                    stored,
                })
            })
            .collect();

        Self {
            user_id: wallet.user_id.clone(),
            entries: entries.len(),
            drift,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.drift.is_empty()
    }
}
