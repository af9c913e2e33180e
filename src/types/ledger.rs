//! Journal entry types
//!
//! A [`LedgerEntry`] is the immutable record of one balance-affecting event.
//! Entries are never updated or deleted, and each carries enough of the
//! originating request ([`Operation`]) to recognise a replay.

use super::transaction::{Operation, UserId};
use super::wallet::Bucket;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Journal entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Deposit,
    Withdraw,
    Bet,
    BetSettle,
    Win,
    Bonus,
    Refund,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Deposit => write!(f, "DEPOSIT"),
            EntryType::Withdraw => write!(f, "WITHDRAW"),
            EntryType::Bet => write!(f, "BET"),
            EntryType::BetSettle => write!(f, "BET_SETTLE"),
            EntryType::Win => write!(f, "WIN"),
            EntryType::Bonus => write!(f, "BONUS"),
            EntryType::Refund => write!(f, "REFUND"),
        }
    }
}

/// Bucket tag recorded on an entry
///
/// `Mixed` marks entries that drained more than one bucket; the breakdown is
/// carried in [`LedgerEntry::movements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketTag {
    Deposit,
    Bonus,
    Winnings,
    Locked,
    Mixed,
}

impl From<Bucket> for BucketTag {
    fn from(bucket: Bucket) -> Self {
        match bucket {
            Bucket::Deposit => BucketTag::Deposit,
            Bucket::Bonus => BucketTag::Bonus,
            Bucket::Winnings => BucketTag::Winnings,
            Bucket::Locked => BucketTag::Locked,
        }
    }
}

impl BucketTag {
    /// Tag for a set of drained buckets: the single bucket, or `Mixed`
    ///
    /// An empty set (nothing drained) is tagged with `fallback`.
    pub fn for_movements(movements: &[BucketMovement], fallback: Bucket) -> Self {
        match movements {
            [] => fallback.into(),
            [only] => only.bucket.into(),
            [first, rest @ ..] if rest.iter().all(|m| m.bucket == first.bucket) => {
                first.bucket.into()
            }
            _ => BucketTag::Mixed,
        }
    }
}

/// Signed change applied to one bucket by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMovement {
    pub bucket: Bucket,
    pub delta: Decimal,
}

impl BucketMovement {
    pub fn credit(bucket: Bucket, amount: Decimal) -> Self {
        Self {
            bucket,
            delta: amount,
        }
    }

    pub fn debit(bucket: Bucket, amount: Decimal) -> Self {
        Self {
            bucket,
            delta: -amount,
        }
    }
}

/// Immutable journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the journal, assigned on append (starts at 1)
    pub sequence: u64,

    /// Caller-supplied transaction identifier; unique across the journal
    pub idempotency_key: String,

    pub user_id: UserId,

    pub entry_type: EntryType,

    /// Signed amount: negative for debits
    pub amount: Decimal,

    pub bucket: BucketTag,

    /// Per-bucket breakdown of the entry
    pub movements: Vec<BucketMovement>,

    /// The logical request that produced this entry
    pub operation: Operation,

    pub reference_id: String,
    pub reference_type: String,

    /// Available balance right after this entry was applied
    pub balance_after: Decimal,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether `operation` for `user_id` is the same logical request that
    /// produced this entry
    pub fn matches(&self, user_id: &str, operation: &Operation) -> bool {
        self.user_id == user_id && &self.operation == operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn movement(bucket: Bucket, delta: i64) -> BucketMovement {
        BucketMovement {
            bucket,
            delta: Decimal::new(delta, 0),
        }
    }

    #[rstest]
    #[case::nothing_drained(vec![], Bucket::Deposit, BucketTag::Deposit)]
    #[case::single(vec![movement(Bucket::Winnings, -5)], Bucket::Deposit, BucketTag::Winnings)]
    #[case::two_buckets(
        vec![movement(Bucket::Winnings, -5), movement(Bucket::Deposit, -3)],
        Bucket::Deposit,
        BucketTag::Mixed
    )]
    #[case::same_bucket_twice(
        vec![movement(Bucket::Bonus, -1), movement(Bucket::Bonus, -2)],
        Bucket::Deposit,
        BucketTag::Bonus
    )]
    fn test_tag_for_movements(
        #[case] movements: Vec<BucketMovement>,
        #[case] fallback: Bucket,
        #[case] expected: BucketTag,
    ) {
        assert_eq!(BucketTag::for_movements(&movements, fallback), expected);
    }

    #[test]
    fn test_movement_constructors_sign() {
        let amount = Decimal::new(1250, 2);
        assert_eq!(BucketMovement::credit(Bucket::Bonus, amount).delta, amount);
        assert_eq!(BucketMovement::debit(Bucket::Bonus, amount).delta, -amount);
    }

    #[rstest]
    #[case::bet_settle(EntryType::BetSettle, "BET_SETTLE")]
    #[case::withdraw(EntryType::Withdraw, "WITHDRAW")]
    #[case::win(EntryType::Win, "WIN")]
    fn test_entry_type_display_matches_serde(#[case] entry_type: EntryType, #[case] expected: &str) {
        assert_eq!(entry_type.to_string(), expected);
        assert_eq!(
            serde_json::to_string(&entry_type).unwrap(),
            format!("\"{}\"", expected)
        );
    }
}
