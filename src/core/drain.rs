//! Priority-ordered bucket draining
//!
//! Withdraw, lock-for-bet and generic debit all take money out of several
//! buckets in a fixed order. They share [`drain_in_priority`] and differ only
//! in the order they pass.

use rust_decimal::Decimal;

use crate::types::{Bucket, BucketMovement, Wallet};

/// Withdrawals pay out realized winnings first; bonus is never withdrawable
pub const WITHDRAW_PRIORITY: [Bucket; 2] = [Bucket::Winnings, Bucket::Deposit];

/// Bets consume the most restricted money first
pub const BET_PRIORITY: [Bucket; 3] = [Bucket::Bonus, Bucket::Deposit, Bucket::Winnings];

/// Internal debits from collaborating services
pub const DEBIT_PRIORITY: [Bucket; 3] = [Bucket::Deposit, Bucket::Winnings, Bucket::Bonus];

/// Outcome of a drain
#[derive(Debug, Clone, PartialEq)]
pub struct Drain {
    /// One debit movement per bucket actually touched, in drain order
    pub movements: Vec<BucketMovement>,

    /// Amount the listed buckets could not cover
    pub remaining: Decimal,
}

impl Drain {
    pub fn is_complete(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// Take `amount` out of `order`'s buckets, each drained fully before the next
///
/// Buckets are never driven below zero. Whatever the buckets could not cover
/// is reported in [`Drain::remaining`]; the caller decides whether that is an
/// error.
pub fn drain_in_priority(wallet: &mut Wallet, order: &[Bucket], amount: Decimal) -> Drain {
    let mut remaining = amount;
    let mut movements = Vec::with_capacity(order.len());

    for &bucket in order {
        if remaining <= Decimal::ZERO {
            break;
        }

        let balance = wallet.bucket_mut(bucket);
        let take = remaining.min(*balance);
        if take <= Decimal::ZERO {
            continue;
        }

        *balance -= take;
        remaining -= take;
        movements.push(BucketMovement::debit(bucket, take));
    }

    Drain {
        movements,
        remaining,
    }
}
