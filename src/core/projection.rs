//! Advisory balance projection
//!
//! A fast-read view of each user's available balance, published after every
//! commit. Entries go stale after a TTL. Nothing in the processor reads this
//! view to make a debit or credit decision; the wallet row is authoritative.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::traits::Clock;
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Published {
    available: Decimal,
    at: DateTime<Utc>,
}

pub struct BalanceProjection {
    balances: DashMap<UserId, Published>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl BalanceProjection {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            balances: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Record a freshly committed available balance
    pub fn publish(&self, user_id: &str, available: Decimal) {
        self.balances.insert(
            user_id.to_string(),
            Published {
                available,
                at: self.clock.now(),
            },
        );
    }

    /// Last published balance, or `None` if absent or older than the TTL
    pub fn get(&self, user_id: &str) -> Option<Decimal> {
        let published = *self.balances.get(user_id)?.value();
        if self.clock.now() - published.at > self.ttl {
            return None;
        }
        Some(published.available)
    }

    pub fn invalidate(&self, user_id: &str) {
        self.balances.remove(user_id);
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl std::fmt::Debug for BalanceProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceProjection")
            .field("entries", &self.balances.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
