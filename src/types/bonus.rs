//! Promotional bonus grants
//!
//! Every bonus credit records a grant on the wallet row with its expiry, so
//! the engine itself knows when promotional money lapses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a bonus grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    /// Backed by money still in the bonus bucket
    Active,
    /// The bonus bucket was emptied by play before the grant expired
    Used,
    /// Removed by the expiry sweep
    Expired,
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantStatus::Active => write!(f, "ACTIVE"),
            GrantStatus::Used => write!(f, "USED"),
            GrantStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// One promotional credit and its expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusGrant {
    /// Transaction id of the granting credit
    pub grant_id: String,
    pub amount: Decimal,
    pub status: GrantStatus,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BonusGrant {
    pub fn new(
        grant_id: &str,
        amount: Decimal,
        granted_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            grant_id: grant_id.to_string(),
            amount,
            status: GrantStatus::Active,
            granted_at,
            expires_at,
        }
    }

    /// Whether the grant is still active and its expiry has passed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.expires_at < now
    }

    /// Idempotency key of this grant's expiry
    pub fn expiry_key(&self) -> String {
        format!("{}:expiry", self.grant_id)
    }
}
