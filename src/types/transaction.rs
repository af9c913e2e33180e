//! Transaction-related types for the wallet ledger engine
//!
//! This module defines the request/response contract used by collaborating
//! services, the logical [`Operation`] recorded on every journal entry, the
//! [`Receipt`] returned by the processor, and the batch feed record.

use super::ledger::{EntryType, LedgerEntry};
use super::wallet::{Bucket, LimitPeriod, Wallet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier
pub type UserId = String;

/// Transaction type accepted by the uniform request contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Deposit,
    Withdrawal,
    Bet,
    Win,
    Refund,
    Bonus,
}

/// Credit categories for the generic credit operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditKind {
    /// Game or match winnings, credited to the winnings bucket
    Win,
    /// Money returned to the user, credited to the deposit bucket
    Refund,
    /// Promotional grant, credited to the bonus bucket
    Bonus,
}

impl CreditKind {
    pub fn bucket(self) -> Bucket {
        match self {
            CreditKind::Win => Bucket::Winnings,
            CreditKind::Refund => Bucket::Deposit,
            CreditKind::Bonus => Bucket::Bonus,
        }
    }

    pub fn entry_type(self) -> EntryType {
        match self {
            CreditKind::Win => EntryType::Win,
            CreditKind::Refund => EntryType::Refund,
            CreditKind::Bonus => EntryType::Bonus,
        }
    }
}

impl fmt::Display for CreditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditKind::Win => write!(f, "WIN"),
            CreditKind::Refund => write!(f, "REFUND"),
            CreditKind::Bonus => write!(f, "BONUS"),
        }
    }
}

/// Transaction request sent by caller services
///
/// The transport (HTTP, RPC) belongs to the caller; this is the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Idempotency key
    pub transaction_id: String,
    pub reference_id: String,
    pub reference_type: String,
}

impl TransactionRequest {
    pub fn context(&self) -> OperationContext {
        OperationContext {
            transaction_id: self.transaction_id.clone(),
            reference_id: self.reference_id.clone(),
            reference_type: self.reference_type.clone(),
        }
    }
}

/// Response returned to caller services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionResponse {
    Success {
        new_balance: Decimal,
        transaction_id: String,
    },
    AlreadyProcessed,
}

/// Caller-supplied identifiers attached to every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Idempotency key
    pub transaction_id: String,
    /// External reference, e.g. a match or game session id
    pub reference_id: String,
    /// Reference category, e.g. `MATCH_CRICKET` or `PAYMENT_GATEWAY`
    pub reference_type: String,
}

impl OperationContext {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            reference_id: String::new(),
            reference_type: String::new(),
        }
    }

    pub fn with_reference(
        mut self,
        reference_id: impl Into<String>,
        reference_type: impl Into<String>,
    ) -> Self {
        self.reference_id = reference_id.into();
        self.reference_type = reference_type.into();
        self
    }
}

/// The logical request behind a journal entry
///
/// Stored on each entry so a replayed idempotency key can be compared with
/// the request that first used it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Deposit { amount: Decimal },
    Withdraw { amount: Decimal },
    LockForBet { stake: Decimal },
    SettleBet { stake: Decimal, payout: Decimal, won: bool },
    Debit { amount: Decimal },
    Credit { kind: CreditKind, amount: Decimal },
    ExpireBonus { amount: Decimal },
}

impl Operation {
    /// Short name used in logs and overflow errors
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Withdraw { .. } => "withdraw",
            Operation::LockForBet { .. } => "lock_for_bet",
            Operation::SettleBet { .. } => "settle_bet",
            Operation::Debit { .. } => "debit",
            Operation::Credit { .. } => "credit",
            Operation::ExpireBonus { .. } => "expire_bonus",
        }
    }

    /// The amount or stake the caller asked for
    pub fn requested(&self) -> Decimal {
        match *self {
            Operation::Deposit { amount }
            | Operation::Withdraw { amount }
            | Operation::Debit { amount }
            | Operation::Credit { amount, .. }
            | Operation::ExpireBonus { amount } => amount,
            Operation::LockForBet { stake } | Operation::SettleBet { stake, .. } => stake,
        }
    }
}

/// Result of a processor operation
///
/// Both a fresh application and a replay produce a receipt; for a replay the
/// entry is the one recorded by the original call and `replayed` is set.
/// Callers that need the recorded outcome of a replay read `entry`, never
/// `wallet`.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub entry: LedgerEntry,
    /// Wallet snapshot taken under the lock
    ///
    /// For a fresh operation this is the state the operation produced. For a
    /// replay it is the wallet as it stands when the replay is answered, which
    /// includes every operation committed since the original call.
    pub wallet: Wallet,
    pub replayed: bool,
}

impl Receipt {
    pub fn transaction_id(&self) -> &str {
        &self.entry.idempotency_key
    }

    pub fn balance_after(&self) -> Decimal {
        self.entry.balance_after
    }

    pub fn to_response(&self) -> TransactionResponse {
        if self.replayed {
            TransactionResponse::AlreadyProcessed
        } else {
            TransactionResponse::Success {
                new_balance: self.balance_after(),
                transaction_id: self.transaction_id().to_string(),
            }
        }
    }
}

/// Row types accepted by the batch replay feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    /// A request routed through the uniform contract
    Request(RequestKind),
    Lock,
    Settle,
    ExpireBonus,
    /// KYC tier update from the KYC workflow
    Kyc,
    Suspend,
    Activate,
    /// User-chosen deposit limit; zero clears it
    DepositLimit(LimitPeriod),
    /// Self-exclusion for a number of days
    SelfExclude,
}

/// Batch feed record
///
/// Field presence depends on the row type; `csv_format::convert_csv_record`
/// validates it before a record is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub tx_type: FeedType,
    pub user: UserId,
    /// Idempotency key (empty for collaborator rows)
    pub tx: String,
    /// Amount or stake; the tier on KYC rows, the day count on exclusion rows
    pub amount: Option<Decimal>,
    pub payout: Option<Decimal>,
    pub won: Option<bool>,
    pub reference: Option<String>,
}
