//! Core business logic module
//!
//! This module contains the wallet ledger components:
//! - `traits` - Seams for storage, journal and time
//! - `balance_store` - Wallet rows with per-user locking
//! - `ledger_journal` - Append-only idempotent journal
//! - `limits` - KYC-tier daily deposit caps
//! - `drain` - Priority-ordered bucket draining
//! - `processor` - The wallet operations
//! - `dispatch` - Batch feed record dispatch
//! - `projection` - Advisory balance read view
//! - `reconcile` - Journal-to-wallet reconciliation
//! - `batch_processor` - Concurrent per-user batch application
//! - `clock` - System and manual clocks

pub mod balance_store;
pub mod batch_processor;
pub mod clock;
pub mod dispatch;
pub mod drain;
pub mod ledger_journal;
pub mod limits;
pub mod processor;
pub mod projection;
pub mod reconcile;
pub mod traits;

pub use balance_store::InMemoryBalanceStore;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use clock::{ManualClock, SystemClock};
pub use ledger_journal::InMemoryLedgerJournal;
pub use limits::LimitEnforcer;
pub use processor::{InMemoryProcessor, TransactionProcessor};
pub use projection::BalanceProjection;
pub use reconcile::{BucketDrift, Reconciliation};
pub use traits::{BalanceStore, Clock, LedgerJournal};
