//! Wallet Ledger Engine Library
//! # Overview
//!
//! A wallet ledger for a real-money gaming platform. Every user has one wallet
//! split into deposit, bonus, winnings and locked buckets; every balance change
//! is journaled exactly once under an idempotency key.
//!
//! # Architecture
//!
//! - [`types`] - Wallets, ledger entries, requests, receipts and `WalletError`
//! - [`core`] - Business logic components:
//!   - [`core::balance_store`] - Wallet rows behind per-user locks
//!   - [`core::ledger_journal`] - Append-only idempotent journal
//!   - [`core::limits`] - KYC-tier daily deposit caps
//!   - [`core::processor`] - Deposit, withdraw, lock, settle, debit, credit
//!   - [`core::batch_processor`] - Concurrent per-user feed application
//! - [`config`] - Engine configuration
//! - [`io`] - CSV feed readers and wallet output
//! - [`strategy`] - Sync and async feed replay pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Wallet Invariants
//!
//! - No bucket is ever negative
//! - `available = deposit + bonus + winnings - locked` is never negative
//! - Only deposit and winnings are withdrawable
//! - A transaction id is journaled at most once; replays return the original
//!   result without touching balances

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use core::{
    BalanceStore, Clock, InMemoryBalanceStore, InMemoryLedgerJournal, InMemoryProcessor,
    LedgerJournal, TransactionProcessor,
};
pub use io::write_wallets_csv;
pub use types::{
    LedgerEntry, OperationContext, Receipt, TransactionRecord, TransactionRequest,
    TransactionResponse, UserId, Wallet, WalletError,
};
