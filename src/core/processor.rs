//! Transaction processing orchestration
//!
//! This module provides the `TransactionProcessor` struct, which exposes every
//! balance-affecting operation of the wallet ledger.
//!
//! # Design
//!
//! Each operation runs as one locked unit of work on the user's wallet:
//!
//! ```text
//! validate amount (no lock)
//!   -> BalanceStore::with_locked_wallet
//!        -> LedgerJournal::lookup      (replay or conflict)
//!        -> status check
//!        -> LimitEnforcer              (deposit only: exclusion, caps, self-limits)
//!        -> bucket arithmetic          (drain_in_priority)
//!        -> available >= 0 check
//!        -> LedgerJournal::append      (last fallible step)
//!   -> wallet persisted, projection published
//! ```
//!
//! Any error inside the unit discards the working copy, so the stored wallet
//! and the journal are always updated together or not at all.
//!
//! # Architecture
//!
//! ```text
//! TransactionProcessor
//!     ├── Arc<S: BalanceStore>      (wallet rows, per-user lock)
//!     ├── Arc<J: LedgerJournal>     (append-only journal)
//!     ├── LimitEnforcer             (tier caps, self-limits, exclusion)
//!     ├── Arc<BalanceProjection>    (advisory read view)
//!     └── Arc<dyn Clock>
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, error, info};

use super::balance_store::InMemoryBalanceStore;
use super::drain::{drain_in_priority, BET_PRIORITY, DEBIT_PRIORITY, WITHDRAW_PRIORITY};
use super::ledger_journal::InMemoryLedgerJournal;
use super::limits::LimitEnforcer;
use super::projection::BalanceProjection;
use super::reconcile::Reconciliation;
use super::traits::{BalanceStore, Clock, LedgerJournal};
use crate::config::EngineConfig;
use crate::types::{
    round_currency, BonusGrant, Bucket, BucketMovement, BucketTag, CreditKind, EntryType,
    ErrorClass, GrantStatus, LedgerEntry, LimitPeriod, Operation, OperationContext, Receipt,
    RequestKind, TransactionRequest, TransactionResponse, Wallet, WalletError, WalletStatus,
    CURRENCY_SCALE,
};

/// Processor over the in-memory store and journal
pub type InMemoryProcessor = TransactionProcessor<InMemoryBalanceStore, InMemoryLedgerJournal>;

/// Bucket changes produced by one operation, before they are journaled
#[derive(Debug)]
struct Applied {
    entry_type: EntryType,
    amount: Decimal,
    bucket: BucketTag,
    movements: Vec<BucketMovement>,
}

/// Wallet ledger transaction processor
///
/// Cheap to clone: all state is shared through `Arc`.
pub struct TransactionProcessor<S, J> {
    store: Arc<S>,
    journal: Arc<J>,
    limits: LimitEnforcer,
    bonus_expiry: Duration,
    projection: Arc<BalanceProjection>,
    clock: Arc<dyn Clock>,
}

impl<S, J> Clone for TransactionProcessor<S, J> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            journal: Arc::clone(&self.journal),
            limits: self.limits.clone(),
            bonus_expiry: self.bonus_expiry,
            projection: Arc::clone(&self.projection),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, J> std::fmt::Debug for TransactionProcessor<S, J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProcessor")
            .field("limits", &self.limits)
            .field("bonus_expiry", &self.bonus_expiry)
            .field("projection", &self.projection)
            .finish_non_exhaustive()
    }
}

impl InMemoryProcessor {
    /// Create a processor backed by a fresh in-memory store and journal
    pub fn in_memory(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(InMemoryBalanceStore::new(
            config.currency.clone(),
            Arc::clone(&clock),
        ));
        let journal = Arc::new(InMemoryLedgerJournal::new());
        Self::new(store, journal, config, clock)
    }
}

/// Round to currency precision and reject non-positive amounts
fn positive_amount(amount: Decimal) -> Result<Decimal, WalletError> {
    let rounded = round_currency(amount);
    if rounded <= Decimal::ZERO {
        return Err(WalletError::invalid_amount(amount));
    }
    Ok(rounded)
}

/// Largest stake a lock could take from this wallet
///
/// A stake leaves the spendable buckets and is also counted in `locked`, so
/// it reduces the available balance twice.
fn max_stake(wallet: &Wallet) -> Decimal {
    let available = wallet.available().max(Decimal::ZERO);
    (available / Decimal::from(2))
        .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToZero)
}

/// Largest request of this kind the wallet could have accepted
fn acceptable_amount(operation: &Operation, wallet: &Wallet) -> Decimal {
    match operation {
        Operation::LockForBet { .. } => max_stake(wallet),
        _ => wallet.available(),
    }
}

fn add_to_bucket(
    wallet: &mut Wallet,
    bucket: Bucket,
    amount: Decimal,
    operation: &str,
) -> Result<(), WalletError> {
    let user_id = wallet.user_id.clone();
    let balance = wallet.bucket_mut(bucket);
    *balance = balance
        .checked_add(amount)
        .ok_or_else(|| WalletError::arithmetic_overflow(operation, &user_id))?;
    Ok(())
}

impl<S, J> TransactionProcessor<S, J>
where
    S: BalanceStore,
    J: LedgerJournal,
{
    /// Create a processor over an injected store and journal
    ///
    /// # Arguments
    ///
    /// * `store` - Wallet rows and per-user locking
    /// * `journal` - Append-only ledger journal
    /// * `config` - Tier caps, deposit windows, bonus expiry and projection TTL
    /// * `clock` - Time source for timestamps and the deposit window
    pub fn new(store: Arc<S>, journal: Arc<J>, config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            journal,
            limits: LimitEnforcer::from_config(config),
            bonus_expiry: config.bonus_expiry,
            projection: Arc::new(BalanceProjection::new(
                config.projection_ttl,
                Arc::clone(&clock),
            )),
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn journal(&self) -> &Arc<J> {
        &self.journal
    }

    /// Credit real money to the deposit bucket, subject to the deposit limits
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `WalletInactive`, `SelfExcluded`, `LimitExceeded`,
    /// `SelfLimitExceeded`, `IdempotencyConflict`
    pub fn deposit(
        &self,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let amount = positive_amount(amount)?;

        self.execute(user_id, ctx, Operation::Deposit { amount }, |wallet, now| {
            self.limits.check_and_reserve(wallet, amount, now)?;
            add_to_bucket(wallet, Bucket::Deposit, amount, "deposit")?;
            Ok(Applied {
                entry_type: EntryType::Deposit,
                amount,
                bucket: BucketTag::Deposit,
                movements: vec![BucketMovement::credit(Bucket::Deposit, amount)],
            })
        })
    }

    /// Pay money out of winnings, then deposit; bonus is never withdrawable
    ///
    /// # Errors
    ///
    /// * `InsufficientFunds` if `amount` exceeds the available balance
    /// * `InsufficientWithdrawable` if winnings and deposit cannot cover it
    pub fn withdraw(
        &self,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let amount = positive_amount(amount)?;

        self.execute(user_id, ctx, Operation::Withdraw { amount }, |wallet, _| {
            let available = wallet.available();
            if amount > available {
                return Err(WalletError::insufficient_funds(user_id, available, amount));
            }

            let withdrawable = wallet.withdrawable();
            let drain = drain_in_priority(wallet, &WITHDRAW_PRIORITY, amount);
            if !drain.is_complete() {
                return Err(WalletError::insufficient_withdrawable(
                    user_id,
                    withdrawable,
                    amount,
                ));
            }

            Ok(Applied {
                entry_type: EntryType::Withdraw,
                amount: -amount,
                bucket: BucketTag::for_movements(&drain.movements, Bucket::Deposit),
                movements: drain.movements,
            })
        })
    }

    /// Reserve a stake against an open bet
    ///
    /// The stake is drained bonus first, then deposit, then winnings, and
    /// added to the locked bucket. A rejection reports the largest stake the
    /// wallet would have accepted as `available`.
    pub fn lock_for_bet(
        &self,
        user_id: &str,
        stake: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let stake = positive_amount(stake)?;

        self.execute(user_id, ctx, Operation::LockForBet { stake }, |wallet, _| {
            let acceptable = max_stake(wallet);
            if stake > acceptable {
                return Err(WalletError::insufficient_funds(user_id, acceptable, stake));
            }

            let drain = drain_in_priority(wallet, &BET_PRIORITY, stake);
            if !drain.is_complete() {
                return Err(WalletError::insufficient_funds(user_id, acceptable, stake));
            }
            add_to_bucket(wallet, Bucket::Locked, stake, "lock_for_bet")?;

            let mut movements = drain.movements;
            movements.push(BucketMovement::credit(Bucket::Locked, stake));

            Ok(Applied {
                entry_type: EntryType::Bet,
                amount: -stake,
                bucket: BucketTag::Locked,
                movements,
            })
        })
    }

    /// Resolve a locked stake
    ///
    /// `payout` is stake plus profit on a win and zero on a loss or void; it
    /// is credited to winnings only when `won` is set and it is positive.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if the stake is not positive or the payout negative
    /// * `SettlementError` if less than `stake` is locked
    pub fn settle_bet(
        &self,
        user_id: &str,
        stake: Decimal,
        payout: Decimal,
        won: bool,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let stake = positive_amount(stake)?;
        let payout = round_currency(payout);
        if payout < Decimal::ZERO {
            return Err(WalletError::invalid_amount(payout));
        }

        let operation = Operation::SettleBet { stake, payout, won };
        self.execute(user_id, ctx, operation, |wallet, _| {
            if wallet.locked_balance < stake {
                return Err(WalletError::settlement(
                    user_id,
                    wallet.locked_balance,
                    stake,
                ));
            }
            wallet.locked_balance -= stake;
            let mut movements = vec![BucketMovement::debit(Bucket::Locked, stake)];

            if won && payout > Decimal::ZERO {
                add_to_bucket(wallet, Bucket::Winnings, payout, "settle_bet")?;
                movements.push(BucketMovement::credit(Bucket::Winnings, payout));
                return Ok(Applied {
                    entry_type: EntryType::Win,
                    amount: payout,
                    bucket: BucketTag::Winnings,
                    movements,
                });
            }

            Ok(Applied {
                entry_type: EntryType::BetSettle,
                amount: -stake,
                bucket: BucketTag::Locked,
                movements,
            })
        })
    }

    /// Generic debit against the total, drained deposit, winnings, bonus
    pub fn debit(
        &self,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let amount = positive_amount(amount)?;

        self.execute(user_id, ctx, Operation::Debit { amount }, |wallet, _| {
            let available = wallet.available();
            if amount > available {
                return Err(WalletError::insufficient_funds(user_id, available, amount));
            }

            let drain = drain_in_priority(wallet, &DEBIT_PRIORITY, amount);
            if !drain.is_complete() {
                return Err(WalletError::insufficient_funds(user_id, available, amount));
            }

            Ok(Applied {
                entry_type: EntryType::Bet,
                amount: -amount,
                bucket: BucketTag::for_movements(&drain.movements, Bucket::Deposit),
                movements: drain.movements,
            })
        })
    }

    /// Generic credit into the bucket matching `kind`
    ///
    /// Bonus credits become grants with the configured default expiry.
    pub fn credit(
        &self,
        user_id: &str,
        kind: CreditKind,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        if kind == CreditKind::Bonus {
            return self.grant_bonus(user_id, amount, self.bonus_expiry, ctx);
        }
        let amount = positive_amount(amount)?;
        let bucket = kind.bucket();

        self.execute(user_id, ctx, Operation::Credit { kind, amount }, |wallet, _| {
            add_to_bucket(wallet, bucket, amount, "credit")?;
            Ok(Applied {
                entry_type: kind.entry_type(),
                amount,
                bucket: bucket.into(),
                movements: vec![BucketMovement::credit(bucket, amount)],
            })
        })
    }

    /// Promotional grant into the bonus bucket
    ///
    /// Records a [`BonusGrant`] on the wallet, keyed by the transaction id and
    /// expiring `expires_in` after the processor clock's current time. The
    /// journal entry is the same `BONUS` credit as any other bonus credit.
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` if `expires_in` is not positive
    pub fn grant_bonus(
        &self,
        user_id: &str,
        amount: Decimal,
        expires_in: Duration,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        let amount = positive_amount(amount)?;
        if expires_in <= Duration::zero() {
            return Err(WalletError::invalid_request("bonus expiry must be positive"));
        }

        let kind = CreditKind::Bonus;
        self.execute(user_id, ctx, Operation::Credit { kind, amount }, |wallet, now| {
            let expires_at = now
                .checked_add_signed(expires_in)
                .ok_or_else(|| WalletError::arithmetic_overflow("grant_bonus", user_id))?;
            add_to_bucket(wallet, Bucket::Bonus, amount, "grant_bonus")?;
            wallet
                .bonus_grants
                .push(BonusGrant::new(&ctx.transaction_id, amount, now, expires_at));
            Ok(Applied {
                entry_type: kind.entry_type(),
                amount,
                bucket: BucketTag::Bonus,
                movements: vec![BucketMovement::credit(Bucket::Bonus, amount)],
            })
        })
    }

    /// Remove up to `amount` of expired promotional money
    ///
    /// The removal is capped by the bonus bucket and by the available balance,
    /// so it never fails for lack of funds. Even a zero removal is journaled,
    /// which consumes the expiry key exactly once.
    pub fn expire_bonus(
        &self,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        self.remove_bonus(user_id, amount, ctx, None)
    }

    /// Expire every active grant whose expiry has passed
    ///
    /// Each grant is removed under its own key (`<grant id>:expiry`), so a
    /// retried or concurrent sweep removes a grant at most once. The removal
    /// is the grant amount with the same caps as [`Self::expire_bonus`], and
    /// the grant is marked `EXPIRED` in the same unit of work.
    pub fn expire_due_bonuses(&self, user_id: &str) -> Result<Vec<Receipt>, WalletError> {
        let now = self.clock.now();
        let due = self.store.snapshot(user_id)?.due_grants(now);

        let mut receipts = Vec::with_capacity(due.len());
        for grant in due {
            let ctx = OperationContext::new(grant.expiry_key())
                .with_reference(grant.grant_id.clone(), "BONUS_GRANT");
            let receipt = self.remove_bonus(user_id, grant.amount, &ctx, Some(&grant.grant_id))?;
            receipts.push(receipt);
        }

        if !receipts.is_empty() {
            info!(user_id, expired = receipts.len(), "due bonus grants expired");
        }
        Ok(receipts)
    }

    fn remove_bonus(
        &self,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
        grant_id: Option<&str>,
    ) -> Result<Receipt, WalletError> {
        let amount = positive_amount(amount)?;

        self.execute(user_id, ctx, Operation::ExpireBonus { amount }, |wallet, _| {
            let mut cap = amount;
            if let Some(grant_id) = grant_id {
                match wallet.grant_mut(grant_id) {
                    Some(grant) if grant.status == GrantStatus::Active => {
                        grant.status = GrantStatus::Expired;
                    }
                    // Closed between the scan and the lock
                    _ => cap = Decimal::ZERO,
                }
            }

            let available = wallet.available().max(Decimal::ZERO);
            let removed = cap.min(wallet.bonus_balance).min(available);

            let mut movements = Vec::new();
            if removed > Decimal::ZERO {
                wallet.bonus_balance -= removed;
                movements.push(BucketMovement::debit(Bucket::Bonus, removed));
            }

            Ok(Applied {
                entry_type: EntryType::Bonus,
                amount: -removed,
                bucket: BucketTag::Bonus,
                movements,
            })
        })
    }

    /// Apply a request from the uniform caller contract
    ///
    /// `DEPOSIT` goes through the daily limit, `WITHDRAWAL` through the
    /// withdraw priority, `BET` is a generic debit and `WIN` / `REFUND` /
    /// `BONUS` are generic credits.
    pub fn process(&self, request: &TransactionRequest) -> Result<TransactionResponse, WalletError> {
        let ctx = request.context();
        let receipt = self.route(request.kind, &request.user_id, request.amount, &ctx)?;
        Ok(receipt.to_response())
    }

    pub(crate) fn route(
        &self,
        kind: RequestKind,
        user_id: &str,
        amount: Decimal,
        ctx: &OperationContext,
    ) -> Result<Receipt, WalletError> {
        match kind {
            RequestKind::Deposit => self.deposit(user_id, amount, ctx),
            RequestKind::Withdrawal => self.withdraw(user_id, amount, ctx),
            RequestKind::Bet => self.debit(user_id, amount, ctx),
            RequestKind::Win => self.credit(user_id, CreditKind::Win, amount, ctx),
            RequestKind::Refund => self.credit(user_id, CreditKind::Refund, amount, ctx),
            RequestKind::Bonus => self.credit(user_id, CreditKind::Bonus, amount, ctx),
        }
    }

    /// Current wallet snapshot, creating the wallet if absent
    pub fn balance(&self, user_id: &str) -> Result<Wallet, WalletError> {
        self.store.snapshot(user_id)
    }

    /// Last published available balance, if still fresh
    ///
    /// Advisory only; never use it to decide a debit.
    pub fn projected_balance(&self, user_id: &str) -> Option<Decimal> {
        self.projection.get(user_id)
    }

    /// Record the tier assigned by the KYC workflow
    pub fn set_kyc_tier(&self, user_id: &str, tier: u8) -> Result<Wallet, WalletError> {
        let now = self.clock.now();
        let wallet = self.store.with_locked_wallet(user_id, |wallet| {
            wallet.kyc_tier = tier;
            wallet.updated_at = now;
            Ok(wallet.clone())
        })?;
        info!(user_id, tier, "kyc tier updated");
        Ok(wallet)
    }

    /// Suspend or reactivate a wallet
    ///
    /// Suspension also drops the user's projected balance.
    pub fn set_status(&self, user_id: &str, status: WalletStatus) -> Result<Wallet, WalletError> {
        let now = self.clock.now();
        let wallet = self.store.with_locked_wallet(user_id, |wallet| {
            wallet.status = status;
            wallet.updated_at = now;
            Ok(wallet.clone())
        })?;
        if status == WalletStatus::Suspended {
            self.projection.invalidate(user_id);
        }
        info!(user_id, %status, "wallet status updated");
        Ok(wallet)
    }

    /// Set or clear a deposit limit the user chose for themselves
    ///
    /// A zero `amount` clears the limit. The deposit counters keep running,
    /// so a new limit also counts deposits already made in its window.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` if `amount` is negative
    pub fn set_deposit_limit(
        &self,
        user_id: &str,
        period: LimitPeriod,
        amount: Decimal,
    ) -> Result<Wallet, WalletError> {
        let amount = round_currency(amount);
        if amount < Decimal::ZERO {
            return Err(WalletError::invalid_amount(amount));
        }
        let limit = (amount > Decimal::ZERO).then_some(amount);

        let now = self.clock.now();
        let wallet = self.store.with_locked_wallet(user_id, |wallet| {
            *wallet.self_limit_mut(period) = limit;
            wallet.updated_at = now;
            Ok(wallet.clone())
        })?;
        info!(user_id, %period, limit = ?limit, "deposit limit updated");
        Ok(wallet)
    }

    /// Refuse the user's deposits for `days` days from now
    ///
    /// An exclusion that already runs past the new end is kept.
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` if `days` is zero
    pub fn self_exclude(&self, user_id: &str, days: u32) -> Result<Wallet, WalletError> {
        if days == 0 {
            return Err(WalletError::invalid_request(
                "self-exclusion must last at least one day",
            ));
        }

        let now = self.clock.now();
        let until = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| WalletError::arithmetic_overflow("self_exclude", user_id))?;
        let wallet = self.store.with_locked_wallet(user_id, |wallet| {
            let until = wallet.self_excluded_until.map_or(until, |current| current.max(until));
            wallet.self_excluded_until = Some(until);
            wallet.updated_at = now;
            Ok(wallet.clone())
        })?;
        info!(user_id, until = ?wallet.self_excluded_until, "self-exclusion recorded");
        Ok(wallet)
    }

    /// Compare a user's journal with the stored wallet
    ///
    /// Runs under the wallet lock so no entry for this user can be appended
    /// between reading the row and reading the journal.
    pub fn reconcile(&self, user_id: &str) -> Result<Reconciliation, WalletError> {
        self.store.with_locked_wallet(user_id, |wallet| {
            let entries = self.journal.entries_for(user_id);
            Ok(Reconciliation::compute(wallet, &entries))
        })
    }

    pub fn entries_for(&self, user_id: &str) -> Vec<LedgerEntry> {
        self.journal.entries_for(user_id)
    }

    pub fn all_wallets(&self) -> Vec<Wallet> {
        self.store.all_wallets()
    }

    /// Run one operation as a single locked unit of work
    fn execute<F>(
        &self,
        user_id: &str,
        ctx: &OperationContext,
        operation: Operation,
        apply: F,
    ) -> Result<Receipt, WalletError>
    where
        F: FnOnce(&mut Wallet, DateTime<Utc>) -> Result<Applied, WalletError>,
    {
        if ctx.transaction_id.trim().is_empty() {
            return Err(WalletError::invalid_request("transaction_id must not be empty"));
        }

        let result = self.store.with_locked_wallet(user_id, |wallet| {
            debug!(
                user_id,
                transaction_id = %ctx.transaction_id,
                operation = operation.name(),
                "wallet locked"
            );

            if let Some(recorded) = self.journal.lookup(&ctx.transaction_id)? {
                return Self::replay(recorded, user_id, &operation, wallet);
            }

            if !wallet.is_active() {
                return Err(WalletError::wallet_inactive(user_id, wallet.status));
            }

            let original = wallet.clone();
            let now = self.clock.now();
            let applied = apply(wallet, now)?;
            wallet.round_buckets();
            wallet.close_spent_grants();
            wallet.updated_at = now;

            let balance_after = wallet
                .checked_available()
                .ok_or_else(|| WalletError::arithmetic_overflow(operation.name(), user_id))?;
            if balance_after < Decimal::ZERO {
                return Err(WalletError::insufficient_funds(
                    user_id,
                    acceptable_amount(&operation, &original),
                    operation.requested(),
                ));
            }

            let entry = LedgerEntry {
                sequence: 0,
                idempotency_key: ctx.transaction_id.clone(),
                user_id: user_id.to_string(),
                entry_type: applied.entry_type,
                amount: applied.amount,
                bucket: applied.bucket,
                movements: applied.movements,
                operation: operation.clone(),
                reference_id: ctx.reference_id.clone(),
                reference_type: ctx.reference_type.clone(),
                balance_after,
                created_at: now,
            };

            match self.journal.append(entry) {
                Ok(entry) => Ok(Receipt {
                    entry,
                    wallet: wallet.clone(),
                    replayed: false,
                }),
                Err(WalletError::AlreadyProcessed { .. }) => {
                    // Another user's operation claimed the key after our lookup
                    *wallet = original;
                    let recorded = self.journal.lookup(&ctx.transaction_id)?.ok_or_else(|| {
                        WalletError::storage("journal entry missing after duplicate append")
                    })?;
                    Self::replay(recorded, user_id, &operation, wallet)
                }
                Err(e) => Err(e),
            }
        });

        match &result {
            Ok(receipt) if receipt.replayed => {
                debug!(
                    user_id,
                    transaction_id = %ctx.transaction_id,
                    "replayed recorded result"
                );
            }
            Ok(receipt) => {
                self.projection.publish(user_id, receipt.entry.balance_after);
                info!(
                    user_id,
                    transaction_id = %ctx.transaction_id,
                    entry_type = %receipt.entry.entry_type,
                    amount = %receipt.entry.amount,
                    balance_after = %receipt.entry.balance_after,
                    "transaction committed"
                );
            }
            Err(e) if e.class() == ErrorClass::Infrastructure => {
                error!(
                    user_id,
                    transaction_id = %ctx.transaction_id,
                    operation = operation.name(),
                    error = %e,
                    "transaction failed"
                );
            }
            Err(e) => {
                debug!(
                    user_id,
                    transaction_id = %ctx.transaction_id,
                    error = %e,
                    "transaction rejected"
                );
            }
        }

        result
    }

    /// Return the recorded result for a repeated key, or reject a mismatch
    ///
    /// The receipt pairs the recorded entry with the wallet as it is now.
    fn replay(
        recorded: LedgerEntry,
        user_id: &str,
        operation: &Operation,
        wallet: &Wallet,
    ) -> Result<Receipt, WalletError> {
        if !recorded.matches(user_id, operation) {
            return Err(WalletError::idempotency_conflict(&recorded.idempotency_key));
        }
        Ok(Receipt {
            entry: recorded,
            wallet: wallet.clone(),
            replayed: true,
        })
    }
}
