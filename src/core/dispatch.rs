//! Feed record dispatch
//!
//! Maps one batch feed row onto the processor operation it names. Money rows
//! yield a [`Receipt`]; collaborator rows (KYC tier, suspension) and the
//! user's responsible-gaming rows (deposit limits, self-exclusion) yield
//! `None`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::processor::TransactionProcessor;
use super::traits::{BalanceStore, LedgerJournal};
use crate::types::{
    FeedType, OperationContext, Receipt, TransactionRecord, WalletError, WalletStatus,
};

fn required_amount(record: &TransactionRecord) -> Result<Decimal, WalletError> {
    record
        .amount
        .ok_or_else(|| WalletError::invalid_request("amount is required"))
}

fn whole_amount(record: &TransactionRecord, what: &str) -> Result<Decimal, WalletError> {
    let value = required_amount(record)?;
    if !value.fract().is_zero() {
        return Err(WalletError::invalid_request(&format!("{what} must be an integer")));
    }
    Ok(value)
}

fn kyc_tier(record: &TransactionRecord) -> Result<u8, WalletError> {
    whole_amount(record, "kyc tier")?
        .to_u8()
        .ok_or_else(|| WalletError::invalid_request("kyc tier out of range"))
}

fn exclusion_days(record: &TransactionRecord) -> Result<u32, WalletError> {
    whole_amount(record, "self-exclusion days")?
        .to_u32()
        .ok_or_else(|| WalletError::invalid_request("self-exclusion days out of range"))
}

impl<S, J> TransactionProcessor<S, J>
where
    S: BalanceStore,
    J: LedgerJournal,
{
    /// Apply one feed record
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Receipt))` - A money operation committed or replayed
    /// * `Ok(None)` - A collaborator update was applied
    /// * `Err(WalletError)` - The operation was rejected
    pub fn apply(&self, record: &TransactionRecord) -> Result<Option<Receipt>, WalletError> {
        let ctx = OperationContext {
            transaction_id: record.tx.clone(),
            reference_id: record.reference.clone().unwrap_or_default(),
            reference_type: String::new(),
        };
        let user_id = record.user.as_str();

        let receipt = match record.tx_type {
            FeedType::Request(kind) => self.route(kind, user_id, required_amount(record)?, &ctx)?,
            FeedType::Lock => self.lock_for_bet(user_id, required_amount(record)?, &ctx)?,
            FeedType::Settle => {
                let won = record
                    .won
                    .ok_or_else(|| WalletError::invalid_request("settle requires won"))?;
                let payout = record.payout.unwrap_or(Decimal::ZERO);
                self.settle_bet(user_id, required_amount(record)?, payout, won, &ctx)?
            }
            FeedType::ExpireBonus => self.expire_bonus(user_id, required_amount(record)?, &ctx)?,
            FeedType::Kyc => {
                self.set_kyc_tier(user_id, kyc_tier(record)?)?;
                return Ok(None);
            }
            FeedType::Suspend => {
                self.set_status(user_id, WalletStatus::Suspended)?;
                return Ok(None);
            }
            FeedType::Activate => {
                self.set_status(user_id, WalletStatus::Active)?;
                return Ok(None);
            }
            FeedType::DepositLimit(period) => {
                self.set_deposit_limit(user_id, period, required_amount(record)?)?;
                return Ok(None);
            }
            FeedType::SelfExclude => {
                self.self_exclude(user_id, exclusion_days(record)?)?;
                return Ok(None);
            }
        };

        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::clock::SystemClock;
    use crate::core::InMemoryProcessor;
    use crate::types::{EntryType, LimitPeriod, RequestKind};
    use std::sync::Arc;

    fn record(tx_type: FeedType, tx: &str, amount: Option<i64>) -> TransactionRecord {
        TransactionRecord {
            tx_type,
            user: "alice".to_string(),
            tx: tx.to_string(),
            amount: amount.map(Decimal::from),
            payout: None,
            won: None,
            reference: None,
        }
    }

    fn processor() -> InMemoryProcessor {
        InMemoryProcessor::in_memory(&EngineConfig::default(), Arc::new(SystemClock))
    }

    #[test]
    fn test_apply_request_rows() {
        let processor = processor();

        let receipt = processor
            .apply(&record(FeedType::Request(RequestKind::Deposit), "d-1", Some(100)))
            .unwrap()
            .unwrap();

        assert_eq!(receipt.entry.entry_type, EntryType::Deposit);
        assert_eq!(receipt.wallet.deposit_balance, Decimal::from(100));
    }

    #[test]
    fn test_apply_lock_and_settle() {
        let processor = processor();
        processor
            .apply(&record(FeedType::Request(RequestKind::Deposit), "d-1", Some(100)))
            .unwrap();
        processor
            .apply(&record(FeedType::Lock, "b-1", Some(30)))
            .unwrap();

        let mut settle = record(FeedType::Settle, "s-1", Some(30));
        settle.won = Some(true);
        settle.payout = Some(Decimal::from(60));
        let receipt = processor.apply(&settle).unwrap().unwrap();

        assert_eq!(receipt.entry.entry_type, EntryType::Win);
        assert_eq!(receipt.wallet.winnings_balance, Decimal::from(60));
        assert_eq!(receipt.wallet.locked_balance, Decimal::ZERO);
    }

    #[test]
    fn test_settle_without_won_is_invalid() {
        let processor = processor();

        let result = processor.apply(&record(FeedType::Settle, "s-1", Some(30)));

        assert!(matches!(result, Err(WalletError::InvalidRequest { .. })));
    }

    #[test]
    fn test_collaborator_rows_return_none() {
        let processor = processor();

        assert_eq!(processor.apply(&record(FeedType::Kyc, "", Some(2))), Ok(None));
        assert_eq!(processor.balance("alice").unwrap().kyc_tier, 2);

        assert_eq!(processor.apply(&record(FeedType::Suspend, "", None)), Ok(None));
        assert_eq!(
            processor.balance("alice").unwrap().status,
            WalletStatus::Suspended
        );

        assert_eq!(processor.apply(&record(FeedType::Activate, "", None)), Ok(None));
        assert_eq!(processor.balance("alice").unwrap().status, WalletStatus::Active);
    }

    #[test]
    fn test_kyc_tier_must_be_small_integer() {
        let processor = processor();

        let mut fractional = record(FeedType::Kyc, "", None);
        fractional.amount = Some(Decimal::new(15, 1));
        assert!(processor.apply(&fractional).is_err());

        assert!(processor.apply(&record(FeedType::Kyc, "", Some(300))).is_err());
        assert!(processor.apply(&record(FeedType::Kyc, "", None)).is_err());
    }

    #[test]
    fn test_responsible_gaming_rows_return_none() {
        let processor = processor();

        let limit = record(FeedType::DepositLimit(LimitPeriod::Weekly), "", Some(1000));
        assert_eq!(processor.apply(&limit), Ok(None));
        assert_eq!(
            processor.balance("alice").unwrap().weekly_self_limit,
            Some(Decimal::from(1000))
        );

        assert_eq!(processor.apply(&record(FeedType::SelfExclude, "", Some(7))), Ok(None));
        let rejected = processor.apply(&record(FeedType::Request(RequestKind::Deposit), "d-1", Some(10)));
        assert!(matches!(rejected, Err(WalletError::SelfExcluded { .. })));
    }

    #[rstest::rstest]
    #[case::fractional(Some(Decimal::new(15, 1)))]
    #[case::negative(Some(Decimal::from(-3)))]
    #[case::zero(Some(Decimal::ZERO))]
    #[case::missing(None)]
    fn test_self_exclusion_days_must_be_positive_integer(#[case] days: Option<Decimal>) {
        let processor = processor();
        let mut row = record(FeedType::SelfExclude, "", None);
        row.amount = days;

        assert!(processor.apply(&row).is_err());
        assert_eq!(processor.balance("alice").unwrap().self_excluded_until, None);
    }

    #[test]
    fn test_missing_amount_is_invalid() {
        let processor = processor();

        let result = processor.apply(&record(FeedType::Lock, "b-1", None));

        assert_eq!(result, Err(WalletError::invalid_request("amount is required")));
    }
}
