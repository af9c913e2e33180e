//! CSV format handling for feed records and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to feed records
//! - Wallet output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{FeedType, LimitPeriod, RequestKind, TransactionRecord, Wallet};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `type, user, tx, amount, payout, won, reference`.
/// Which fields are required depends on the row type.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub user: String,
    #[serde(default)]
    pub tx: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub payout: Option<String>,
    #[serde(default)]
    pub won: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

fn parse_feed_type(tx_type: &str) -> Option<FeedType> {
    let feed_type = match tx_type.to_lowercase().as_str() {
        "deposit" => FeedType::Request(RequestKind::Deposit),
        "withdrawal" | "withdraw" => FeedType::Request(RequestKind::Withdrawal),
        "bet" => FeedType::Request(RequestKind::Bet),
        "win" => FeedType::Request(RequestKind::Win),
        "refund" => FeedType::Request(RequestKind::Refund),
        "bonus" => FeedType::Request(RequestKind::Bonus),
        "lock" => FeedType::Lock,
        "settle" => FeedType::Settle,
        "expire_bonus" => FeedType::ExpireBonus,
        "kyc" => FeedType::Kyc,
        "suspend" => FeedType::Suspend,
        "activate" => FeedType::Activate,
        "daily_limit" => FeedType::DepositLimit(LimitPeriod::Daily),
        "weekly_limit" => FeedType::DepositLimit(LimitPeriod::Weekly),
        "self_exclude" => FeedType::SelfExclude,
        _ => return None,
    };
    Some(feed_type)
}

/// Trimmed, non-empty field value
fn present(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_decimal(field: Option<String>, name: &str, tx: &str) -> Result<Option<Decimal>, String> {
    match present(field) {
        Some(value) => Decimal::from_str(&value)
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}' for tx {}", name, value, tx)),
        None => Ok(None),
    }
}

fn parse_won(field: Option<String>, tx: &str) -> Result<Option<bool>, String> {
    match present(field) {
        Some(value) => match value.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(format!("Invalid won flag '{}' for tx {}", value, tx)),
        },
        None => Ok(None),
    }
}

/// Convert a CsvRecord to a TransactionRecord
///
/// This function:
/// - Parses the row type
/// - Parses amount and payout into Decimals and `won` into a bool
/// - Requires a user on every row
/// - Requires `tx` and `amount` on money rows, `amount` (the tier, limit or
///   day count) on kyc, limit and exclusion rows and `won` on settle rows
///
/// Business validation (positive amounts, balances) is left to the processor.
///
/// # Returns
///
/// Result containing either:
/// - Ok(TransactionRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<TransactionRecord, String> {
    let tx = csv_record.tx.trim().to_string();
    let tx_type = parse_feed_type(csv_record.tx_type.trim()).ok_or_else(|| {
        format!(
            "Invalid transaction type: '{}' for tx {}",
            csv_record.tx_type, tx
        )
    })?;

    let user = csv_record.user.trim().to_string();
    if user.is_empty() {
        return Err(format!("Missing user for tx {}", tx));
    }

    let amount = parse_decimal(csv_record.amount, "amount", &tx)?;
    let payout = parse_decimal(csv_record.payout, "payout", &tx)?;
    let won = parse_won(csv_record.won, &tx)?;
    let reference = present(csv_record.reference);

    match tx_type {
        FeedType::Kyc => {
            if amount.is_none() {
                return Err(format!("kyc row for user {} requires a tier", user));
            }
        }
        FeedType::DepositLimit(_) | FeedType::SelfExclude => {
            if amount.is_none() {
                return Err(format!(
                    "{} row for user {} requires an amount",
                    csv_record.tx_type.trim(),
                    user
                ));
            }
        }
        FeedType::Suspend | FeedType::Activate => {}
        _ => {
            if tx.is_empty() {
                return Err(format!(
                    "{} row for user {} requires a tx id",
                    csv_record.tx_type.trim(),
                    user
                ));
            }
            if amount.is_none() {
                return Err(format!(
                    "{} transaction {} for user {} requires an amount",
                    csv_record.tx_type.trim(),
                    tx,
                    user
                ));
            }
            if tx_type == FeedType::Settle && won.is_none() {
                return Err(format!("settle transaction {} requires a won flag", tx));
            }
        }
    }

    Ok(TransactionRecord {
        tx_type,
        user,
        tx,
        amount,
        payout,
        won,
        reference,
    })
}

/// Write wallet states to CSV format
///
/// Writes wallets with columns:
/// `user, deposit, bonus, winnings, locked, available, status`.
/// Wallets are sorted by user id for deterministic output.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_wallets_csv(wallets: &[Wallet], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "user",
            "deposit",
            "bonus",
            "winnings",
            "locked",
            "available",
            "status",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_wallets: Vec<&Wallet> = wallets.iter().collect();
    sorted_wallets.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    for wallet in sorted_wallets {
        writer
            .write_record(&[
                wallet.user_id.clone(),
                format!("{:.2}", wallet.deposit_balance),
                format!("{:.2}", wallet.bonus_balance),
                format!("{:.2}", wallet.winnings_balance),
                format!("{:.2}", wallet.locked_balance),
                format!("{:.2}", wallet.available()),
                wallet.status.to_string(),
            ])
            .map_err(|e| format!("Failed to write wallet record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
