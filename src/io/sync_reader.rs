//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over feed records from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<TransactionRecord, String>` for each CSV row:
//!
//! ```no_run
//! use wallet_ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("feed.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("Processing: {:?}", record),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants
//! - Line numbers are included in error messages

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::TransactionRecord;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Reads one record at a time, so memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open a CSV feed for streaming iteration
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing optional columns)
    /// - Use an 8KB buffer
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if the file opened successfully
    /// * `Err(String)` if it could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransactionRecord, String>;

    /// Read and convert the next row
    ///
    /// # Returns
    ///
    /// * `Some(Ok(TransactionRecord))` - Successfully parsed record
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line_num += 1;

        Some(match next {
            Ok(csv_record) => {
                convert_csv_record(csv_record).map_err(|e| format!("Line {}: {}", self.line_num, e))
            }
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeedType, RequestKind};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,tx,amount,payout,won,reference\n";

    /// Helper function to create a temporary CSV feed for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(format!("{}{}", HEADER, rows).as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_iterates_valid_deposit() {
        let file = create_temp_csv("deposit,alice,tx-1,100.00,,,\n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.tx_type, FeedType::Request(RequestKind::Deposit));
        assert_eq!(record.user, "alice");
        assert_eq!(record.tx, "tx-1");
        assert_eq!(record.amount, Some(Decimal::new(10000, 2)));
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let file = create_temp_csv(
            "deposit,alice,a-1,100.00,,,\ndeposit,bob,b-1,invalid,,,\ndeposit,carol,c-1,50.00,,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
        let error = records[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3"), "{}", error); // header is line 1
        assert!(error.contains("Invalid amount"));
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let file = create_temp_csv("  deposit  ,  alice  ,  tx-1  ,  100.0  ,,,\n");

        let records: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "alice");
        assert_eq!(records[0].amount, Some(Decimal::new(1000, 1)));
    }

    #[test]
    fn test_sync_reader_continues_after_error() {
        let file = create_temp_csv(
            "deposit,alice,a-1,100.00,,,\ntransfer,bob,b-1,50.00,,,\nlock,alice,a-2,30.00,,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
        assert_eq!(records[2].as_ref().unwrap().tx_type, FeedType::Lock);
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        let file = create_temp_csv("");

        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
