//! Asynchronous CSV reader with stream interface
//!
//! Provides a streaming interface over feed records from a CSV file.
//! Supports batch reading for efficient async processing.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - tokio for async runtime and concurrency primitives
//! - Batch reading for efficient processing
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransactionRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::TransactionRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader for feed records
///
/// Malformed rows are logged and skipped; they never end a batch early.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    ///
    /// The CSV reader trims whitespace from all fields and accepts rows with
    /// trailing optional columns omitted.
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read up to `batch_size` valid records
    ///
    /// # Returns
    ///
    /// A batch of records. An empty batch means the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransactionRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => {
                    self.line_num += 1;
                    match convert_csv_record(csv_record) {
                        Ok(transaction_record) => batch.push(transaction_record),
                        Err(e) => warn!(line = self.line_num, error = %e, "skipping malformed record"),
                    }
                }
                Some(Err(e)) => {
                    self.line_num += 1;
                    warn!(line = self.line_num, error = %e, "CSV parse error");
                }
                None => break,
            }
        }

        batch
    }
}
