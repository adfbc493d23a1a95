//! CSV Dataset Ingestion
//!
//! Rows are deserialized by header name, so column order does not matter and
//! columns outside the transaction schema are ignored.

use crate::error::TrainingError;
use csv::{Reader, StringRecord};
use feature_engine::{LabeledTransaction, TransactionRecord};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One CSV row of the transaction datasets
#[derive(Debug, Clone, Deserialize)]
struct DatasetRow {
    amt: f64,
    lat: f64,
    long: f64,
    city_pop: i64,
    merch_lat: f64,
    merch_long: f64,
    merchant: String,
    category: String,
    gender: String,
    job: String,
    is_fraud: u8,
}

impl From<DatasetRow> for LabeledTransaction {
    fn from(row: DatasetRow) -> Self {
        LabeledTransaction {
            record: TransactionRecord {
                amount: row.amt,
                lat: row.lat,
                long: row.long,
                city_pop: row.city_pop,
                merch_lat: row.merch_lat,
                merch_long: row.merch_long,
                merchant: row.merchant,
                category: row.category,
                gender: row.gender,
                job: row.job,
            },
            is_fraud: row.is_fraud,
        }
    }
}

/// Streams a CSV file in fixed-size chunks of labeled transactions
pub struct ChunkedReader {
    path: PathBuf,
    reader: Reader<File>,
    headers: StringRecord,
    record: StringRecord,
    chunk_size: usize,
    rows_read: usize,
    done: bool,
}

impl ChunkedReader {
    /// Open `path` and read its header row
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, TrainingError> {
        let csv_err = |source| TrainingError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = Reader::from_path(path).map_err(csv_err)?;
        let headers = reader.headers().map_err(csv_err)?.clone();
        debug!("Opened {} with {} columns", path.display(), headers.len());

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            record: StringRecord::new(),
            chunk_size: chunk_size.max(1),
            rows_read: 0,
            done: false,
        })
    }

    /// Rows returned so far
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Next chunk of at most `chunk_size` rows, `None` at end of file
    pub fn next_chunk(&mut self) -> Result<Option<Vec<LabeledTransaction>>, TrainingError> {
        if self.done {
            return Ok(None);
        }

        let mut chunk = Vec::with_capacity(self.chunk_size.min(4096));
        while chunk.len() < self.chunk_size {
            let more = self
                .reader
                .read_record(&mut self.record)
                .map_err(|source| self.error(source))?;
            if !more {
                self.done = true;
                break;
            }
            let row: DatasetRow = self
                .record
                .deserialize(Some(&self.headers))
                .map_err(|source| self.error(source))?;
            chunk.push(row.into());
        }

        self.rows_read += chunk.len();
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    fn error(&self, source: csv::Error) -> TrainingError {
        TrainingError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl Iterator for ChunkedReader {
    type Item = Result<Vec<LabeledTransaction>, TrainingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

/// Read a whole CSV file in one pass
pub fn read_all(path: &Path) -> Result<Vec<LabeledTransaction>, TrainingError> {
    let mut reader = ChunkedReader::open(path, usize::MAX)?;
    Ok(reader.next_chunk()?.unwrap_or_default())
}
