use thiserror::Error;

use super::types::{ConversionRecord, HistoryStats, NewConversionRecord};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for the persistent conversion history.
///
/// Implementations must serialize concurrent writers themselves; each
/// `record` call is a short all-or-nothing transaction covering both
/// the fact row and the daily aggregate.
pub trait HistoryStore: Send + Sync {
    /// Durably append a record, stamping its timestamp at write time.
    /// The daily aggregate for the record's calendar date is updated in
    /// the same transaction.
    fn record(&self, record: NewConversionRecord) -> Result<ConversionRecord, HistoryError>;

    /// Most-recent-first records, bounded to `limit` entries. The store
    /// does not clamp `limit`; caller-facing boundaries do.
    fn recent(&self, limit: u32) -> Result<Vec<ConversionRecord>, HistoryError>;

    /// Substring search over input/output paths and formats,
    /// most-recent-first. Matching is case-insensitive for ASCII
    /// (SQLite `LIKE` semantics).
    fn search(&self, query: &str, limit: u32) -> Result<Vec<ConversionRecord>, HistoryError>;

    /// Aggregate statistics over the trailing `days` window.
    fn stats(&self, days: u32) -> Result<HistoryStats, HistoryError>;

    /// Delete all records (`None`) or records older than the cutoff,
    /// pruning stale daily aggregates alongside. Returns the number of
    /// deleted records.
    fn purge(&self, older_than_days: Option<u32>) -> Result<usize, HistoryError>;
}
