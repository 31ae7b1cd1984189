//! Persistent conversion history: an append-only fact log plus derived
//! per-day aggregates.

mod export;
mod sqlite;
mod store;
mod types;

pub use export::{export_csv, export_json, export_to_path, ExportFormat};
pub use sqlite::SqliteHistoryStore;
pub use store::{HistoryError, HistoryStore};
pub use types::{ConversionRecord, DailyStat, FormatCount, HistoryStats, NewConversionRecord};
