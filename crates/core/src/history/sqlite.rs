//! SQLite-backed history store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::converter::Quality;

use super::store::{HistoryError, HistoryStore};
use super::types::{
    ConversionRecord, DailyStat, FormatCount, HistoryStats, NewConversionRecord,
};

/// SQLite-backed history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Create a new store, creating the database file (and its parent
    /// directory) and tables if needed.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversion_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                input_file TEXT NOT NULL,
                input_format TEXT NOT NULL,
                output_file TEXT NOT NULL,
                output_format TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                conversion_time REAL NOT NULL DEFAULT 0,
                success INTEGER NOT NULL,
                error_message TEXT,
                quality TEXT NOT NULL DEFAULT 'medium'
            );

            CREATE INDEX IF NOT EXISTS idx_history_timestamp ON conversion_history(timestamp);

            CREATE TABLE IF NOT EXISTS conversion_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL UNIQUE,
                total_conversions INTEGER NOT NULL DEFAULT 0,
                successful_conversions INTEGER NOT NULL DEFAULT 0,
                failed_conversions INTEGER NOT NULL DEFAULT 0,
                total_size_processed INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ConversionRecord> {
        let timestamp_str: String = row.get(0)?;
        let quality_str: String = row.get(9)?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ConversionRecord {
            timestamp,
            input_file: row.get(1)?,
            input_format: row.get(2)?,
            output_file: row.get(3)?,
            output_format: row.get(4)?,
            file_size: row.get::<_, i64>(5)?.max(0) as u64,
            conversion_time: row.get(6)?,
            success: row.get(7)?,
            error_message: row.get(8)?,
            quality: quality_str.parse().unwrap_or(Quality::Medium),
        })
    }

    fn query_records(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ConversionRecord>, HistoryError> {
        let sql = format!(
            "SELECT timestamp, input_file, input_format, output_file, output_format, \
             file_size, conversion_time, success, error_message, quality \
             FROM conversion_history {} ORDER BY timestamp DESC, id DESC LIMIT ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params, Self::row_to_record)
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| HistoryError::Database(e.to_string()))?);
        }
        Ok(records)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn record(&self, record: NewConversionRecord) -> Result<ConversionRecord, HistoryError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let now = Utc::now();
        let record = record.into_record(now);

        tx.execute(
            "INSERT INTO conversion_history \
             (timestamp, input_file, input_format, output_file, output_format, \
              file_size, conversion_time, success, error_message, quality) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.input_file,
                record.input_format,
                record.output_file,
                record.output_format,
                record.file_size as i64,
                record.conversion_time,
                record.success,
                record.error_message,
                record.quality.as_str(),
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        let (successful, failed) = if record.success { (1, 0) } else { (0, 1) };
        tx.execute(
            "INSERT INTO conversion_stats \
             (date, total_conversions, successful_conversions, failed_conversions, total_size_processed) \
             VALUES (?, 1, ?, ?, ?) \
             ON CONFLICT(date) DO UPDATE SET \
               total_conversions = total_conversions + 1, \
               successful_conversions = successful_conversions + excluded.successful_conversions, \
               failed_conversions = failed_conversions + excluded.failed_conversions, \
               total_size_processed = total_size_processed + excluded.total_size_processed",
            params![
                record.timestamp.date_naive().to_string(),
                successful,
                failed,
                record.file_size as i64,
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(record)
    }

    fn recent(&self, limit: u32) -> Result<Vec<ConversionRecord>, HistoryError> {
        let conn = self.conn.lock().unwrap();
        Self::query_records(&conn, "", &[&limit])
    }

    fn search(&self, query: &str, limit: u32) -> Result<Vec<ConversionRecord>, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query);
        Self::query_records(
            &conn,
            "WHERE input_file LIKE ?1 OR output_file LIKE ?1 \
             OR input_format LIKE ?1 OR output_format LIKE ?1",
            &[&pattern, &limit],
        )
    }

    fn stats(&self, days: u32) -> Result<HistoryStats, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let cutoff = Utc::now() - Duration::days(days as i64);
        let cutoff_str = cutoff.to_rfc3339();

        let (total, successful, failed, total_size, avg_time) = conn
            .query_row(
                "SELECT COUNT(*), \
                   COALESCE(SUM(CASE WHEN success = 1 THEN 1 ELSE 0 END), 0), \
                   COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END), 0), \
                   COALESCE(SUM(file_size), 0), \
                   COALESCE(AVG(conversion_time), 0.0) \
                 FROM conversion_history WHERE timestamp >= ?",
                params![cutoff_str],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, f64>(4)?,
                    ))
                },
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT output_format, COUNT(*) AS count FROM conversion_history \
                 WHERE timestamp >= ? GROUP BY output_format ORDER BY count DESC",
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let format_rows = stmt
            .query_map(params![cutoff_str], |row| {
                Ok(FormatCount {
                    format: row.get(0)?,
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let mut by_format = Vec::new();
        for row in format_rows {
            by_format.push(row.map_err(|e| HistoryError::Database(e.to_string()))?);
        }

        let cutoff_date = cutoff.date_naive().to_string();
        let mut stmt = conn
            .prepare(
                "SELECT date, total_conversions, successful_conversions, failed_conversions, \
                 total_size_processed FROM conversion_stats WHERE date >= ? ORDER BY date DESC",
            )
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let daily_rows = stmt
            .query_map(params![cutoff_date], |row| {
                let date_str: String = row.get(0)?;
                Ok(DailyStat {
                    date: date_str.parse().unwrap_or(NaiveDate::MIN),
                    total: row.get::<_, i64>(1)?.max(0) as u64,
                    successful: row.get::<_, i64>(2)?.max(0) as u64,
                    failed: row.get::<_, i64>(3)?.max(0) as u64,
                    total_size_processed: row.get::<_, i64>(4)?.max(0) as u64,
                })
            })
            .map_err(|e| HistoryError::Database(e.to_string()))?;
        let mut daily = Vec::new();
        for row in daily_rows {
            daily.push(row.map_err(|e| HistoryError::Database(e.to_string()))?);
        }

        Ok(HistoryStats {
            total_conversions: total.max(0) as u64,
            successful_conversions: successful.max(0) as u64,
            failed_conversions: failed.max(0) as u64,
            total_size_processed: total_size.max(0) as u64,
            average_conversion_time: avg_time,
            by_format,
            daily,
        })
    }

    fn purge(&self, older_than_days: Option<u32>) -> Result<usize, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let deleted = match older_than_days {
            None => {
                let deleted = conn
                    .execute("DELETE FROM conversion_history", [])
                    .map_err(|e| HistoryError::Database(e.to_string()))?;
                conn.execute("DELETE FROM conversion_stats", [])
                    .map_err(|e| HistoryError::Database(e.to_string()))?;
                deleted
            }
            Some(days) => {
                let cutoff = Utc::now() - Duration::days(days as i64);
                let deleted = conn
                    .execute(
                        "DELETE FROM conversion_history WHERE timestamp < ?",
                        params![cutoff.to_rfc3339()],
                    )
                    .map_err(|e| HistoryError::Database(e.to_string()))?;
                conn.execute(
                    "DELETE FROM conversion_stats WHERE date < ?",
                    params![cutoff.date_naive().to_string()],
                )
                .map_err(|e| HistoryError::Database(e.to_string()))?;
                deleted
            }
        };

        Ok(deleted)
    }
}
