//! Core history data types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::converter::Quality;

/// One durable fact describing a single file's conversion attempt.
///
/// Records are immutable once written; the store only ever appends,
/// apart from explicit purges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Creation instant, stamped by the store at write time.
    pub timestamp: DateTime<Utc>,
    /// Source path as supplied by the caller (not validated).
    pub input_file: String,
    /// Lowercase source format tag, no leading dot.
    pub input_format: String,
    /// Output path as supplied or derived by the caller.
    pub output_file: String,
    /// Lowercase target format tag, no leading dot.
    pub output_format: String,
    /// Input size in bytes at attempt time (0 if unavailable).
    pub file_size: u64,
    /// Elapsed seconds (0 if unmeasured by the caller).
    pub conversion_time: f64,
    /// Outcome.
    pub success: bool,
    /// Free text, present only for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Quality preset used.
    #[serde(default)]
    pub quality: Quality,
}

/// A record as submitted by a caller; the store stamps the timestamp.
#[derive(Debug, Clone)]
pub struct NewConversionRecord {
    pub input_file: String,
    pub input_format: String,
    pub output_file: String,
    pub output_format: String,
    pub file_size: u64,
    pub conversion_time: f64,
    pub success: bool,
    pub error_message: Option<String>,
    pub quality: Quality,
}

impl NewConversionRecord {
    pub(crate) fn into_record(self, timestamp: DateTime<Utc>) -> ConversionRecord {
        ConversionRecord {
            timestamp,
            input_file: self.input_file,
            input_format: self.input_format,
            output_file: self.output_file,
            output_format: self.output_format,
            file_size: self.file_size,
            conversion_time: self.conversion_time,
            success: self.success,
            error_message: self.error_message,
            quality: self.quality,
        }
    }
}

/// Per-calendar-day aggregate derived from conversion records.
///
/// Invariant: `total == successful + failed`, maintained transactionally
/// alongside each record insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_size_processed: u64,
}

/// Count of conversions per output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatCount {
    pub format: String,
    pub count: u64,
}

/// Aggregate statistics over a trailing window of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_conversions: u64,
    pub successful_conversions: u64,
    pub failed_conversions: u64,
    pub total_size_processed: u64,
    pub average_conversion_time: f64,
    pub by_format: Vec<FormatCount>,
    pub daily: Vec<DailyStat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serialization_skips_absent_error() {
        let record = ConversionRecord {
            timestamp: Utc::now(),
            input_file: "/in/a.png".to_string(),
            input_format: "png".to_string(),
            output_file: "/out/a.jpg".to_string(),
            output_format: "jpg".to_string(),
            file_size: 1234,
            conversion_time: 0.5,
            success: true,
            error_message: None,
            quality: Quality::Medium,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("error_message"));
        assert!(json.contains("\"quality\":\"medium\""));

        let parsed: ConversionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_into_record_preserves_fields() {
        let now = Utc::now();
        let record = NewConversionRecord {
            input_file: "/in/a.txt".to_string(),
            input_format: "txt".to_string(),
            output_file: "/out/a.pdf".to_string(),
            output_format: "pdf".to_string(),
            file_size: 9,
            conversion_time: 1.5,
            success: false,
            error_message: Some("boom".to_string()),
            quality: Quality::High,
        }
        .into_record(now);

        assert_eq!(record.timestamp, now);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
        assert_eq!(record.quality, Quality::High);
    }
}
