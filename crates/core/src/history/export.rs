//! History export serializers.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::store::HistoryError;
use super::types::ConversionRecord;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Serialize records to JSON. Field-exact: parsing the output yields
/// the same records.
pub fn export_json(records: &[ConversionRecord]) -> Result<String, HistoryError> {
    serde_json::to_string_pretty(records).map_err(|e| HistoryError::Serialization(e.to_string()))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Serialize records to CSV with a header row.
pub fn export_csv(records: &[ConversionRecord]) -> String {
    let mut out = String::from(
        "timestamp,input_file,input_format,output_file,output_format,\
         file_size,conversion_time,success,error_message,quality\n",
    );
    for record in records {
        let fields = [
            record.timestamp.to_rfc3339(),
            record.input_file.clone(),
            record.input_format.clone(),
            record.output_file.clone(),
            record.output_format.clone(),
            record.file_size.to_string(),
            record.conversion_time.to_string(),
            record.success.to_string(),
            record.error_message.clone().unwrap_or_default(),
            record.quality.as_str().to_string(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Write records to a file in the given format, returning the number of
/// exported records.
pub fn export_to_path(
    records: &[ConversionRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<usize, HistoryError> {
    let serialized = match format {
        ExportFormat::Json => export_json(records)?,
        ExportFormat::Csv => export_csv(records),
    };
    let mut file = fs::File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(records.len())
}
