//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input extension does not belong to any known category.
    #[error("Unsupported input format: {extension}")]
    UnsupportedInput { extension: String },

    /// Requested output format is not supported by the resolved converter.
    #[error("{converter} converter does not support output format: {format}")]
    UnsupportedOutput { converter: String, format: String },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// External tool binary not found or not executable.
    #[error("External tool not available: {tool}")]
    ToolNotFound { tool: PathBuf },

    /// External tool exited with a failure status.
    #[error("{tool} failed: {reason}")]
    ToolFailed {
        tool: String,
        reason: String,
        stderr: Option<String>,
    },

    /// External tool exceeded its time budget.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Raster decode/encode error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip container error.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// PDF read/write error.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// XML parsing error inside a document container.
    #[error("XML error: {0}")]
    Xml(String),

    /// Malformed content that could not be interpreted.
    #[error("Failed to parse input: {reason}")]
    Parse { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Creates a new tool failure error with optional stderr output.
    pub fn tool_failed(
        tool: impl Into<String>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Creates a new PDF error.
    pub fn pdf(reason: impl std::fmt::Display) -> Self {
        Self::Pdf(reason.to_string())
    }

    /// Creates a new XML error.
    pub fn xml(reason: impl std::fmt::Display) -> Self {
        Self::Xml(reason.to_string())
    }
}
