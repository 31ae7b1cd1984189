//! Trait definition for format converters.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::ConvertError;
use super::types::ConversionRequest;

/// A capability that re-encodes a source file into a target format.
///
/// One implementation exists per category (images, documents, advanced
/// documents, spreadsheets, archives, media). The registry checks
/// `supports_output` before dispatching; the `convert` call itself
/// remains the authority on success or failure.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Output formats this converter can produce, lowercase.
    ///
    /// This list is advisory: it reflects what the converter was built
    /// to do, adjusted for external tool availability where relevant.
    fn output_formats(&self) -> &[&str];

    /// Whether the given output format can be produced.
    fn supports_output(&self, format: &str) -> bool {
        let format = format.trim_start_matches('.').to_ascii_lowercase();
        self.output_formats().contains(&format.as_str())
    }

    /// Converts the input file, returning the path of the produced file.
    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError>;
}
