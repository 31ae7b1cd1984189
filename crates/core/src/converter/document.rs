//! Standard document converter (PDF, DOCX, TXT).

use async_trait::async_trait;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::error::ConvertError;
use super::text;
use super::traits::Converter;
use super::types::ConversionRequest;

/// Supported document input extensions.
pub const DOCUMENT_INPUT_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

/// Fixed output allow-list for the document category.
pub const DOCUMENT_OUTPUT_FORMATS: &[&str] = &["pdf", "docx", "txt"];

/// Converter for standard documents.
///
/// Conversions run through a plain-text intermediate: the input is
/// reduced to text, then re-emitted in the target format. Layout is not
/// preserved.
#[derive(Debug, Default)]
pub struct DocumentConverter;

impl DocumentConverter {
    pub fn new() -> Self {
        Self
    }

    fn extract_text(path: &Path, extension: &str) -> Result<String, ConvertError> {
        match extension {
            "pdf" => text::extract_pdf_text(path),
            "docx" => extract_docx_text(path),
            "txt" => text::read_txt(path),
            other => Err(ConvertError::UnsupportedInput {
                extension: other.to_string(),
            }),
        }
    }
}

/// Extract paragraph text from a DOCX package.
pub(crate) fn extract_docx_text(path: &Path) -> Result<String, ConvertError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    text::xml_text_content(&xml, &[b"p"])
}

#[async_trait]
impl Converter for DocumentConverter {
    fn name(&self) -> &str {
        "document"
    }

    fn output_formats(&self) -> &[&str] {
        DOCUMENT_OUTPUT_FORMATS
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request.input_extension().unwrap_or_default();
        if !DOCUMENT_INPUT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ConvertError::UnsupportedInput { extension });
        }
        if !self.supports_output(&request.output_format) {
            return Err(ConvertError::UnsupportedOutput {
                converter: self.name().to_string(),
                format: request.output_format.clone(),
            });
        }
        if !request.input_path.exists() {
            return Err(ConvertError::InputNotFound {
                path: request.input_path.clone(),
            });
        }

        let content = Self::extract_text(&request.input_path, &extension)?;
        let output_path = request.default_output_path();

        match request.output_format.as_str() {
            "txt" => text::write_txt(&content, &output_path)?,
            "pdf" => text::write_text_pdf(&content, &output_path)?,
            "docx" => text::write_docx(&content, &output_path)?,
            other => {
                return Err(ConvertError::UnsupportedOutput {
                    converter: self.name().to_string(),
                    format: other.to_string(),
                })
            }
        }

        tracing::debug!(
            input = %request.input_path.display(),
            output = %output_path.display(),
            "document converted"
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Quality;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_txt_to_docx_and_back() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("note.txt");
        fs::write(&input, "first paragraph\nsecond paragraph").unwrap();

        let converter = DocumentConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "docx", Quality::Medium);
        let docx = converter.convert(&request).await.unwrap();
        assert!(docx.exists());

        let request = ConversionRequest::new(&docx, dir.path(), "txt", Quality::Medium);
        let txt = converter.convert(&request).await.unwrap();
        let round_tripped = fs::read_to_string(&txt).unwrap();
        assert!(round_tripped.contains("first paragraph"));
        assert!(round_tripped.contains("second paragraph"));
    }

    #[tokio::test]
    async fn test_txt_to_pdf() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("note.txt");
        fs::write(&input, "pdf body text").unwrap();

        let converter = DocumentConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "pdf", Quality::Medium);
        let output = converter.convert(&request).await.unwrap();

        let doc = lopdf::Document::load(&output).unwrap();
        assert!(!doc.get_pages().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_input_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("slides.pptx");
        fs::write(&input, "not really").unwrap();

        let converter = DocumentConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "txt", Quality::Medium);
        let result = converter.convert(&request).await;
        assert!(matches!(result, Err(ConvertError::UnsupportedInput { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_output_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("note.txt");
        fs::write(&input, "text").unwrap();

        let converter = DocumentConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "epub", Quality::Medium);
        let result = converter.convert(&request).await;
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedOutput { .. })
        ));
    }
}
