//! Extension-to-converter dispatch.

use std::path::Path;
use std::sync::Arc;

use crate::config::ConverterConfig;

use super::advanced::AdvancedDocumentConverter;
use super::archive::ArchiveConverter;
use super::document::DocumentConverter;
use super::error::ConvertError;
use super::image::ImageConverter;
use super::media::MediaConverter;
use super::spreadsheet::SpreadsheetConverter;
use super::traits::Converter;
use super::types::extension_of;

/// File category, determined solely by input extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Image,
    Document,
    AdvancedDocument,
    Spreadsheet,
    Archive,
    Media,
}

impl Category {
    /// Resolve a category from an extension (leading dot tolerated,
    /// case-insensitive). Returns `None` for unknown extensions.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tiff" | "webp" => Some(Self::Image),
            "pdf" | "docx" | "txt" => Some(Self::Document),
            "epub" | "odt" | "rtf" => Some(Self::AdvancedDocument),
            "xlsx" | "csv" | "ods" => Some(Self::Spreadsheet),
            "zip" | "tar" | "rar" | "7z" => Some(Self::Archive),
            "mp3" | "wav" | "flac" | "mp4" | "avi" => Some(Self::Media),
            _ => None,
        }
    }

    /// Category name for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::AdvancedDocument => "advanced_document",
            Self::Spreadsheet => "spreadsheet",
            Self::Archive => "archive",
            Self::Media => "media",
        }
    }
}

/// Fixed, advisory output allow-list for an input extension.
///
/// Uppercase tags, matching what clients display in pickers. The list is
/// independent of converter/tool availability; the conversion call is
/// the authority on whether a given target actually works.
pub fn output_formats_for_extension(extension: &str) -> &'static [&'static str] {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tiff" | "webp" => {
            &["PNG", "JPG", "JPEG", "BMP", "GIF", "TIFF", "PDF"]
        }
        "pdf" | "docx" | "txt" => &["PDF", "DOCX", "TXT"],
        "epub" | "odt" | "rtf" => &["PDF", "DOCX", "TXT", "EPUB", "ODT", "RTF"],
        "xlsx" | "csv" | "ods" => &["XLSX", "CSV", "ODS", "PDF"],
        "zip" | "tar" | "rar" | "7z" => &["ZIP", "TAR", "7Z"],
        "mp3" | "wav" | "flac" => &["MP3", "WAV", "FLAC", "OGG"],
        "mp4" | "avi" => &["MP4", "AVI", "MKV", "MOV"],
        _ => &[],
    }
}

/// Maps a file extension to exactly one converter capability.
///
/// All six converters are injected explicitly; tests swap in mocks.
pub struct ConverterRegistry {
    image: Arc<dyn Converter>,
    document: Arc<dyn Converter>,
    advanced_document: Arc<dyn Converter>,
    spreadsheet: Arc<dyn Converter>,
    archive: Arc<dyn Converter>,
    media: Arc<dyn Converter>,
}

impl ConverterRegistry {
    /// Create a registry from explicit converter instances.
    pub fn new(
        image: Arc<dyn Converter>,
        document: Arc<dyn Converter>,
        advanced_document: Arc<dyn Converter>,
        spreadsheet: Arc<dyn Converter>,
        archive: Arc<dyn Converter>,
        media: Arc<dyn Converter>,
    ) -> Self {
        Self {
            image,
            document,
            advanced_document,
            spreadsheet,
            archive,
            media,
        }
    }

    /// Wire up the real converters, probing external tools once.
    pub async fn with_defaults(config: &ConverterConfig) -> Self {
        Self::new(
            Arc::new(ImageConverter::new()),
            Arc::new(DocumentConverter::new()),
            Arc::new(AdvancedDocumentConverter::new()),
            Arc::new(SpreadsheetConverter::new()),
            Arc::new(ArchiveConverter::detect(config.clone()).await),
            Arc::new(MediaConverter::new(config.clone())),
        )
    }

    /// Converter for a category.
    pub fn converter_for(&self, category: Category) -> &Arc<dyn Converter> {
        match category {
            Category::Image => &self.image,
            Category::Document => &self.document,
            Category::AdvancedDocument => &self.advanced_document,
            Category::Spreadsheet => &self.spreadsheet,
            Category::Archive => &self.archive,
            Category::Media => &self.media,
        }
    }

    /// Resolve the converter for a path by extension.
    pub fn resolve(&self, path: &Path) -> Result<&Arc<dyn Converter>, ConvertError> {
        let extension = extension_of(path).unwrap_or_default();
        let category =
            Category::from_extension(&extension).ok_or(ConvertError::UnsupportedInput {
                extension: extension.clone(),
            })?;
        Ok(self.converter_for(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_extension() {
        assert_eq!(Category::from_extension("png"), Some(Category::Image));
        assert_eq!(Category::from_extension(".PDF"), Some(Category::Document));
        assert_eq!(
            Category::from_extension("epub"),
            Some(Category::AdvancedDocument)
        );
        assert_eq!(Category::from_extension("ods"), Some(Category::Spreadsheet));
        assert_eq!(Category::from_extension("7z"), Some(Category::Archive));
        assert_eq!(Category::from_extension("flac"), Some(Category::Media));
        assert_eq!(Category::from_extension("xyz"), None);
        assert_eq!(Category::from_extension(""), None);
    }

    #[test]
    fn test_categories_are_mutually_exclusive() {
        // Every known extension resolves to exactly one category.
        let all = [
            "png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp", "pdf", "docx", "txt", "epub",
            "odt", "rtf", "xlsx", "csv", "ods", "zip", "tar", "rar", "7z", "mp3", "wav", "flac",
            "mp4", "avi",
        ];
        for ext in all {
            assert!(Category::from_extension(ext).is_some(), "missing: {}", ext);
        }
    }

    #[test]
    fn test_output_formats_for_image() {
        assert_eq!(
            output_formats_for_extension(".jpg"),
            &["PNG", "JPG", "JPEG", "BMP", "GIF", "TIFF", "PDF"]
        );
    }

    #[test]
    fn test_output_formats_audio_video_split() {
        assert_eq!(
            output_formats_for_extension("mp3"),
            &["MP3", "WAV", "FLAC", "OGG"]
        );
        assert_eq!(
            output_formats_for_extension("mp4"),
            &["MP4", "AVI", "MKV", "MOV"]
        );
    }

    #[test]
    fn test_output_formats_unknown_is_empty() {
        assert!(output_formats_for_extension("xyz").is_empty());
    }
}
