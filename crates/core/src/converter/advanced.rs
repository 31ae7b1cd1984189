//! Advanced document converter (EPUB, ODT, RTF).

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::error::ConvertError;
use super::text;
use super::traits::Converter;
use super::types::ConversionRequest;

/// Supported advanced document input extensions.
pub const ADVANCED_INPUT_EXTENSIONS: &[&str] = &["epub", "odt", "rtf"];

/// Fixed output allow-list for the advanced document category.
pub const ADVANCED_OUTPUT_FORMATS: &[&str] = &["pdf", "docx", "txt", "epub", "odt", "rtf"];

/// Local element names that end a paragraph in XHTML/ODF content.
const PARAGRAPH_LOCALS: &[&[u8]] = &[
    b"p", b"h", b"h1", b"h2", b"h3", b"h4", b"h5", b"h6", b"li", b"title",
];

/// Converter for e-book and rich-text documents.
///
/// Like the standard document converter, content flows through a
/// plain-text intermediate; formatting beyond paragraph breaks is not
/// preserved. RTF parsing is best-effort control-word stripping.
#[derive(Debug, Default)]
pub struct AdvancedDocumentConverter;

impl AdvancedDocumentConverter {
    pub fn new() -> Self {
        Self
    }

    fn extract_text(path: &Path, extension: &str) -> Result<String, ConvertError> {
        match extension {
            "epub" => extract_epub_text(path),
            "odt" => extract_odt_text(path),
            "rtf" => Ok(strip_rtf(&text::read_txt(path)?)),
            other => Err(ConvertError::UnsupportedInput {
                extension: other.to_string(),
            }),
        }
    }
}

/// Extract text from an EPUB container, reading content documents in
/// archive order.
fn extract_epub_text(path: &Path) -> Result<String, ConvertError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut content_names: Vec<String> = (0..archive.len())
        .filter_map(|i| archive.by_index(i).ok().map(|e| e.name().to_string()))
        .filter(|name| {
            name.ends_with(".xhtml") || name.ends_with(".html") || name.ends_with(".htm")
        })
        .collect();
    content_names.sort();

    let mut out = String::new();
    for name in content_names {
        let mut entry = archive.by_name(&name)?;
        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        out.push_str(&text::xml_text_content(&xml, PARAGRAPH_LOCALS)?);
    }
    Ok(out)
}

/// Extract text from an ODT container's content.xml.
fn extract_odt_text(path: &Path) -> Result<String, ConvertError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name("content.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    text::xml_text_content(&xml, PARAGRAPH_LOCALS)
}

static RTF_DESTINATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\\*[^{}]*\}").unwrap());
static RTF_META_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\\(fonttbl|colortbl|stylesheet|info)([^{}]|\{[^{}]*\})*\}").unwrap()
});
static RTF_UNICODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\u(-?\d+)\??").unwrap());
static RTF_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\'[0-9a-fA-F]{2}").unwrap());
static RTF_CONTROL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]{1,32}(-?\d{1,10})? ?").unwrap());
static RTF_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([\\{}])").unwrap());

/// Strip RTF control words, keeping paragraph breaks. Best-effort.
pub(crate) fn strip_rtf(content: &str) -> String {
    let content = RTF_DESTINATION.replace_all(content, "");
    let content = RTF_META_GROUP.replace_all(&content, "");
    let content = content.replace("\\pard", "").replace("\\par", "\n");
    let content = RTF_UNICODE.replace_all(&content, |caps: &regex_lite::Captures| {
        caps[1]
            .parse::<i32>()
            .ok()
            .and_then(|code| u32::try_from(if code < 0 { code + 65536 } else { code }).ok())
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let content = RTF_HEX.replace_all(&content, " ");
    let content = RTF_CONTROL.replace_all(&content, "");
    // Escaped braces survive the global brace removal through sentinels.
    let content = RTF_ESCAPE.replace_all(&content, |caps: &regex_lite::Captures| {
        match &caps[1] {
            "\\" => "\u{1}",
            "{" => "\u{2}",
            _ => "\u{3}",
        }
        .to_string()
    });
    content
        .replace(['{', '}'], "")
        .replace('\u{1}', "\\")
        .replace('\u{2}', "{")
        .replace('\u{3}', "}")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const EPUB_CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
<rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

/// Write text as a minimal single-chapter EPUB.
fn write_epub(content: &str, title: &str, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let stored = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    let deflated = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    // The mimetype entry must come first and stay uncompressed.
    writer.start_file("mimetype", stored)?;
    writer.write_all(b"application/epub+zip")?;

    writer.start_file("META-INF/container.xml", deflated)?;
    writer.write_all(EPUB_CONTAINER.as_bytes())?;

    let escaped_title = text::escape_xml(title);
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:title>{escaped_title}</dc:title>
<dc:language>en</dc:language>
<dc:identifier id="id">recast-{escaped_title}</dc:identifier>
</metadata>
<manifest><item id="chapter" href="chapter.xhtml" media-type="application/xhtml+xml"/></manifest>
<spine><itemref idref="chapter"/></spine>
</package>"#
    );
    writer.start_file("OEBPS/content.opf", deflated)?;
    writer.write_all(opf.as_bytes())?;

    let mut chapter = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>{escaped_title}</title></head><body>"#
    );
    for line in content.lines() {
        chapter.push_str("<p>");
        chapter.push_str(&text::escape_xml(line));
        chapter.push_str("</p>");
    }
    chapter.push_str("</body></html>");
    writer.start_file("OEBPS/chapter.xhtml", deflated)?;
    writer.write_all(chapter.as_bytes())?;
    writer.finish()?;
    Ok(())
}

const ODT_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

/// Write text as a minimal ODT package.
fn write_odt(content: &str, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let stored = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    let deflated = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("mimetype", stored)?;
    writer.write_all(b"application/vnd.oasis.opendocument.text")?;

    writer.start_file("META-INF/manifest.xml", deflated)?;
    writer.write_all(ODT_MANIFEST.as_bytes())?;

    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2">
<office:body><office:text>"#,
    );
    for line in content.lines() {
        body.push_str("<text:p>");
        body.push_str(&text::escape_xml(line));
        body.push_str("</text:p>");
    }
    body.push_str("</office:text></office:body></office:document-content>");
    writer.start_file("content.xml", deflated)?;
    writer.write_all(body.as_bytes())?;
    writer.finish()?;
    Ok(())
}

#[async_trait]
impl Converter for AdvancedDocumentConverter {
    fn name(&self) -> &str {
        "advanced-document"
    }

    fn output_formats(&self) -> &[&str] {
        ADVANCED_OUTPUT_FORMATS
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request.input_extension().unwrap_or_default();
        if !ADVANCED_INPUT_EXTENSIONS.contains(&extension.as_str()) {
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
            "rtf" => text::write_rtf(&content, &output_path)?,
            "epub" => write_epub(&content, &request.input_stem(), &output_path)?,
            "odt" => write_odt(&content, &output_path)?,
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
            "advanced document converted"
        );
        Ok(output_path)
    }
}
