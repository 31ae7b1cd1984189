//! Shared plain-text extraction and generation helpers.
//!
//! The document and advanced-document converters all funnel through a
//! plain-text intermediate representation: extract text from the input
//! container, then write it back out in the requested format.

use std::fs;
use std::io::Write;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::ConvertError;

/// Read a plain text file, tolerating invalid UTF-8.
pub(crate) fn read_txt(path: &Path) -> Result<String, ConvertError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract all text from a PDF document.
pub(crate) fn extract_pdf_text(path: &Path) -> Result<String, ConvertError> {
    let doc = Document::load(path).map_err(ConvertError::pdf)?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).map_err(ConvertError::pdf)
}

/// Extract paragraph text from an XML fragment.
///
/// Collects character data and inserts a newline whenever an element
/// whose local name appears in `paragraph_locals` closes. Works for
/// WordprocessingML (`w:p`), ODF (`text:p`, `text:h`) and XHTML alike.
pub(crate) fn xml_text_content(
    xml: &str,
    paragraph_locals: &[&[u8]],
) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(ConvertError::xml)? {
            Event::Text(t) => {
                let decoded = t.decode().map_err(ConvertError::xml)?;
                let chunk = quick_xml::escape::unescape(&decoded).map_err(ConvertError::xml)?;
                text.push_str(&chunk);
            }
            Event::GeneralRef(r) => {
                if let Some(ch) = r.resolve_char_ref().map_err(ConvertError::xml)? {
                    text.push(ch);
                } else {
                    let name = r.decode().map_err(ConvertError::xml)?;
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        text.push_str(resolved);
                    }
                }
            }
            Event::End(e) => {
                if paragraph_locals.contains(&e.local_name().as_ref()) {
                    text.push('\n');
                }
            }
            Event::Empty(e) => {
                // Self-closing breaks (<w:br/>, <br/>) still end a line.
                if e.local_name().as_ref() == b"br" {
                    text.push('\n');
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Escape a string for inclusion in XML character data.
pub(crate) fn escape_xml(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Write plain text to a file.
pub(crate) fn write_txt(text: &str, output_path: &Path) -> Result<(), ConvertError> {
    fs::write(output_path, text.as_bytes())?;
    Ok(())
}

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const LEADING: f32 = 14.0;
const FONT_SIZE: f32 = 11.0;
const MAX_LINE_CHARS: usize = 90;

/// Wrap text into lines no longer than `MAX_LINE_CHARS` characters.
fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        if raw.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in raw.split_whitespace() {
            if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > MAX_LINE_CHARS
            {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Write text as a paginated Helvetica PDF.
pub(crate) fn write_text_pdf(text: &str, output_path: &Path) -> Result<(), ConvertError> {
    let lines = wrap_lines(text);
    let lines_per_page = ((PAGE_HEIGHT - 2.0 * MARGIN) / LEADING) as usize;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };

    let mut page_ids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(lines_per_page) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in chunk {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(ConvertError::pdf)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources.clone(),
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(output_path).map_err(ConvertError::pdf)?;
    Ok(())
}

const DOCX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const DOCX_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

/// Write text as a minimal DOCX package, one paragraph per line.
pub(crate) fn write_docx(text: &str, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(DOCX_CONTENT_TYPES.as_bytes())?;

    writer.start_file("_rels/.rels", options)?;
    writer.write_all(DOCX_RELS.as_bytes())?;

    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    );
    for line in text.lines() {
        body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
        body.push_str(&escape_xml(line));
        body.push_str("</w:t></w:r></w:p>");
    }
    body.push_str("</w:body></w:document>");

    writer.start_file("word/document.xml", options)?;
    writer.write_all(body.as_bytes())?;
    writer.finish()?;
    Ok(())
}

/// Escape text for an RTF document body.
fn escape_rtf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            c if (c as u32) > 127 => out.push_str(&format!("\\u{}?", c as i32)),
            c => out.push(c),
        }
    }
    out
}

/// Write text as a minimal RTF document, one paragraph per line.
pub(crate) fn write_rtf(text: &str, output_path: &Path) -> Result<(), ConvertError> {
    let mut body = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Helvetica;}}\\f0\\fs22\n");
    for line in text.lines() {
        body.push_str(&escape_rtf(line));
        body.push_str("\\par\n");
    }
    body.push('}');
    fs::write(output_path, body.as_bytes())?;
    Ok(())
}
