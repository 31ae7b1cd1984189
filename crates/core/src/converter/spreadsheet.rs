//! Spreadsheet converter (XLSX, CSV, ODS).

use async_trait::async_trait;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::ConvertError;
use super::text;
use super::traits::Converter;
use super::types::ConversionRequest;

/// Supported spreadsheet input extensions.
pub const SPREADSHEET_INPUT_EXTENSIONS: &[&str] = &["xlsx", "csv", "ods"];

/// Fixed output allow-list for the spreadsheet category.
pub const SPREADSHEET_OUTPUT_FORMATS: &[&str] = &["xlsx", "csv", "ods", "pdf"];

/// Cap on `table:number-columns-repeated` expansion when reading ODS.
const MAX_REPEATED_CELLS: usize = 4096;

type Rows = Vec<Vec<String>>;

/// Converter for tabular data.
///
/// All conversions run through a `Vec<Vec<String>>` row model; formulas,
/// styles and charts are not preserved.
#[derive(Debug, Default)]
pub struct SpreadsheetConverter;

impl SpreadsheetConverter {
    pub fn new() -> Self {
        Self
    }

    fn read_rows(path: &Path, extension: &str) -> Result<Rows, ConvertError> {
        match extension {
            "csv" => read_csv(path),
            "xlsx" => read_xlsx(path),
            "ods" => read_ods(path),
            other => Err(ConvertError::UnsupportedInput {
                extension: other.to_string(),
            }),
        }
    }
}

/// Pick the most plausible delimiter by counting candidates in the first
/// line. Best-effort, comma wins ties; not a contract for malformed input.
pub(crate) fn sniff_delimiter(sample: &str) -> char {
    let first_line = sample.lines().next().unwrap_or("");
    let candidates = [',', ';', '\t', '|'];
    candidates
        .into_iter()
        .map(|c| (c, first_line.matches(c).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map(|(c, _)| c)
        .unwrap_or(',')
}

/// Parse delimited text with double-quote escaping.
pub(crate) fn parse_delimited(content: &str, delimiter: char) -> Rows {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                c => field.push(c),
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            c if c == delimiter => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            c => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

fn read_csv(path: &Path) -> Result<Rows, ConvertError> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    let delimiter = sniff_delimiter(&content);
    Ok(parse_delimited(&content, delimiter))
}

/// Column index (0-based) from an A1-style cell reference.
fn column_index(cell_ref: &str) -> Option<usize> {
    let letters: String = cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

fn read_shared_strings(xml: &str) -> Result<Vec<String>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;

    loop {
        match reader.read_event().map_err(ConvertError::xml)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                in_si = true;
                current.clear();
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                in_si = false;
                strings.push(std::mem::take(&mut current));
            }
            Event::Text(t) if in_si => {
                let decoded = t.decode().map_err(ConvertError::xml)?;
                current.push_str(&quick_xml::escape::unescape(&decoded).map_err(ConvertError::xml)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

fn read_xlsx(path: &Path) -> Result<Rows, ConvertError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let shared = match archive.by_name("xl/sharedStrings.xml") {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            read_shared_strings(&xml)?
        }
        Err(zip::result::ZipError::FileNotFound) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let mut xml = String::new();
    archive
        .by_name("xl/worksheets/sheet1.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut rows: Rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_type = String::new();
    let mut cell_column: Option<usize> = None;
    let mut in_value = false;
    let mut value = String::new();

    loop {
        match reader.read_event().map_err(ConvertError::xml)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell_type = "n".to_string();
                    cell_column = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.local_name().as_ref() {
                            b"t" => {
                                cell_type =
                                    String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"r" => {
                                cell_column =
                                    column_index(&String::from_utf8_lossy(&attr.value));
                            }
                            _ => {}
                        }
                    }
                }
                b"v" | b"t" => {
                    in_value = true;
                    value.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_value => {
                let decoded = t.decode().map_err(ConvertError::xml)?;
                value.push_str(&quick_xml::escape::unescape(&decoded).map_err(ConvertError::xml)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let resolved = if cell_type == "s" {
                        value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default()
                    } else {
                        std::mem::take(&mut value)
                    };
                    // Pad skipped (empty) cells so columns stay aligned.
                    if let Some(col) = cell_column {
                        while row.len() < col {
                            row.push(String::new());
                        }
                    }
                    row.push(resolved);
                    value.clear();
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn read_ods(path: &Path) -> Result<Rows, ConvertError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive.by_name("content.xml")?.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut rows: Rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut repeat = 1usize;
    let mut in_cell = false;

    loop {
        match reader.read_event().map_err(ConvertError::xml)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"table-row" => row.clear(),
                b"table-cell" => {
                    in_cell = true;
                    cell.clear();
                    repeat = 1;
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"number-columns-repeated" {
                            repeat = String::from_utf8_lossy(&attr.value)
                                .parse::<usize>()
                                .unwrap_or(1)
                                .min(MAX_REPEATED_CELLS);
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"table-cell" => {
                let mut empty_repeat = 1usize;
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"number-columns-repeated" {
                        empty_repeat = String::from_utf8_lossy(&attr.value)
                            .parse::<usize>()
                            .unwrap_or(1)
                            .min(MAX_REPEATED_CELLS);
                    }
                }
                for _ in 0..empty_repeat {
                    row.push(String::new());
                }
            }
            Event::Text(t) if in_cell => {
                let decoded = t.decode().map_err(ConvertError::xml)?;
                cell.push_str(&quick_xml::escape::unescape(&decoded).map_err(ConvertError::xml)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"table-cell" => {
                    in_cell = false;
                    for _ in 0..repeat {
                        row.push(cell.clone());
                    }
                }
                b"table-row" => {
                    // Drop trailing padding cells repeated to the sheet edge.
                    while row.last().is_some_and(|c| c.is_empty()) {
                        row.pop();
                    }
                    rows.push(std::mem::take(&mut row));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    Ok(rows)
}

/// Quote a CSV field when it contains the delimiter, quotes or newlines.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_csv(rows: &Rows, output_path: &Path) -> Result<(), ConvertError> {
    let mut out = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    fs::write(output_path, out.as_bytes())?;
    Ok(())
}

const XLSX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const XLSX_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const XLSX_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const XLSX_WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

fn write_xlsx(rows: &Rows, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(XLSX_CONTENT_TYPES.as_bytes())?;
    writer.start_file("_rels/.rels", options)?;
    writer.write_all(XLSX_RELS.as_bytes())?;
    writer.start_file("xl/workbook.xml", options)?;
    writer.write_all(XLSX_WORKBOOK.as_bytes())?;
    writer.start_file("xl/_rels/workbook.xml.rels", options)?;
    writer.write_all(XLSX_WORKBOOK_RELS.as_bytes())?;

    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for row in rows {
        sheet.push_str("<row>");
        for cell in row {
            sheet.push_str("<c t=\"inlineStr\"><is><t xml:space=\"preserve\">");
            sheet.push_str(&text::escape_xml(cell));
            sheet.push_str("</t></is></c>");
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");
    writer.start_file("xl/worksheets/sheet1.xml", options)?;
    writer.write_all(sheet.as_bytes())?;
    writer.finish()?;
    Ok(())
}

const ODS_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

fn write_ods(rows: &Rows, output_path: &Path) -> Result<(), ConvertError> {
    let file = fs::File::create(output_path)?;
    let mut writer = zip::ZipWriter::new(file);
    let stored = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    let deflated = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("mimetype", stored)?;
    writer.write_all(b"application/vnd.oasis.opendocument.spreadsheet")?;
    writer.start_file("META-INF/manifest.xml", deflated)?;
    writer.write_all(ODS_MANIFEST.as_bytes())?;

    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2">
<office:body><office:spreadsheet><table:table table:name="Sheet1">"#,
    );
    for row in rows {
        content.push_str("<table:table-row>");
        for cell in row {
            content.push_str("<table:table-cell office:value-type=\"string\"><text:p>");
            content.push_str(&text::escape_xml(cell));
            content.push_str("</text:p></table:table-cell>");
        }
        content.push_str("</table:table-row>");
    }
    content.push_str("</table:table></office:spreadsheet></office:body></office:document-content>");
    writer.start_file("content.xml", deflated)?;
    writer.write_all(content.as_bytes())?;
    writer.finish()?;
    Ok(())
}

fn write_pdf(rows: &Rows, output_path: &Path) -> Result<(), ConvertError> {
    let body: Vec<String> = rows.iter().map(|row| row.join(" | ")).collect();
    text::write_text_pdf(&body.join("\n"), output_path)
}

#[async_trait]
impl Converter for SpreadsheetConverter {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    fn output_formats(&self) -> &[&str] {
        SPREADSHEET_OUTPUT_FORMATS
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request.input_extension().unwrap_or_default();
        if !SPREADSHEET_INPUT_EXTENSIONS.contains(&extension.as_str()) {
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

        let rows = Self::read_rows(&request.input_path, &extension)?;
        let output_path = request.default_output_path();

        match request.output_format.as_str() {
            "csv" => write_csv(&rows, &output_path)?,
            "xlsx" => write_xlsx(&rows, &output_path)?,
            "ods" => write_ods(&rows, &output_path)?,
            "pdf" => write_pdf(&rows, &output_path)?,
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
            rows = rows.len(),
            "spreadsheet converted"
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Quality;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(sniff_delimiter("a;b;c"), ';');
        assert_eq!(sniff_delimiter("a\tb\tc"), '\t');
        assert_eq!(sniff_delimiter("justone"), ',');
    }

    #[test]
    fn test_parse_delimited_with_quotes() {
        let rows = parse_delimited("a,\"b,with comma\",c\n\"quoted \"\"inner\"\"\",x\n", ',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b,with comma", "c"]);
        assert_eq!(rows[1], vec!["quoted \"inner\"", "x"]);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("C7"), Some(2));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
    }

    #[tokio::test]
    async fn test_csv_to_xlsx_and_back() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("table.csv");
        fs::write(&input, "name,count\nwidget,3\ngadget,7\n").unwrap();

        let converter = SpreadsheetConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "xlsx", Quality::Medium);
        let xlsx = converter.convert(&request).await.unwrap();

        let request = ConversionRequest::new(&xlsx, dir.path(), "csv", Quality::Medium);
        let csv = converter.convert(&request).await.unwrap();
        let content = fs::read_to_string(&csv).unwrap();
        assert_eq!(content, "name,count\nwidget,3\ngadget,7\n");
    }

    #[tokio::test]
    async fn test_csv_to_ods_and_back() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("table.csv");
        fs::write(&input, "x;y\n1;2\n").unwrap();

        let converter = SpreadsheetConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "ods", Quality::Medium);
        let ods = converter.convert(&request).await.unwrap();

        let request = ConversionRequest::new(&ods, dir.path(), "csv", Quality::Medium);
        let csv = converter.convert(&request).await.unwrap();
        let content = fs::read_to_string(&csv).unwrap();
        assert_eq!(content, "x,y\n1,2\n");
    }

    #[tokio::test]
    async fn test_csv_to_pdf() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("table.csv");
        fs::write(&input, "a,b\n1,2\n").unwrap();

        let converter = SpreadsheetConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "pdf", Quality::Medium);
        let output = converter.convert(&request).await.unwrap();
        assert!(lopdf::Document::load(&output).is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_output_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("table.csv");
        fs::write(&input, "a,b\n").unwrap();

        let converter = SpreadsheetConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "docx", Quality::Medium);
        let result = converter.convert(&request).await;
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedOutput { .. })
        ));
    }
}
