//! Converter module: one capability per file category.
//!
//! Dispatch is by input extension through the [`ConverterRegistry`];
//! each category converter is a thin wrapper over an external format
//! library or system binary:
//!
//! - Images: `image` crate (+ `lopdf` for the PDF target)
//! - Documents and advanced documents: `lopdf`, `zip`, `quick-xml`
//! - Spreadsheets: `zip`, `quick-xml`, best-effort CSV sniffing
//! - Archives: `zip` crate natively, system `tar`/`7z`/`unrar` otherwise
//! - Media: system `ffmpeg`
//!
//! External tool availability is probed once at construction and
//! reflected in each converter's advertised output formats.

mod advanced;
mod archive;
mod document;
mod error;
mod image;
mod media;
mod registry;
mod spreadsheet;
mod text;
mod traits;
mod types;

pub use advanced::AdvancedDocumentConverter;
pub use archive::{ArchiveConverter, ArchiveTools};
pub use document::DocumentConverter;
pub use error::ConvertError;
pub use image::ImageConverter;
pub use media::MediaConverter;
pub use registry::{output_formats_for_extension, Category, ConverterRegistry};
pub use spreadsheet::SpreadsheetConverter;
pub use traits::Converter;
pub use types::{extension_of, ConversionRequest, Quality};
