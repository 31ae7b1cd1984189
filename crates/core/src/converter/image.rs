//! Raster image converter.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::error::ConvertError;
use super::traits::Converter;
use super::types::ConversionRequest;

/// Supported raster input extensions.
pub const IMAGE_INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp"];

/// Fixed output allow-list for the image category.
pub const IMAGE_OUTPUT_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "pdf"];

/// Converter for raster images, backed by the `image` crate.
///
/// All raster-to-raster conversions decode into memory and re-encode.
/// The `pdf` target wraps a JPEG-encoded frame in a one-page document.
#[derive(Debug, Default)]
pub struct ImageConverter;

impl ImageConverter {
    pub fn new() -> Self {
        Self
    }

    /// Flatten alpha onto a white background, as JPEG has no transparency.
    fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
        let rgba = img.to_rgba8();
        let mut rgb = RgbImage::new(rgba.width(), rgba.height());
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            let alpha = a as u32;
            let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
            rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
        }
        rgb
    }

    fn convert_image(
        img: DynamicImage,
        output_path: &Path,
        output_format: &str,
    ) -> Result<(), ConvertError> {
        if matches!(output_format, "jpg" | "jpeg") {
            let rgb = Self::flatten_to_rgb(&img);
            rgb.save_with_format(output_path, ImageFormat::Jpeg)?;
            return Ok(());
        }

        let format = ImageFormat::from_extension(output_format).ok_or_else(|| {
            ConvertError::UnsupportedOutput {
                converter: "image".to_string(),
                format: output_format.to_string(),
            }
        })?;
        img.save_with_format(output_path, format)?;
        Ok(())
    }

    /// Embed the image as a single-page PDF.
    fn convert_to_pdf(img: DynamicImage, output_path: &Path) -> Result<(), ConvertError> {
        let rgb = Self::flatten_to_rgb(&img);
        let (width, height) = (rgb.width(), rgb.height());

        let mut jpeg_bytes = Vec::new();
        DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut jpeg_bytes), ImageFormat::Jpeg)?;

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg_bytes,
        );
        let image_id = doc.add_object(image_stream);

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (width as f32).into(),
                    0.into(),
                    0.into(),
                    (height as f32).into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ];
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(ConvertError::pdf)?,
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                (width as f32).into(),
                (height as f32).into(),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
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
}

#[async_trait]
impl Converter for ImageConverter {
    fn name(&self) -> &str {
        "image"
    }

    fn output_formats(&self) -> &[&str] {
        IMAGE_OUTPUT_FORMATS
    }

    async fn convert(&self, request: &ConversionRequest) -> Result<PathBuf, ConvertError> {
        let extension = request
            .input_extension()
            .unwrap_or_default();
        if !IMAGE_INPUT_EXTENSIONS.contains(&extension.as_str()) {
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

        let img = image::open(&request.input_path)?;
        let output_path = request.default_output_path();

        if request.output_format == "pdf" {
            Self::convert_to_pdf(img, &output_path)?;
        } else {
            Self::convert_image(img, &output_path, &request.output_format)?;
        }

        tracing::debug!(
            input = %request.input_path.display(),
            output = %output_path.display(),
            "image converted"
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Quality;
    use tempfile::tempdir;

    fn write_test_png(dir: &Path) -> PathBuf {
        let path = dir.join("input.png");
        let img = RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[tokio::test]
    async fn test_png_to_jpg() {
        let dir = tempdir().unwrap();
        let input = write_test_png(dir.path());

        let converter = ImageConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "jpg", Quality::Medium);
        let output = converter.convert(&request).await.unwrap();

        assert!(output.exists());
        assert_eq!(output.extension().unwrap(), "jpg");
        let reopened = image::open(&output).unwrap();
        assert_eq!(reopened.width(), 4);
    }

    #[tokio::test]
    async fn test_png_to_pdf() {
        let dir = tempdir().unwrap();
        let input = write_test_png(dir.path());

        let converter = ImageConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "pdf", Quality::Medium);
        let output = converter.convert(&request).await.unwrap();

        let doc = Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_output_rejected() {
        let dir = tempdir().unwrap();
        let input = write_test_png(dir.path());

        let converter = ImageConverter::new();
        let request = ConversionRequest::new(&input, dir.path(), "docx", Quality::Medium);
        let result = converter.convert(&request).await;
        assert!(matches!(
            result,
            Err(ConvertError::UnsupportedOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_input_rejected() {
        let dir = tempdir().unwrap();
        let converter = ImageConverter::new();
        let request = ConversionRequest::new(
            dir.path().join("absent.png"),
            dir.path(),
            "jpg",
            Quality::Medium,
        );
        let result = converter.convert(&request).await;
        assert!(matches!(result, Err(ConvertError::InputNotFound { .. })));
    }

    #[test]
    fn test_flatten_alpha_blends_onto_white() {
        let mut rgba = image::RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        let rgb = ImageConverter::flatten_to_rgb(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
    }
}
