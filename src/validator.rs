//! Image validation
//!
//! A fetched body is only trusted after it decodes as an image. The file
//! extension of the URL plays no part: format detection is content-based,
//! and the whole buffer is decoded, not just the magic bytes. JPEG also needs
//! an end-of-image marker after its last scan: JPEG decoders pad truncated
//! scan data instead of failing. Bytes after that marker are allowed.

use image::ImageFormat;
use serde::Serialize;

use crate::config::ValidationConfig;
use crate::error::InvalidImageError;

/// JPEG start-of-scan marker
const JPEG_SOS: [u8; 2] = [0xFF, 0xDA];
/// JPEG end-of-image marker
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// What a successfully validated buffer contains
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Detected container format
    #[serde(serialize_with = "serialize_format")]
    pub format: ImageFormat,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Content-based image validator
#[derive(Clone, Debug)]
pub struct ImageValidator {
    min_width: u32,
    min_height: u32,
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self {
            min_width: 1,
            min_height: 1,
        }
    }
}

impl ImageValidator {
    /// Validator with the configured minimum dimensions
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            min_width: config.min_width,
            min_height: config.min_height,
        }
    }

    /// True if `bytes` decode as a supported image of acceptable size
    ///
    /// Never panics or errors; any decode problem yields `false`.
    pub fn validate(&self, bytes: &[u8]) -> bool {
        self.inspect(bytes).is_ok()
    }

    /// Decode `bytes` and report format and dimensions, or why they were rejected
    pub fn inspect(&self, bytes: &[u8]) -> Result<ImageInfo, InvalidImageError> {
        if bytes.is_empty() {
            return Err(InvalidImageError::Empty);
        }

        let format = image::guess_format(bytes).map_err(|_| InvalidImageError::UnknownFormat)?;

        if format == ImageFormat::Jpeg && !has_jpeg_trailer(bytes) {
            return Err(InvalidImageError::Truncated {
                format: format_name(format),
            });
        }

        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            InvalidImageError::Decode {
                format: format_name(format),
                reason: e.to_string(),
            }
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        if width < self.min_width.max(1) || height < self.min_height.max(1) {
            return Err(InvalidImageError::TooSmall { width, height });
        }

        Ok(ImageInfo {
            format,
            width,
            height,
        })
    }
}

fn has_jpeg_trailer(bytes: &[u8]) -> bool {
    // Marker bytes cannot occur inside entropy-coded data, so the last
    // start-of-scan belongs to the final scan. Data after its end-of-image
    // marker (maker notes, embedded previews) is ignored.
    match bytes.windows(2).rposition(|w| w == JPEG_SOS) {
        Some(scan) => bytes[scan + 2..].windows(2).any(|w| w == JPEG_EOI),
        // No scan at all: leave the verdict to the decoder
        None => true,
    }
}

fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_lowercase()
}

fn serialize_format<S>(format: &ImageFormat, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_name(*format))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gif_bytes, jpeg_bytes, png_bytes};

    #[test]
    fn accepts_valid_jpeg() {
        let info = ImageValidator::default().inspect(&jpeg_bytes(8, 6)).unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!((info.width, info.height), (8, 6));
    }

    #[test]
    fn accepts_png_and_gif_by_content() {
        let validator = ImageValidator::default();
        assert_eq!(
            validator.inspect(&png_bytes(3, 2)).unwrap().format,
            ImageFormat::Png
        );
        assert_eq!(
            validator.inspect(&gif_bytes(2, 2)).unwrap().format,
            ImageFormat::Gif
        );
    }

    #[test]
    fn accepts_one_by_one() {
        assert!(ImageValidator::default().validate(&png_bytes(1, 1)));
    }

    #[test]
    fn rejects_empty_buffer() {
        assert_eq!(
            ImageValidator::default().inspect(&[]),
            Err(InvalidImageError::Empty)
        );
    }

    #[test]
    fn rejects_html_error_page_regardless_of_extension() {
        // what a soft-404 served at foo1.jpg looks like
        let body = b"<!DOCTYPE html><html><body>Not Found</body></html>";
        let validator = ImageValidator::default();
        assert!(!validator.validate(body));
        assert_eq!(
            validator.inspect(body),
            Err(InvalidImageError::UnknownFormat)
        );
    }

    #[test]
    fn rejects_truncated_jpeg() {
        let full = jpeg_bytes(32, 32);
        // scan header kept, end of the scan data and EOI lost
        let truncated = &full[..full.len() - 12];
        assert!(matches!(
            ImageValidator::default().inspect(truncated),
            Err(InvalidImageError::Truncated { .. })
        ));
    }

    #[test]
    fn accepts_jpeg_with_data_after_end_of_image() {
        let mut bytes = jpeg_bytes(8, 8);
        bytes.extend_from_slice(b"SEFT trailer metadata");
        let info = ImageValidator::default().inspect(&bytes).unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!((info.width, info.height), (8, 8));
    }

    #[test]
    fn accepts_jpeg_with_appended_preview_image() {
        // motion-photo style: a second complete JPEG after the first
        let mut bytes = jpeg_bytes(16, 16);
        bytes.extend_from_slice(&jpeg_bytes(4, 4));
        assert!(ImageValidator::default().validate(&bytes));
    }

    #[test]
    fn rejects_truncated_png() {
        let full = png_bytes(32, 32);
        let truncated = &full[..full.len() - 20];
        assert!(!ImageValidator::default().validate(truncated));
    }

    #[test]
    fn rejects_jpeg_magic_with_garbage_body() {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend(std::iter::repeat(0x00).take(200));
        bytes.extend_from_slice(&JPEG_EOI);
        assert!(matches!(
            ImageValidator::default().inspect(&bytes),
            Err(InvalidImageError::Decode { .. })
        ));
    }

    #[test]
    fn jpeg_trailer_tolerates_padding() {
        let mut bytes = jpeg_bytes(4, 4);
        bytes.extend_from_slice(b"\r\n\0\0");
        assert!(ImageValidator::default().validate(&bytes));
    }

    #[test]
    fn enforces_minimum_dimensions() {
        let validator = ImageValidator::new(&ValidationConfig {
            min_width: 8,
            min_height: 8,
            require_image_content_type: false,
        });
        assert_eq!(
            validator.inspect(&png_bytes(4, 3)),
            Err(InvalidImageError::TooSmall {
                width: 4,
                height: 3
            })
        );
        assert!(validator.validate(&png_bytes(8, 8)));
    }

    #[test]
    fn info_serializes_format_name() {
        let info = ImageValidator::default().inspect(&png_bytes(2, 2)).unwrap();
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["format"], "png");
        assert_eq!(json["width"], 2);
    }
}
