//! Pure Rust codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` with format sniffing |
//! | EXIF orientation | `image::ImageDecoder::orientation` |
//! | Encode → PNG / TIFF / lossless WebP | `image` encoders, alpha kept |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder`, alpha flattened |

use super::backend::{BackendError, DecodedImage, ImageBackend};
use super::params::OutputFormat;
use crate::orientation::OrientationTag;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::sync::LazyLock;
use tracing::trace;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Codec backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        if reader.format().is_none() {
            return Err(BackendError::Decode("unrecognized image format".into()));
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        // Containers without orientation metadata are upright.
        let orientation = decoder
            .orientation()
            .map(OrientationTag::from)
            .unwrap_or_default();
        let pixels = DynamicImage::from_decoder(decoder)
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .into_rgba8();

        trace!(
            width = pixels.width(),
            height = pixels.height(),
            exif = orientation.to_exif(),
            "decoded image"
        );
        Ok(DecodedImage {
            pixels,
            orientation,
        })
    }

    fn encode(&self, image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, BackendError> {
        let mut out = Cursor::new(Vec::new());
        let encode_err = |e: image::ImageError| BackendError::Encode(e.to_string());

        match format {
            OutputFormat::Png => image
                .write_with_encoder(PngEncoder::new(&mut out))
                .map_err(encode_err)?,
            OutputFormat::Tiff => image
                .write_with_encoder(TiffEncoder::new(&mut out))
                .map_err(encode_err)?,
            OutputFormat::WebP => image
                .write_with_encoder(WebPEncoder::new_lossless(&mut out))
                .map_err(encode_err)?,
            OutputFormat::Jpeg(quality) => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut out,
                    quality.value() as u8,
                ))
                .map_err(encode_err)?
            }
        }

        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{RED, solid};
    use image::{ImageEncoder, RgbImage};
    use std::path::Path;

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    /// Create a small valid JPEG byte stream with the given dimensions.
    fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Vec::new();
        JpegEncoder::new(&mut bytes)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        bytes
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let decoded = RustBackend::new().decode(&test_jpeg(200, 150)).unwrap();
        assert_eq!(decoded.pixels.dimensions(), (200, 150));
        assert_eq!(decoded.orientation, OrientationTag::Up);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_is_decode_error() {
        let backend = RustBackend::new();
        let bytes = backend.encode(&solid(16, 16, RED), OutputFormat::Png).unwrap();
        let result = backend.decode(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let backend = RustBackend::new();
        let source = solid(9, 4, RED);
        let bytes = backend.encode(&source, OutputFormat::Png).unwrap();
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded.pixels, source);
    }

    #[test]
    fn jpeg_encode_flattens_alpha() {
        let backend = RustBackend::new();
        let bytes = backend
            .encode(&solid(8, 8, RED), OutputFormat::Jpeg(Quality::new(80)))
            .unwrap();
        let decoded = backend.decode(&bytes).unwrap();
        assert_eq!(decoded.pixels.dimensions(), (8, 8));
        assert_eq!(decoded.pixels.get_pixel(4, 4).0[3], 255);
    }

    #[test]
    fn tiff_and_webp_encode() {
        let backend = RustBackend::new();
        for format in [OutputFormat::Tiff, OutputFormat::WebP] {
            let bytes = backend.encode(&solid(5, 6, RED), format).unwrap();
            let decoded = backend.decode(&bytes).unwrap();
            assert_eq!(decoded.pixels.dimensions(), (5, 6), "{format:?}");
        }
    }

    #[test]
    fn save_and_load_via_filesystem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tych.png");
        let backend = RustBackend::new();
        backend.save(&solid(12, 10, RED), &path).unwrap();

        let loaded = backend.load(&path).unwrap();
        assert_eq!(loaded.pixels.dimensions(), (12, 10));
    }

    #[test]
    fn load_nonexistent_file_errors() {
        let result = RustBackend::new().load(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
