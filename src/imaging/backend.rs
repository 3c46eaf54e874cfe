//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four collaborator operations the
//! collage needs from the outside world: decode, encode, load, and save.
//! Everything else (orientation, rotation, cropping, drawing) happens on
//! in-memory bitmaps.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::OutputFormat;
use crate::orientation::OrientationTag;
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid image data: {0}")]
    Decode(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// A decoded bitmap together with the orientation its container recorded.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: RgbaImage,
    pub orientation: OrientationTag,
}

/// Trait for image codec backends.
///
/// `load` and `save` have default implementations in terms of `decode` and
/// `encode`, so a backend only has to provide the codec itself.
pub trait ImageBackend: Sync {
    /// Decode compressed bytes into an RGBA bitmap.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, BackendError>;

    /// Encode a bitmap into the given container format.
    fn encode(&self, image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>, BackendError>;

    /// Read and decode an image file.
    fn load(&self, path: &Path) -> Result<DecodedImage, BackendError> {
        let bytes = std::fs::read(path)?;
        self.decode(&bytes).map_err(|e| match e {
            BackendError::Decode(msg) => {
                BackendError::Decode(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Encode and write a bitmap, picking the format from the file extension.
    fn save(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError> {
        let bytes = self.encode(image, OutputFormat::from_path(path))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
