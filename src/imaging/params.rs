//! Parameter types for encoding composites.
//!
//! These types describe *what* to write, not *how*. The
//! [`backend`](super::backend) decides the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Container format, picked from a file extension with a PNG fallback.

use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Lossless, keeps alpha. Used when nothing else matches.
    #[default]
    Png,
    /// Lossy, alpha is flattened away.
    Jpeg(Quality),
    Tiff,
    /// Lossless WebP.
    WebP,
}

impl OutputFormat {
    /// Pick a format from the path's extension (case-insensitive).
    ///
    /// Unknown or missing extensions fall back to PNG.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "jpg" | "jpeg" => Self::Jpeg(Quality::default()),
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::WebP,
            _ => Self::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpg",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
        }
    }
}
