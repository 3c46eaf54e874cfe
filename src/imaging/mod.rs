//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode + EXIF orientation** | `image::ImageReader`, `ImageDecoder::orientation` |
//! | **Orientation bake** | [`Canvas`] with the tag's affine transform |
//! | **Scaled draw** | Lanczos3 resample into a [`Tile`] |
//! | **Encode** | PNG / JPEG / TIFF / WebP encoders from `image` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and fit math (unit testable)
//! - **Parameters**: Data structures describing the output encoding
//! - **Canvas**: The drawing surface composition renders into
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level bitmap transforms built on the above

pub mod backend;
pub mod calculations;
pub mod canvas;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, DecodedImage, ImageBackend};
pub use canvas::{Canvas, Tile};
pub use params::{OutputFormat, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};
