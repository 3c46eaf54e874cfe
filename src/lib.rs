//! # tych
//!
//! Composite an ordered set of photos into a single bordered image: a
//! diptych, triptych or longer polyptych. Each photo can be cropped and
//! rotated independently; the collage lays them out in a strip or a stack,
//! scales them to a common edge and draws them over a border color.
//!
//! # Architecture: Derive, Lay Out, Compose
//!
//! ```text
//! 1. Derive   source + EXIF tag  →  upright  →  rotate/crop  →  current result
//! 2. Layout   current sizes      →  axis, borders, placements, fit scale
//! 3. Compose  layout + results   →  one RGBA bitmap
//! ```
//!
//! Step 1 runs per image on background render threads and is cached; steps 2
//! and 3 run on demand. Layout never touches pixels, so it can be printed or
//! tested without drawing.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`derived`] | Per-image upright bitmap, crop/rotate state, asynchronous cached recompute |
//! | [`collage`] | Ordered image list, border settings, average color, composition |
//! | [`layout`] | Axis choice, border sizes, placements, output-frame fit |
//! | [`record`] | JSON project files: save and restore a collage with its edits |
//! | [`config`] | `tych.toml` loading, validation and merging |
//! | [`color`] | RGBA color with hex parsing |
//! | [`geometry`] | Integer sizes and rectangles, 2D affine transforms |
//! | [`orientation`] | EXIF orientation tags and the transforms that undo them |
//! | [`imaging`] | Codec backend, drawing canvas, pixel operations |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate only. There are no
//! system libraries to install and the binary is self-contained.
//!
//! ## Upright Once, Derive Many
//!
//! EXIF orientation is baked into the pixels when an image is loaded. Every
//! later edit starts from that upright bitmap, so a crop rectangle always
//! means the same thing regardless of how the camera was held.
//!
//! ## Readers Never See Torn State
//!
//! [`derived::DerivedView`] publishes a result only if it still matches the
//! latest requested state. Callers either get the freshest result or block
//! until it is ready; stale renders are discarded.

pub mod collage;
pub mod color;
pub mod config;
pub mod derived;
pub mod geometry;
pub mod imaging;
pub mod layout;
pub mod orientation;
pub mod output;
pub mod record;

#[cfg(test)]
pub(crate) mod test_helpers;
