//! Shared test utilities for the tych test suite.
//!
//! Solid-color and quadrant bitmaps with known pixels, plus a tolerant color
//! assertion for pixels that went through a resampling filter.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let view = DerivedView::new(solid(100, 50, RED), OrientationTag::Up);
//! let tile = view.current_result();
//! assert_color_near(*tile.get_pixel(10, 10), RED);
//! ```

use image::{Rgba, RgbaImage};

// =========================================================================
// Colors
// =========================================================================

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// =========================================================================
// Bitmaps
// =========================================================================

/// A bitmap filled with one color.
pub fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

/// Four colored quadrants: red top-left, green top-right, blue bottom-left,
/// white bottom-right. Odd edges put the extra row/column in the second half.
pub fn quadrants(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        match (x < width / 2, y < height / 2) {
            (true, true) => RED,
            (false, true) => GREEN,
            (true, false) => BLUE,
            (false, false) => WHITE,
        }
    })
}

// =========================================================================
// Assertions
// =========================================================================

/// Per-channel tolerance for pixels that went through a resampling filter.
const CHANNEL_TOLERANCE: i16 = 2;

/// Assert two pixels match within [`CHANNEL_TOLERANCE`] on every channel.
#[track_caller]
pub fn assert_color_near(actual: Rgba<u8>, expected: Rgba<u8>) {
    let close = actual
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, e)| (*a as i16 - *e as i16).abs() <= CHANNEL_TOLERANCE);
    assert!(close, "expected ~{:?}, got {:?}", expected.0, actual.0);
}
