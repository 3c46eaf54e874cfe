//! High-level bitmap operations.
//!
//! These combine the [`Canvas`] primitive and `image::imageops` into the
//! handful of whole-image transforms the collage needs: orientation bake,
//! quarter-turn rotation, crop, downscale, and the approximate average color.

use super::calculations::calculate_fit_within;
use super::canvas::Canvas;
use crate::color::Color;
use crate::geometry::{Dimensions, Rect};
use crate::orientation::OrientationTag;
use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Redraw a raw decoded bitmap so it is upright.
///
/// Costs one full draw for every tag except [`OrientationTag::Up`], which
/// returns the bitmap untouched.
pub fn bake_orientation(raw: RgbaImage, orientation: OrientationTag) -> RgbaImage {
    if orientation.is_identity() {
        return raw;
    }

    let source = Dimensions::new(raw.width(), raw.height());
    let upright = orientation.upright_dimensions(source);
    let mut canvas = Canvas::new(upright.width, upright.height);
    canvas.concatenate(orientation.transform(source));
    canvas.draw_transformed(&raw);
    canvas.into_image()
}

/// Rotate by a normalized quarter-turn angle; positive degrees turn clockwise.
///
/// Only `0`, `90`, `180` and `-90` are meaningful; callers normalize first.
pub fn rotate(image: &RgbaImage, degrees: i32) -> RgbaImage {
    match degrees {
        90 => imageops::rotate90(image),
        180 | -180 => imageops::rotate180(image),
        -90 | 270 => imageops::rotate270(image),
        _ => image.clone(),
    }
}

/// Dimensions after [`rotate`].
pub fn rotated_dimensions(dims: Dimensions, degrees: i32) -> Dimensions {
    match degrees {
        90 | -90 | 270 => dims.swapped(),
        _ => dims,
    }
}

/// Copy out the pixels of `rect`. The rectangle must lie inside the image.
pub fn crop(image: &RgbaImage, rect: Rect) -> RgbaImage {
    debug_assert!(
        Dimensions::new(image.width(), image.height())
            .bounds()
            .contains(rect),
        "crop {rect:?} outside {}x{} bitmap",
        image.width(),
        image.height()
    );
    imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Resample so the longer edge is at most `max_edge`.
///
/// Returns `None` when the image already fits.
pub fn downscale_to_fit(image: &RgbaImage, max_edge: u32) -> Option<RgbaImage> {
    let original = image.dimensions();
    let (width, height) = calculate_fit_within(original, max_edge);
    if (width, height) == original {
        return None;
    }
    Some(imageops::resize(image, width, height, FilterType::Lanczos3))
}

/// Approximate average color, by resampling the whole bitmap down to one pixel.
///
/// This is a filter-weighted mean, not an exact per-pixel mean. Alpha is
/// always reported as fully opaque; empty bitmaps average to black.
pub fn approx_average_color(image: &RgbaImage) -> Color {
    if image.width() == 0 || image.height() == 0 {
        return Color::BLACK;
    }
    let pixel = imageops::resize(image, 1, 1, FilterType::Triangle);
    let [r, g, b, _] = pixel.get_pixel(0, 0).0;
    Color::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
}
