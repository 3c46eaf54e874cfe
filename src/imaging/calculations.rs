//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Width:height aspect ratio as a decimal; 16:9 is 1.777…
///
/// Zero-sized inputs have an aspect ratio of `0.0` rather than NaN or infinity.
pub fn aspect_ratio(width: f64, height: f64) -> f64 {
    if width == 0.0 || height == 0.0 {
        return 0.0;
    }
    width / height
}

/// Scale `(width, height)` so that its height equals `target_height`.
///
/// The width scales proportionally and is floored, but a non-zero width never
/// drops below one pixel.
///
/// ```
/// # use tych::imaging::calculations::scale_to_height;
/// assert_eq!(scale_to_height((1600, 1200), 600), (800, 600));
/// assert_eq!(scale_to_height((1000, 3000), 100), (33, 100));
/// assert_eq!(scale_to_height((1, 1000), 100), (1, 100));
/// ```
pub fn scale_to_height(source: (u32, u32), target_height: u32) -> (u32, u32) {
    let (w, h) = source;
    if h == 0 {
        return (0, target_height);
    }
    let width = (w as u64 * target_height as u64 / h as u64) as u32;
    (keep_visible(w, width), target_height)
}

/// Scale `(width, height)` so that its width equals `target_width`.
///
/// The height scales proportionally and is floored, with the same one-pixel
/// minimum as [`scale_to_height`].
pub fn scale_to_width(source: (u32, u32), target_width: u32) -> (u32, u32) {
    let (w, h) = source;
    if w == 0 {
        return (target_width, 0);
    }
    let height = (h as u64 * target_width as u64 / w as u64) as u32;
    (target_width, keep_visible(h, height))
}

/// A scaled edge of a non-empty source stays at least one pixel.
fn keep_visible(source_edge: u32, scaled_edge: u32) -> u32 {
    if source_edge == 0 { 0 } else { scaled_edge.max(1) }
}

/// Dimensions that fit inside a `max_edge` square while keeping the aspect ratio.
///
/// Returns the original dimensions unchanged when they already fit, so this
/// never enlarges.
///
/// # Examples
/// ```
/// # use tych::imaging::calculations::calculate_fit_within;
/// assert_eq!(calculate_fit_within((4000, 3000), 2000), (2000, 1500));
/// assert_eq!(calculate_fit_within((3000, 4000), 2000), (1500, 2000));
/// assert_eq!(calculate_fit_within((800, 600), 2000), (800, 600));
/// ```
pub fn calculate_fit_within(original: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer_edge = orig_w.max(orig_h);
    if max_edge == 0 || longer_edge <= max_edge {
        return original;
    }

    if orig_w >= orig_h {
        // Landscape or square
        let ratio = max_edge as f64 / orig_w as f64;
        (max_edge, ((orig_h as f64 * ratio).floor() as u32).max(1))
    } else {
        // Portrait
        let ratio = max_edge as f64 / orig_h as f64;
        (((orig_w as f64 * ratio).floor() as u32).max(1), max_edge)
    }
}

/// Uniform downscale factor that makes a `full` canvas fit inside `frame`.
///
/// When the canvas is relatively wider than the frame and overflows it
/// horizontally, width decides; otherwise height decides if it overflows.
/// Never exceeds `1.0`: canvases are only ever shrunk.
///
/// A frame with a zero edge imposes no constraint.
pub fn calculate_fit_scale(full: (u32, u32), frame: (u32, u32)) -> f64 {
    let (full_w, full_h) = full;
    let (frame_w, frame_h) = frame;
    if frame_w == 0 || frame_h == 0 {
        return 1.0;
    }

    let frame_aspect = aspect_ratio(frame_w as f64, frame_h as f64);
    let canvas_aspect = aspect_ratio(full_w as f64, full_h as f64);

    if canvas_aspect > frame_aspect && full_w > frame_w {
        // Width dominates
        frame_w as f64 / full_w as f64
    } else if full_h > frame_h {
        frame_h as f64 / full_h as f64
    } else {
        1.0
    }
}

/// Apply a fit scale to one canvas edge, rounding to whole pixels.
pub fn scaled_edge(edge: u32, scale: f64) -> u32 {
    if edge == 0 {
        return 0;
    }
    ((edge as f64 * scale).round() as u32).max(1)
}
