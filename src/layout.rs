//! Collage layout: axis choice, borders, per-image placement, fit-scale.
//!
//! Layout is pure arithmetic over the images' current dimensions. It never
//! touches pixels, so it can be recomputed for every composition and printed
//! without drawing anything.
//!
//! ## Algorithm
//!
//! 1. Images with a zero edge are skipped. No drawable image is an error.
//! 2. If portrait-or-square images make up at least half of the drawable set,
//!    the images go side by side in a horizontal strip; otherwise they are
//!    stacked vertically. `orientation_swapped` inverts the choice.
//! 3. The *minimum dimension* is the smallest height (horizontal strip) or
//!    smallest width (vertical stack). Every image is scaled so that edge
//!    equals it, and both border sizes are `floor(min_dimension × weight)`.
//! 4. Images are placed in list order starting after the outer border, left
//!    to right or top to bottom, separated by the inner border.
//! 5. With an output frame, the whole canvas gets one downscale factor so it
//!    fits. The factor is never above `1.0`.
//!
//! ```text
//!  horizontal                     vertical
//!  ┌──────────────────────┐       ┌────────┐
//!  │ ┌────┐ ┌──┐ ┌──────┐ │       │ ┌────┐ │
//!  │ │ 0  │ │1 │ │  2   │ │       │ │ 0  │ │
//!  │ └────┘ └──┘ └──────┘ │       │ ├────┤ │
//!  └──────────────────────┘       │ │ 1  │ │
//!                                 │ └────┘ │
//!                                 └────────┘
//! ```

use crate::geometry::{Dimensions, Rect};
use crate::imaging::calculations::{
    calculate_fit_scale, scale_to_height, scale_to_width, scaled_edge,
};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    #[error("collage has no images")]
    EmptyCollage,
    #[error("no drawable images: every image has a zero width or height")]
    NoDrawableImages,
}

/// Direction images are laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Side by side, left to right.
    Horizontal,
    /// Stacked, top to bottom.
    Vertical,
}

/// Border weights and axis override for a layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Outer border as a fraction of the minimum dimension.
    pub outer_border_weight: f64,
    /// Gap between images as a fraction of the minimum dimension.
    pub inner_border_weight: f64,
    /// Invert the automatic axis choice.
    pub orientation_swapped: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            outer_border_weight: 0.0,
            inner_border_weight: 0.0,
            orientation_swapped: false,
        }
    }
}

/// Where one image goes, in unscaled canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Position of the image in the collage's list.
    pub index: usize,
    pub rect: Rect,
}

/// A computed layout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollageLayout {
    pub axis: Axis,
    /// Common height (horizontal) or width (vertical) of every placed image.
    pub min_dimension: u32,
    pub outer_border: u32,
    pub inner_border: u32,
    /// Canvas size before fit-scaling.
    pub full: Dimensions,
    /// Uniform downscale applied at draw time, in `(0, 1]`.
    pub canvas_scale: f64,
    /// Draw list, in collage order, undrawable images omitted.
    pub placements: Vec<Placement>,
}

impl CollageLayout {
    /// Lay out images of the given dimensions.
    ///
    /// `sizes[i]` is the current size of image `i`; placements refer back to
    /// these indices. `frame`, when given, bounds the final canvas.
    pub fn compute(
        sizes: &[Dimensions],
        options: &LayoutOptions,
        frame: Option<Dimensions>,
    ) -> Result<Self, LayoutError> {
        if sizes.is_empty() {
            return Err(LayoutError::EmptyCollage);
        }

        let drawable: Vec<(usize, Dimensions)> = sizes
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, dims)| dims.is_drawable())
            .collect();
        if drawable.is_empty() {
            return Err(LayoutError::NoDrawableImages);
        }

        let min_width = drawable.iter().map(|(_, d)| d.width).min().unwrap_or(0);
        let min_height = drawable.iter().map(|(_, d)| d.height).min().unwrap_or(0);
        let portrait_count = drawable
            .iter()
            .filter(|(_, d)| d.is_portrait_or_square())
            .count();

        let mut horizontal = portrait_count * 2 >= drawable.len();
        if options.orientation_swapped {
            horizontal = !horizontal;
        }
        let axis = if horizontal {
            Axis::Horizontal
        } else {
            Axis::Vertical
        };

        let min_dimension = match axis {
            Axis::Horizontal => min_height,
            Axis::Vertical => min_width,
        };
        let border = |weight: f64| (min_dimension as f64 * weight.max(0.0)).floor() as u32;
        let outer_border = border(options.outer_border_weight);
        let inner_border = border(options.inner_border_weight);

        let mut placements = Vec::with_capacity(drawable.len());
        let mut cursor = outer_border;
        for (index, dims) in drawable {
            let rect = match axis {
                Axis::Horizontal => {
                    let (width, _) = scale_to_height((dims.width, dims.height), min_dimension);
                    Rect::new(cursor, outer_border, width, min_dimension)
                }
                Axis::Vertical => {
                    let (_, height) = scale_to_width((dims.width, dims.height), min_dimension);
                    Rect::new(outer_border, cursor, min_dimension, height)
                }
            };
            cursor = match axis {
                Axis::Horizontal => cursor + rect.width + inner_border,
                Axis::Vertical => cursor + rect.height + inner_border,
            };
            placements.push(Placement { index, rect });
        }

        // The loop added one inner border too many.
        let run = cursor - inner_border + outer_border;
        let across = min_dimension + 2 * outer_border;
        let full = match axis {
            Axis::Horizontal => Dimensions::new(run, across),
            Axis::Vertical => Dimensions::new(across, run),
        };

        let canvas_scale = frame
            .map(|f| calculate_fit_scale((full.width, full.height), (f.width, f.height)))
            .unwrap_or(1.0);

        debug!(
            ?axis,
            images = placements.len(),
            min_dimension,
            outer_border,
            inner_border,
            width = full.width,
            height = full.height,
            canvas_scale,
            "computed collage layout"
        );

        Ok(Self {
            axis,
            min_dimension,
            outer_border,
            inner_border,
            full,
            canvas_scale,
            placements,
        })
    }

    /// Width of the output bitmap, after fit-scaling.
    pub fn canvas_width(&self) -> u32 {
        scaled_edge(self.full.width, self.canvas_scale)
    }

    /// Height of the output bitmap, after fit-scaling.
    pub fn canvas_height(&self) -> u32 {
        scaled_edge(self.full.height, self.canvas_scale)
    }

    pub fn canvas_dimensions(&self) -> Dimensions {
        Dimensions::new(self.canvas_width(), self.canvas_height())
    }

    pub fn is_scaled(&self) -> bool {
        self.canvas_scale < 1.0
    }

    /// Placement of image `index` in output pixels, or `None` if the image
    /// was skipped as undrawable.
    pub fn scaled_placement(&self, index: usize) -> Option<Rect> {
        self.placements
            .iter()
            .find(|p| p.index == index)
            .map(|p| p.rect.scaled(self.canvas_scale))
    }

    pub fn scaled_outer_border(&self) -> u32 {
        (self.outer_border as f64 * self.canvas_scale).floor() as u32
    }

    pub fn scaled_inner_border(&self) -> u32 {
        (self.inner_border as f64 * self.canvas_scale).floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(list: &[(u32, u32)]) -> Vec<Dimensions> {
        list.iter().map(|&d| d.into()).collect()
    }

    fn options(outer: f64, inner: f64, swapped: bool) -> LayoutOptions {
        LayoutOptions {
            outer_border_weight: outer,
            inner_border_weight: inner,
            orientation_swapped: swapped,
        }
    }

    // =========================================================================
    // Axis selection
    // =========================================================================

    #[test]
    fn mostly_portrait_goes_horizontal() {
        let sizes = dims(&[(300, 400), (300, 500), (200, 200), (800, 600)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, false), None).unwrap();
        assert_eq!(layout.axis, Axis::Horizontal);
    }

    #[test]
    fn swapped_flips_the_axis() {
        let sizes = dims(&[(300, 400), (300, 500), (200, 200), (800, 600)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, true), None).unwrap();
        assert_eq!(layout.axis, Axis::Vertical);
    }

    #[test]
    fn mostly_landscape_goes_vertical() {
        let sizes = dims(&[(800, 600), (900, 600), (300, 400)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, false), None).unwrap();
        assert_eq!(layout.axis, Axis::Vertical);
    }

    #[test]
    fn even_split_goes_horizontal() {
        let sizes = dims(&[(800, 600), (300, 400)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, false), None).unwrap();
        assert_eq!(layout.axis, Axis::Horizontal);
    }

    // =========================================================================
    // Placement and canvas size
    // =========================================================================

    #[test]
    fn horizontal_strip_positions_and_size() {
        // min height 400 → widths 300, 200; borders 10% = 40, 5% = 20
        let sizes = dims(&[(300, 400), (400, 800)]);
        let layout = CollageLayout::compute(&sizes, &options(0.1, 0.05, false), None).unwrap();

        assert_eq!(layout.min_dimension, 400);
        assert_eq!(layout.outer_border, 40);
        assert_eq!(layout.inner_border, 20);
        assert_eq!(layout.placements[0].rect, Rect::new(40, 40, 300, 400));
        assert_eq!(layout.placements[1].rect, Rect::new(360, 40, 200, 400));
        // 300 + 200 + 20 + 2*40
        assert_eq!(layout.full, Dimensions::new(600, 480));
        assert_eq!(layout.canvas_scale, 1.0);
    }

    #[test]
    fn vertical_stack_first_image_on_top() {
        // min width 800 → heights 600, 400
        let sizes = dims(&[(800, 600), (1200, 600)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.1, false), None).unwrap();

        assert_eq!(layout.axis, Axis::Vertical);
        assert_eq!(layout.inner_border, 80);
        assert_eq!(layout.placements[0].rect, Rect::new(0, 0, 800, 600));
        assert_eq!(layout.placements[1].rect, Rect::new(0, 680, 800, 400));
        assert_eq!(layout.full, Dimensions::new(800, 1080));
    }

    #[test]
    fn single_image_has_no_inner_border() {
        let sizes = dims(&[(640, 480)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.5, false), None).unwrap();
        assert_eq!(layout.placements.len(), 1);
        // Landscape alone: vertical, min width 640
        assert_eq!(layout.full, Dimensions::new(640, 480));
    }

    #[test]
    fn zero_weights_tile_edge_to_edge() {
        let sizes = dims(&[(100, 100), (100, 100), (100, 100)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, false), None).unwrap();
        let xs: Vec<u32> = layout.placements.iter().map(|p| p.rect.x).collect();
        assert_eq!(xs, vec![0, 100, 200]);
        assert_eq!(layout.full, Dimensions::new(300, 100));
    }

    #[test]
    fn border_sizes_are_floored() {
        // 333 * 0.1 = 33.3
        let sizes = dims(&[(250, 333)]);
        let layout = CollageLayout::compute(&sizes, &options(0.1, 0.1, false), None).unwrap();
        assert_eq!(layout.outer_border, 33);
    }

    #[test]
    fn negative_weight_counts_as_zero() {
        let sizes = dims(&[(100, 200)]);
        let layout = CollageLayout::compute(&sizes, &options(-0.5, 0.0, false), None).unwrap();
        assert_eq!(layout.outer_border, 0);
    }

    // =========================================================================
    // Undrawable images
    // =========================================================================

    #[test]
    fn undrawable_images_are_skipped() {
        let sizes = dims(&[(0, 400), (300, 400), (300, 0)]);
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.0, false), None).unwrap();
        assert_eq!(layout.placements.len(), 1);
        assert_eq!(layout.placements[0].index, 1);
        assert_eq!(layout.scaled_placement(0), None);
    }

    #[test]
    fn all_undrawable_is_error() {
        let sizes = dims(&[(0, 400), (300, 0)]);
        let result = CollageLayout::compute(&sizes, &LayoutOptions::default(), None);
        assert_eq!(result, Err(LayoutError::NoDrawableImages));
    }

    #[test]
    fn empty_is_error() {
        let result = CollageLayout::compute(&[], &LayoutOptions::default(), None);
        assert_eq!(result, Err(LayoutError::EmptyCollage));
    }

    // =========================================================================
    // Fit into frame
    // =========================================================================

    /// Two squares side by side: a 1000x500 canvas.
    fn wide_canvas() -> Vec<Dimensions> {
        dims(&[(500, 500), (500, 500)])
    }

    #[test]
    fn frame_never_upscales() {
        let layout = CollageLayout::compute(
            &wide_canvas(),
            &LayoutOptions::default(),
            Some(Dimensions::new(2000, 2000)),
        )
        .unwrap();
        assert_eq!(layout.full, Dimensions::new(1000, 500));
        assert_eq!(layout.canvas_scale, 1.0);
        assert_eq!(layout.canvas_dimensions(), Dimensions::new(1000, 500));
        assert!(!layout.is_scaled());
    }

    #[test]
    fn frame_width_dominant_branch() {
        let layout = CollageLayout::compute(
            &wide_canvas(),
            &LayoutOptions::default(),
            Some(Dimensions::new(400, 400)),
        )
        .unwrap();
        assert_eq!(layout.canvas_scale, 0.4);
        assert_eq!(layout.canvas_dimensions(), Dimensions::new(400, 200));
    }

    #[test]
    fn frame_height_dominant_branch() {
        // 2:1 canvas into a 3:1 frame: relatively narrower, height 500 > 250
        let layout = CollageLayout::compute(
            &wide_canvas(),
            &LayoutOptions::default(),
            Some(Dimensions::new(750, 250)),
        )
        .unwrap();
        assert_eq!(layout.canvas_scale, 0.5);
        assert_eq!(layout.canvas_dimensions(), Dimensions::new(500, 250));
    }

    #[test]
    fn scaled_accessors_apply_canvas_scale() {
        let layout = CollageLayout::compute(
            &wide_canvas(),
            &options(0.1, 0.2, false),
            Some(Dimensions::new(600, 600)),
        )
        .unwrap();
        // full: 500+500+100+2*50 = 1200 x 600 → scale 0.5
        assert_eq!(layout.full, Dimensions::new(1200, 600));
        assert_eq!(layout.canvas_scale, 0.5);
        assert_eq!(layout.scaled_outer_border(), 25);
        assert_eq!(layout.scaled_inner_border(), 50);
        assert_eq!(layout.scaled_placement(1), Some(Rect::new(325, 25, 250, 250)));
    }

    #[test]
    fn thin_image_keeps_a_visible_strip() {
        // 1x1000 scaled to height 100 floors to 0 px wide; it must stay drawn
        let sizes = [
            Dimensions::new(1, 1000),
            Dimensions::new(1000, 100),
            Dimensions::new(100, 100),
        ];
        let layout = CollageLayout::compute(&sizes, &options(0.0, 0.1, false), None).unwrap();

        assert_eq!(layout.axis, Axis::Horizontal);
        assert_eq!(layout.inner_border, 10);
        let rects: Vec<Rect> = layout.placements.iter().map(|p| p.rect).collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(0, 0, 1, 100),
                Rect::new(11, 0, 1000, 100),
                Rect::new(1021, 0, 100, 100),
            ]
        );
        assert_eq!(layout.full, Dimensions::new(1121, 100));
    }

    #[test]
    fn flat_image_keeps_a_visible_row() {
        let sizes = [Dimensions::new(1000, 1), Dimensions::new(100, 50)];
        let layout = CollageLayout::compute(&sizes, &LayoutOptions::default(), None).unwrap();

        assert_eq!(layout.axis, Axis::Vertical);
        assert_eq!(layout.placements[0].rect, Rect::new(0, 0, 100, 1));
        assert_eq!(layout.placements[1].rect, Rect::new(0, 1, 100, 50));
    }
}
