//! The collage aggregate and composition.
//!
//! A [`Collage`] owns its ordered [`DerivedView`]s together with the border
//! settings. [`Collage::compose`] lays the views out and draws them:
//!
//! ```text
//! views ──dimensions──▶ CollageLayout ──▶ Canvas (scaled CTM)
//!   │                                        │ fill border color
//!   └──current_result()──▶ rayon: render_scaled per image ──▶ composite
//! ```
//!
//! Every `current_result()` is collected on the calling thread before any
//! parallel work starts; rayon workers only resample finished bitmaps.
//!
//! Structural edits need `&mut self`, so they cannot race a composition.

use crate::color::Color;
use crate::derived::DerivedView;
use crate::geometry::{Affine, Dimensions};
use crate::imaging::operations::approx_average_color;
use crate::imaging::{BackendError, Canvas, ImageBackend, Tile};
use crate::layout::{CollageLayout, LayoutError, LayoutOptions};
use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

#[derive(Debug)]
pub struct Collage {
    views: Vec<DerivedView>,
    outer_border_weight: f64,
    inner_border_weight: f64,
    border_color: Color,
    orientation_swapped: bool,
    average_color: OnceLock<Color>,
}

impl Default for Collage {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Collage {
    /// An empty collage with both borders set to `border_weight` and a white
    /// border color.
    pub fn new(border_weight: f64) -> Self {
        Self {
            views: Vec::new(),
            outer_border_weight: border_weight,
            inner_border_weight: border_weight,
            border_color: Color::WHITE,
            orientation_swapped: false,
            average_color: OnceLock::new(),
        }
    }

    /// An empty collage with the same border and axis settings as `self`.
    pub fn settings_clone(&self) -> Self {
        Self {
            views: Vec::new(),
            outer_border_weight: self.outer_border_weight,
            inner_border_weight: self.inner_border_weight,
            border_color: self.border_color,
            orientation_swapped: self.orientation_swapped,
            average_color: OnceLock::new(),
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn outer_border_weight(&self) -> f64 {
        self.outer_border_weight
    }

    pub fn inner_border_weight(&self) -> f64 {
        self.inner_border_weight
    }

    pub fn set_outer_border_weight(&mut self, weight: f64) {
        self.outer_border_weight = weight;
    }

    pub fn set_inner_border_weight(&mut self, weight: f64) {
        self.inner_border_weight = weight;
    }

    /// Set both border weights at once.
    pub fn set_border_weight(&mut self, weight: f64) {
        self.outer_border_weight = weight;
        self.inner_border_weight = weight;
    }

    pub fn border_color(&self) -> Color {
        self.border_color
    }

    pub fn set_border_color(&mut self, color: Color) {
        self.border_color = color;
    }

    pub fn orientation_swapped(&self) -> bool {
        self.orientation_swapped
    }

    pub fn set_orientation_swapped(&mut self, swapped: bool) {
        self.orientation_swapped = swapped;
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            outer_border_weight: self.outer_border_weight,
            inner_border_weight: self.inner_border_weight,
            orientation_swapped: self.orientation_swapped,
        }
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub fn views(&self) -> &[DerivedView] {
        &self.views
    }

    pub fn view(&self, index: usize) -> Option<&DerivedView> {
        self.views.get(index)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn has_image(&self, index: usize) -> bool {
        index < self.views.len()
    }

    /// Append a view, returning its index.
    pub fn add_image(&mut self, view: DerivedView) -> usize {
        self.views.push(view);
        self.invalidate_average_color();
        self.views.len() - 1
    }

    /// Decode `bytes` and append the image.
    ///
    /// On failure the collage is left exactly as it was.
    pub fn add_image_bytes(
        &mut self,
        backend: &impl ImageBackend,
        bytes: &[u8],
        max_size: Option<u32>,
    ) -> Result<usize, BackendError> {
        let decoded = backend.decode(bytes)?;
        Ok(self.add_image(DerivedView::from_decoded(decoded, max_size)))
    }

    /// Load an image file and append it.
    pub fn add_image_file(
        &mut self,
        backend: &impl ImageBackend,
        path: &Path,
        max_size: Option<u32>,
    ) -> Result<usize, BackendError> {
        let decoded = backend.load(path)?;
        debug!(path = %path.display(), "loaded image");
        Ok(self.add_image(DerivedView::from_decoded(decoded, max_size)))
    }

    /// Replace the view at `index`, or append when `index` is past the end.
    ///
    /// Returns the index the view ended up at.
    pub fn set_image(&mut self, index: usize, view: DerivedView) -> usize {
        self.invalidate_average_color();
        match self.views.get_mut(index) {
            Some(slot) => {
                *slot = view;
                index
            }
            None => {
                self.views.push(view);
                self.views.len() - 1
            }
        }
    }

    /// Remove and return the view at `index`; `None` when out of range.
    pub fn remove_image(&mut self, index: usize) -> Option<DerivedView> {
        if index >= self.views.len() {
            return None;
        }
        self.invalidate_average_color();
        Some(self.views.remove(index))
    }

    /// Exchange two views. Out-of-range indices leave the collage untouched.
    pub fn swap_images(&mut self, a: usize, b: usize) {
        if a < self.views.len() && b < self.views.len() {
            self.views.swap(a, b);
        }
    }

    /// Replace the view at `index` with a copy downscaled to fit `max_size`,
    /// keeping its crop (scaled) and rotation.
    ///
    /// Returns `false` if there is no such view or it already fits.
    pub fn limit_image_size(&mut self, index: usize, max_size: u32) -> bool {
        let Some(smaller) = self.views.get(index).and_then(|v| v.downscaled(max_size)) else {
            return false;
        };
        self.views[index] = smaller;
        true
    }

    // ------------------------------------------------------------------
    // Average color
    // ------------------------------------------------------------------

    /// Mean of the per-image average colors, each image weighted equally.
    ///
    /// Always fully opaque; `None` for an empty collage.
    pub fn average_color(&self) -> Option<Color> {
        if self.views.is_empty() {
            return None;
        }
        Some(*self.average_color.get_or_init(|| {
            let colors: Vec<Color> = self
                .views
                .par_iter()
                .map(|view| approx_average_color(view.upright()))
                .collect();
            let n = colors.len() as f64;
            let sum = |channel: fn(&Color) -> f64| colors.iter().map(channel).sum::<f64>() / n;
            Color::rgb(sum(|c| c.red), sum(|c| c.green), sum(|c| c.blue))
        }))
    }

    fn invalidate_average_color(&mut self) {
        self.average_color = OnceLock::new();
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// Lay out the current views.
    pub fn layout(&self, frame: Option<Dimensions>) -> Result<CollageLayout, LayoutError> {
        let sizes: Vec<Dimensions> = self.views.iter().map(DerivedView::dimensions).collect();
        CollageLayout::compute(&sizes, &self.layout_options(), frame)
    }

    /// Draw the collage, fitted into `frame` when one is given.
    pub fn try_compose(&self, frame: Option<Dimensions>) -> Result<RgbaImage, ComposeError> {
        let started = Instant::now();
        let layout = self.layout(frame)?;

        let mut canvas = Canvas::new(layout.canvas_width(), layout.canvas_height());
        if layout.is_scaled() {
            canvas.concatenate(Affine::scale(layout.canvas_scale, layout.canvas_scale));
        }
        canvas.fill(layout.full.bounds(), self.border_color.to_rgba8());

        let sources: Vec<_> = layout
            .placements
            .iter()
            .map(|p| (self.views[p.index].current_result(), p.rect))
            .collect();
        let tiles: Vec<Tile> = sources
            .par_iter()
            .filter_map(|(bitmap, dest)| canvas.render_scaled(bitmap, *dest))
            .collect();
        for tile in &tiles {
            canvas.composite(tile);
        }

        debug!(
            images = tiles.len(),
            width = canvas.width(),
            height = canvas.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "composed collage"
        );
        Ok(canvas.into_image())
    }

    /// Like [`try_compose`](Self::try_compose), reporting any failure as `None`.
    pub fn compose(&self, frame: Option<Dimensions>) -> Option<RgbaImage> {
        match self.try_compose(frame) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!(error = %e, "no composite produced");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::imaging::DecodedImage;
    use crate::imaging::backend::tests::MockBackend;
    use crate::orientation::OrientationTag;
    use crate::test_helpers::{BLUE, GREEN, RED, WHITE, assert_color_near, quadrants, solid};

    fn view(width: u32, height: u32, color: image::Rgba<u8>) -> DerivedView {
        DerivedView::from_upright(solid(width, height, color))
    }

    fn decoded(width: u32, height: u32) -> DecodedImage {
        DecodedImage {
            pixels: solid(width, height, RED),
            orientation: OrientationTag::Up,
        }
    }

    // =========================================================================
    // Image list tests
    // =========================================================================

    #[test]
    fn add_returns_indices_in_order() {
        let mut collage = Collage::new(0.1);
        assert_eq!(collage.add_image(view(10, 10, RED)), 0);
        assert_eq!(collage.add_image(view(10, 10, BLUE)), 1);
        assert_eq!(collage.len(), 2);
        assert!(collage.has_image(1));
        assert!(!collage.has_image(2));
    }

    #[test]
    fn set_image_replaces_or_appends() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(10, 10, RED));
        assert_eq!(collage.set_image(0, view(20, 10, BLUE)), 0);
        assert_eq!(collage.view(0).unwrap().width(), 20);

        assert_eq!(collage.set_image(7, view(30, 10, GREEN)), 1);
        assert_eq!(collage.len(), 2);
    }

    #[test]
    fn remove_out_of_range_is_a_no_op() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(10, 10, RED));
        assert!(collage.remove_image(3).is_none());
        assert_eq!(collage.len(), 1);
        assert!(collage.remove_image(0).is_some());
        assert!(collage.is_empty());
    }

    #[test]
    fn swap_reorders_and_ignores_bad_indices() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(10, 10, RED));
        collage.add_image(view(20, 10, BLUE));
        collage.swap_images(0, 1);
        assert_eq!(collage.view(0).unwrap().width(), 20);
        collage.swap_images(0, 5);
        assert_eq!(collage.view(0).unwrap().width(), 20);
    }

    #[test]
    fn add_image_bytes_uses_backend() {
        let backend = MockBackend::with_decodes(vec![Ok(decoded(40, 30))]);
        let mut collage = Collage::new(0.0);
        let index = collage.add_image_bytes(&backend, b"jpeg", None).unwrap();
        assert_eq!(index, 0);
        assert_eq!(collage.view(0).unwrap().dimensions(), Dimensions::new(40, 30));
    }

    #[test]
    fn add_image_bytes_honours_max_size() {
        let backend = MockBackend::with_decodes(vec![Ok(decoded(400, 300))]);
        let mut collage = Collage::new(0.0);
        collage.add_image_bytes(&backend, b"jpeg", Some(100)).unwrap();
        assert_eq!(collage.view(0).unwrap().dimensions(), Dimensions::new(100, 75));
    }

    #[test]
    fn decode_failure_leaves_collage_untouched() {
        let backend = MockBackend::with_decodes(vec![Err("truncated".into())]);
        let mut collage = Collage::new(0.0);
        collage.add_image(view(10, 10, RED));
        let before = collage.average_color();

        let result = collage.add_image_bytes(&backend, b"broken", None);
        assert!(matches!(result, Err(BackendError::Decode(_))));
        assert_eq!(collage.len(), 1);
        assert!(collage.average_color.get().is_some());
        assert_eq!(collage.average_color(), before);
    }

    #[test]
    fn limit_image_size_keeps_state() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(400, 200, RED));
        collage.view(0).unwrap().set_state(Some(Rect::new(0, 0, 100, 100)), 180);

        assert!(collage.limit_image_size(0, 100));
        let limited = collage.view(0).unwrap();
        assert_eq!(limited.upright_dimensions(), Dimensions::new(100, 50));
        assert_eq!(limited.state().crop, Some(Rect::new(0, 0, 25, 25)));
        assert_eq!(limited.state().rotation, 180);

        assert!(!collage.limit_image_size(0, 100));
        assert!(!collage.limit_image_size(9, 100));
    }

    #[test]
    fn settings_clone_copies_settings_only() {
        let mut collage = Collage::new(0.2);
        collage.set_inner_border_weight(0.05);
        collage.set_border_color(Color::BLACK);
        collage.set_orientation_swapped(true);
        collage.add_image(view(10, 10, RED));

        let copy = collage.settings_clone();
        assert!(copy.is_empty());
        assert_eq!(copy.layout_options(), collage.layout_options());
        assert_eq!(copy.border_color(), Color::BLACK);
    }

    // =========================================================================
    // Average color tests
    // =========================================================================

    #[test]
    fn average_color_empty_is_none() {
        assert_eq!(Collage::new(0.0).average_color(), None);
    }

    #[test]
    fn average_color_single_image_is_exact() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(30, 20, BLUE));
        let expected = approx_average_color(collage.view(0).unwrap().upright());
        assert_eq!(collage.average_color(), Some(expected));

        collage.add_image(view(5, 50, BLUE));
        assert_eq!(collage.average_color(), Some(expected));
    }

    #[test]
    fn average_color_weights_images_equally() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(100, 100, RED));
        collage.add_image(view(2, 2, BLUE));
        let avg = collage.average_color().unwrap();
        assert_eq!((avg.red, avg.green, avg.blue, avg.alpha), (0.5, 0.0, 0.5, 1.0));
    }

    #[test]
    fn average_color_cache_invalidation() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(10, 10, RED));
        collage.add_image(view(10, 10, BLUE));
        collage.average_color();

        collage.swap_images(0, 1);
        assert!(collage.average_color.get().is_some());

        collage.set_image(0, view(10, 10, RED));
        assert!(collage.average_color.get().is_none());
        assert_eq!(collage.average_color(), Some(Color::rgb(1.0, 0.0, 0.0)));

        collage.remove_image(1);
        assert!(collage.average_color.get().is_none());
    }

    // =========================================================================
    // Composition tests
    // =========================================================================

    #[test]
    fn compose_empty_is_none() {
        let collage = Collage::new(0.1);
        assert!(collage.compose(None).is_none());
        assert_eq!(
            collage.try_compose(None).unwrap_err(),
            ComposeError::Layout(LayoutError::EmptyCollage)
        );
    }

    #[test]
    fn compose_all_undrawable_is_none() {
        let mut collage = Collage::new(0.1);
        collage.add_image(DerivedView::from_upright(RgbaImage::new(0, 10)));
        assert!(collage.compose(None).is_none());
        assert_eq!(
            collage.try_compose(None).unwrap_err(),
            ComposeError::Layout(LayoutError::NoDrawableImages)
        );
    }

    #[test]
    fn compose_horizontal_with_borders() {
        let mut collage = Collage::new(0.1);
        collage.add_image(view(100, 100, RED));
        collage.add_image(view(100, 100, BLUE));

        let image = collage.compose(None).unwrap();
        assert_eq!(image.dimensions(), (230, 120));
        assert_eq!(*image.get_pixel(5, 5), WHITE);
        assert_eq!(*image.get_pixel(50, 50), RED);
        assert_eq!(*image.get_pixel(115, 50), WHITE);
        assert_eq!(*image.get_pixel(150, 50), BLUE);
        assert_eq!(*image.get_pixel(229, 119), WHITE);
    }

    #[test]
    fn compose_vertical_puts_first_image_on_top() {
        let mut collage = Collage::new(0.0);
        collage.set_border_color(Color::BLACK);
        collage.add_image(view(100, 50, RED));
        collage.add_image(view(100, 50, BLUE));

        let image = collage.compose(None).unwrap();
        assert_eq!(image.dimensions(), (100, 100));
        assert_eq!(*image.get_pixel(50, 10), RED);
        assert_eq!(*image.get_pixel(50, 90), BLUE);
    }

    #[test]
    fn compose_scales_into_frame() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(100, 100, RED));
        collage.add_image(view(100, 100, BLUE));

        let image = collage.compose(Some(Dimensions::new(100, 100))).unwrap();
        assert_eq!(image.dimensions(), (100, 50));
        assert_color_near(*image.get_pixel(20, 25), RED);
        assert_color_near(*image.get_pixel(80, 25), BLUE);
    }

    #[test]
    fn compose_uses_crop_and_rotation() {
        let mut collage = Collage::new(0.0);
        collage.add_image(DerivedView::from_upright(quadrants(40, 40)));
        // Clockwise turn moves red to the top-right quadrant
        collage.view(0).unwrap().set_state(Some(Rect::new(20, 0, 20, 20)), 90);

        let image = collage.compose(None).unwrap();
        assert_eq!(image.dimensions(), (20, 20));
        assert!(image.pixels().all(|p| *p == RED));
    }

    #[test]
    fn compose_skips_undrawable_views() {
        let mut collage = Collage::new(0.0);
        collage.add_image(view(50, 50, RED));
        collage.add_image(DerivedView::from_upright(RgbaImage::new(10, 0)));
        let image = collage.compose(None).unwrap();
        assert_eq!(image.dimensions(), (50, 50));
    }

    #[test]
    fn translucent_border_color_is_kept() {
        let mut collage = Collage::new(0.5);
        collage.set_border_color(Color::new(0.0, 0.0, 0.0, 0.0));
        collage.add_image(view(10, 10, RED));
        let image = collage.compose(None).unwrap();
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(*image.get_pixel(10, 10), RED);
    }

    #[test]
    fn compose_draws_thin_image_at_one_pixel() {
        let mut collage = Collage::new(0.0);
        collage.set_inner_border_weight(0.1);
        collage.add_image(view(1, 1000, RED));
        collage.add_image(view(100, 100, BLUE));

        let image = collage.compose(None).unwrap();
        // 1 px of red, a 10 px gap, then the 100 px square
        assert_eq!(image.dimensions(), (111, 100));
        assert_color_near(*image.get_pixel(0, 50), RED);
        assert_eq!(*image.get_pixel(5, 50), WHITE);
        assert_eq!(*image.get_pixel(11, 50), BLUE);
    }
}
