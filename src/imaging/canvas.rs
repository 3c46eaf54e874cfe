//! A small bitmap canvas with a current transformation matrix.
//!
//! This is the drawing primitive composition is built on: allocate, fill
//! rectangles, draw bitmaps into destination rectangles, concatenate
//! transforms, snapshot. Coordinates passed to drawing calls are in *user
//! space* and are mapped to device pixels through the current transform.
//!
//! Drawing is split in two halves so independent draws can run in parallel:
//! [`Canvas::render_scaled`] only reads the canvas and produces a [`Tile`],
//! and [`Canvas::composite`] blends a finished tile onto the pixels.

use crate::geometry::{Affine, Rect};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Resampling filter for scaled draws.
const DRAW_FILTER: FilterType = FilterType::Lanczos3;

/// Pixels ready to be composited at a device-space offset.
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: i64,
    pub y: i64,
    pub pixels: RgbaImage,
}

/// An RGBA bitmap plus the current transformation matrix (CTM).
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    ctm: Affine,
}

impl Canvas {
    /// A fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            ctm: Affine::IDENTITY,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn ctm(&self) -> Affine {
        self.ctm
    }

    /// Prepend `transform` to the CTM: later user-space coordinates are
    /// transformed by it before the existing CTM applies.
    pub fn concatenate(&mut self, transform: Affine) {
        self.ctm = transform.then(self.ctm);
    }

    /// Source-over fill of a user-space rectangle.
    pub fn fill(&mut self, rect: Rect, color: Rgba<u8>) {
        let Some((x0, y0, x1, y1)) = self.device_box(rect) else {
            return;
        };

        if self.ctm.is_axis_aligned() {
            let block = RgbaImage::from_pixel(x1 - x0, y1 - y0, color);
            imageops::overlay(&mut self.pixels, &block, x0 as i64, y0 as i64);
            return;
        }

        let Some(inverse) = self.ctm.inverse() else {
            return;
        };
        let (rx0, ry0) = (rect.x as f64, rect.y as f64);
        let (rx1, ry1) = (rect.right() as f64, rect.bottom() as f64);
        let mask = RgbaImage::from_fn(x1 - x0, y1 - y0, |tx, ty| {
            let (u, v) = inverse.apply((x0 + tx) as f64 + 0.5, (y0 + ty) as f64 + 0.5);
            if u >= rx0 && u < rx1 && v >= ry0 && v < ry1 {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        self.composite(&Tile {
            x: x0 as i64,
            y: y0 as i64,
            pixels: mask,
        });
    }

    /// Draw `bitmap` stretched into the user-space rectangle `dest`.
    pub fn draw_scaled(&mut self, bitmap: &RgbaImage, dest: Rect) {
        if let Some(tile) = self.render_scaled(bitmap, dest) {
            self.composite(&tile);
        }
    }

    /// Draw `bitmap` at its natural size through the CTM.
    ///
    /// Sampling is nearest-neighbour, which is exact for the quarter-turn and
    /// mirror transforms used for orientation correction.
    pub fn draw_transformed(&mut self, bitmap: &RgbaImage) {
        if let Some(tile) = self.render_transformed(bitmap, self.ctm) {
            self.composite(&tile);
        }
    }

    /// Resample `bitmap` for `dest` without touching the canvas.
    ///
    /// Returns `None` when nothing would be drawn.
    pub fn render_scaled(&self, bitmap: &RgbaImage, dest: Rect) -> Option<Tile> {
        if bitmap.width() == 0 || bitmap.height() == 0 || dest.width == 0 || dest.height == 0 {
            return None;
        }

        if !self.ctm.is_axis_aligned() {
            let placement = Affine::scale(
                dest.width as f64 / bitmap.width() as f64,
                dest.height as f64 / bitmap.height() as f64,
            )
            .then(Affine::translate(dest.x as f64, dest.y as f64))
            .then(self.ctm);
            return self.render_transformed(bitmap, placement);
        }

        let (min_x, min_y, max_x, max_y) = self.ctm.map_rect(dest);
        let (x0, y0) = (min_x.round() as i64, min_y.round() as i64);
        let (x1, y1) = (max_x.round() as i64, max_y.round() as i64);
        let (width, height) = ((x1 - x0).max(0) as u32, (y1 - y0).max(0) as u32);
        if width == 0 || height == 0 {
            return None;
        }

        let pixels = if bitmap.dimensions() == (width, height) {
            bitmap.clone()
        } else {
            imageops::resize(bitmap, width, height, DRAW_FILTER)
        };
        Some(Tile {
            x: x0,
            y: y0,
            pixels,
        })
    }

    /// Map `bitmap` through `transform` by inverse sampling.
    fn render_transformed(&self, bitmap: &RgbaImage, transform: Affine) -> Option<Tile> {
        let inverse = transform.inverse()?;
        let source = Rect::new(0, 0, bitmap.width(), bitmap.height());
        let (x0, y0, x1, y1) = self.clip(transform.map_rect(source))?;

        let mut pixels = RgbaImage::new(x1 - x0, y1 - y0);
        let (bw, bh) = (bitmap.width() as f64, bitmap.height() as f64);
        for y in y0..y1 {
            for x in x0..x1 {
                let (u, v) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
                if u < 0.0 || v < 0.0 || u >= bw || v >= bh {
                    continue;
                }
                let sample = *bitmap.get_pixel(u.floor() as u32, v.floor() as u32);
                pixels.put_pixel(x - x0, y - y0, sample);
            }
        }
        Some(Tile {
            x: x0 as i64,
            y: y0 as i64,
            pixels,
        })
    }

    /// Source-over blend a tile onto the canvas, clipping at the edges.
    pub fn composite(&mut self, tile: &Tile) {
        imageops::overlay(&mut self.pixels, &tile.pixels, tile.x, tile.y);
    }

    /// A copy of the current pixels.
    pub fn snapshot(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Device-space pixel box covered by a user-space rectangle, clipped to the canvas.
    fn device_box(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let (min_x, min_y, max_x, max_y) = self.ctm.map_rect(rect);
        self.clip((min_x.round(), min_y.round(), max_x.round(), max_y.round()))
    }

    fn clip(&self, (min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Option<(u32, u32, u32, u32)> {
        let clamp_x = |v: f64| v.clamp(0.0, self.width() as f64) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, self.height() as f64) as u32;
        let (x0, x1) = (clamp_x(min_x.floor()), clamp_x(max_x.ceil()));
        let (y0, y1) = (clamp_y(min_y.floor()), clamp_y(max_y.ceil()));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1, y1))
    }
}
