//! Value types shared by every stage of the pipeline.
//!
//! - [`Dimensions`]: a width/height pair in pixels.
//! - [`Rect`]: an axis-aligned pixel rectangle, top-left origin.
//! - [`Affine`]: a 2D affine transform in pixel space.
//!
//! All coordinates use a top-left origin with `y` growing downwards, the
//! convention of [`image::RgbaImage`].

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a bitmap or a layout cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both edges are non-zero.
    pub fn is_drawable(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Height is at least the width.
    pub fn is_portrait_or_square(self) -> bool {
        self.height >= self.width
    }

    /// The same dimensions with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    /// The rectangle at the origin covering these dimensions.
    pub fn bounds(self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn dimensions(self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Exclusive right edge. Computed in `u64` so it cannot overflow.
    pub fn right(self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// `other` lies entirely inside `self`.
    pub fn contains(self, other: Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// The overlapping area of two rectangles.
    ///
    /// Disjoint rectangles produce a zero-sized rectangle positioned at the
    /// nearest point of `self`, never a negative extent.
    pub fn intersection(self, other: Rect) -> Rect {
        let left = (self.x.max(other.x) as u64).min(self.right());
        let top = (self.y.max(other.y) as u64).min(self.bottom());
        let right = self.right().min(other.right()).max(left);
        let bottom = self.bottom().min(other.bottom()).max(top);
        Rect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    }

    /// Scale origin and extent by `factor`, flooring each component.
    pub fn scaled(self, factor: f64) -> Rect {
        let scale = |v: u32| (v as f64 * factor).floor().max(0.0) as u32;
        Rect::new(
            scale(self.x),
            scale(self.y),
            scale(self.width),
            scale(self.height),
        )
    }
}

/// A 2D affine transform.
///
/// A point `(x, y)` maps to
///
/// ```text
/// x' = a·x + c·y + tx
/// y' = b·x + d·y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Affine {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self {
            a,
            b,
            c,
            d,
            tx,
            ty,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// The transform that applies `self` first, then `next`.
    pub fn then(&self, next: Affine) -> Affine {
        Affine::new(
            next.a * self.a + next.c * self.b,
            next.b * self.a + next.d * self.b,
            next.a * self.c + next.c * self.d,
            next.b * self.c + next.d * self.d,
            next.a * self.tx + next.c * self.ty + next.tx,
            next.b * self.tx + next.d * self.ty + next.ty,
        )
    }

    /// `None` for singular transforms.
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Affine::new(
            self.d / det,
            -self.b / det,
            -self.c / det,
            self.a / det,
            (self.c * self.ty - self.d * self.tx) / det,
            (self.b * self.tx - self.a * self.ty) / det,
        ))
    }

    /// Pure scale + translate with positive factors: rectangles stay rectangles.
    pub fn is_axis_aligned(&self) -> bool {
        self.b == 0.0 && self.c == 0.0 && self.a > 0.0 && self.d > 0.0
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of `rect` after mapping.
    pub fn map_rect(&self, rect: Rect) -> (f64, f64, f64, f64) {
        let (x0, y0) = (rect.x as f64, rect.y as f64);
        let (x1, y1) = (rect.right() as f64, rect.bottom() as f64);
        let corners = [
            self.apply(x0, y0),
            self.apply(x1, y0),
            self.apply(x0, y1),
            self.apply(x1, y1),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}
