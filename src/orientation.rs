//! EXIF orientation tags and the transforms that make a bitmap upright.
//!
//! Cameras store pixels in sensor order and record how the picture should be
//! turned for display. [`OrientationTag::transform`] returns the affine
//! transform that redraws the raw bitmap the right way up, together with the
//! canvas size it needs.
//!
//! ```text
//!     1: Up          2: UpMirrored   3: Down         4: DownMirrored
//!     ┌───┐          ┌───┐           ┌───┐           ┌───┐
//!     │ F │          │ Ꟊ │           │   │           │   │
//!     │   │          │   │           │ Ꟊ │           │ F │
//!     └───┘          └───┘           └───┘           └───┘
//!
//!     5: LeftMirrored 6: Right       7: RightMirrored 8: Left
//!     ┌────┐         ┌────┐          ┌────┐           ┌────┐
//!     │ F  │         │  F │          │  Ꟊ │           │ Ꟊ  │
//!     └────┘         └────┘          └────┘           └────┘
//! ```
//!
//! Matrices are expressed in top-left pixel space; see
//! [`Affine`](crate::geometry::Affine) for the convention.

use crate::geometry::{Affine, Dimensions};
use serde::{Deserialize, Serialize};

/// One of the eight canonical EXIF orientation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrientationTag {
    /// EXIF 1. Already upright.
    #[default]
    Up,
    /// EXIF 2. Mirrored left to right.
    UpMirrored,
    /// EXIF 3. Upside down.
    Down,
    /// EXIF 4. Mirrored top to bottom.
    DownMirrored,
    /// EXIF 5. Reflected over the main diagonal.
    LeftMirrored,
    /// EXIF 6. Needs a quarter turn clockwise.
    Right,
    /// EXIF 7. Reflected over the anti-diagonal.
    RightMirrored,
    /// EXIF 8. Needs a quarter turn counter-clockwise.
    Left,
}

impl OrientationTag {
    /// Map an EXIF orientation value. Anything outside `1..=8` is treated as upright.
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::UpMirrored,
            3 => Self::Down,
            4 => Self::DownMirrored,
            5 => Self::LeftMirrored,
            6 => Self::Right,
            7 => Self::RightMirrored,
            8 => Self::Left,
            _ => Self::Up,
        }
    }

    pub fn to_exif(self) -> u8 {
        match self {
            Self::Up => 1,
            Self::UpMirrored => 2,
            Self::Down => 3,
            Self::DownMirrored => 4,
            Self::LeftMirrored => 5,
            Self::Right => 6,
            Self::RightMirrored => 7,
            Self::Left => 8,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Self::Up
    }

    /// The four quarter-turn variants produce a canvas with width and height exchanged.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }

    /// Dimensions of the upright bitmap for a raw bitmap of `source` size.
    pub fn upright_dimensions(self, source: Dimensions) -> Dimensions {
        if self.swaps_axes() {
            source.swapped()
        } else {
            source
        }
    }

    /// Transform mapping raw pixel coordinates onto the upright canvas.
    ///
    /// `source` is the size of the raw (pre-correction) bitmap.
    pub fn transform(self, source: Dimensions) -> Affine {
        let w = source.width as f64;
        let h = source.height as f64;
        match self {
            Self::Up => Affine::IDENTITY,
            Self::UpMirrored => Affine::new(-1.0, 0.0, 0.0, 1.0, w, 0.0),
            Self::Down => Affine::new(-1.0, 0.0, 0.0, -1.0, w, h),
            Self::DownMirrored => Affine::new(1.0, 0.0, 0.0, -1.0, 0.0, h),
            Self::LeftMirrored => Affine::new(0.0, 1.0, 1.0, 0.0, 0.0, 0.0),
            Self::Right => Affine::new(0.0, 1.0, -1.0, 0.0, h, 0.0),
            Self::RightMirrored => Affine::new(0.0, -1.0, -1.0, 0.0, h, w),
            Self::Left => Affine::new(0.0, -1.0, 1.0, 0.0, 0.0, w),
        }
    }
}

impl From<image::metadata::Orientation> for OrientationTag {
    fn from(orientation: image::metadata::Orientation) -> Self {
        use image::metadata::Orientation;
        match orientation {
            Orientation::NoTransforms => Self::Up,
            Orientation::FlipHorizontal => Self::UpMirrored,
            Orientation::Rotate180 => Self::Down,
            Orientation::FlipVertical => Self::DownMirrored,
            Orientation::Rotate90FlipH => Self::LeftMirrored,
            Orientation::Rotate90 => Self::Right,
            Orientation::Rotate270FlipH => Self::RightMirrored,
            Orientation::Rotate270 => Self::Left,
        }
    }
}
