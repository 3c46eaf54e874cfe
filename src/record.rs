//! Exchange representation of a collage.
//!
//! A project file is JSON:
//!
//! ```json
//! {
//!   "orientationSwapped": false,
//!   "outerBorderWeight": 0.05,
//!   "innerBorderWeight": 0.05,
//!   "borderColor": { "red": 1.0, "green": 1.0, "blue": 1.0, "alpha": 1.0 },
//!   "images": [
//!     { "sourceImageBytes": "iVBORw0KGgo…", "cropRect": { "x": 0, "y": 0, "width": 640, "height": 480 }, "rotationDegrees": 90 }
//!   ]
//! }
//! ```
//!
//! Image bytes are the *upright* bitmap encoded as PNG, base64 in the JSON.
//! Restoring decodes them and re-applies the crop and rotation; derived
//! bitmaps are recomputed, never stored.

use crate::collage::Collage;
use crate::color::Color;
use crate::derived::DerivedView;
use crate::geometry::Rect;
use crate::imaging::{BackendError, ImageBackend, OutputFormat};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Backend(#[from] BackendError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One image with its crop and rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    #[serde(with = "base64_bytes")]
    pub source_image_bytes: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_rect: Option<Rect>,
    #[serde(default)]
    pub rotation_degrees: i32,
}

impl ViewRecord {
    pub fn capture(view: &DerivedView, backend: &impl ImageBackend) -> Result<Self, BackendError> {
        let state = view.state();
        Ok(Self {
            source_image_bytes: backend.encode(view.upright(), OutputFormat::Png)?,
            crop_rect: state.crop,
            rotation_degrees: state.rotation,
        })
    }

    pub fn restore(&self, backend: &impl ImageBackend) -> Result<DerivedView, BackendError> {
        let decoded = backend.decode(&self.source_image_bytes)?;
        let view = DerivedView::from_decoded(decoded, None);
        view.set_state(self.crop_rect, self.rotation_degrees);
        Ok(view)
    }
}

/// A whole collage: settings plus the ordered images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollageRecord {
    pub orientation_swapped: bool,
    pub outer_border_weight: f64,
    pub inner_border_weight: f64,
    pub border_color: Color,
    pub images: Vec<ViewRecord>,
}

impl CollageRecord {
    /// Snapshot a collage. Images are encoded in parallel.
    pub fn capture(collage: &Collage, backend: &impl ImageBackend) -> Result<Self, BackendError> {
        let images = collage
            .views()
            .par_iter()
            .map(|view| ViewRecord::capture(view, backend))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            orientation_swapped: collage.orientation_swapped(),
            outer_border_weight: collage.outer_border_weight(),
            inner_border_weight: collage.inner_border_weight(),
            border_color: collage.border_color(),
            images,
        })
    }

    /// Rebuild a collage. Images are decoded in parallel.
    pub fn restore(&self, backend: &impl ImageBackend) -> Result<Collage, BackendError> {
        let views = self
            .images
            .par_iter()
            .map(|record| record.restore(backend))
            .collect::<Result<Vec<_>, _>>()?;

        let mut collage = Collage::new(self.outer_border_weight);
        collage.set_inner_border_weight(self.inner_border_weight);
        collage.set_border_color(self.border_color);
        collage.set_orientation_swapped(self.orientation_swapped);
        for view in views {
            collage.add_image(view);
        }
        Ok(collage)
    }

    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Write `collage` as a project file.
pub fn save_project(
    collage: &Collage,
    backend: &impl ImageBackend,
    path: &Path,
) -> Result<(), RecordError> {
    let record = CollageRecord::capture(collage, backend)?;
    std::fs::write(path, record.to_json()?)?;
    debug!(path = %path.display(), images = record.images.len(), "saved project");
    Ok(())
}

/// Read a project file back into a collage.
pub fn load_project(path: &Path, backend: &impl ImageBackend) -> Result<Collage, RecordError> {
    let content = std::fs::read_to_string(path)?;
    let record = CollageRecord::from_json(&content)?;
    debug!(path = %path.display(), images = record.images.len(), "loaded project");
    Ok(record.restore(backend)?)
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
