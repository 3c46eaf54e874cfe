//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image is shown by its positional index and the label it was loaded
//! from (a file name, or `image N` for project files). Geometry follows as
//! indented context lines, so the output reads as an inventory of the
//! collage while still showing exactly where each picture lands.
//!
//! # Output Format
//!
//! ## Layout
//!
//! ```text
//! Layout
//!     Horizontal strip, 98x72
//!     Borders: outer 6px, inner 6px
//!     Fit to frame: 49x36 (scale 0.500)
//!
//! Images
//! 001 beach.jpg
//!     Placed: 20x30 at (3, 3)
//!     Crop: 10,10 300x200
//!     Rotation: 90°
//! 002 empty.png
//!     Skipped: zero size
//! ```
//!
//! ## Compose
//!
//! ```text
//! Composed 2 images → collage.png (98x72)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::collage::Collage;
use crate::layout::{Axis, CollageLayout};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line for image `index` (0-based): positional index plus label.
///
/// ```text
/// 001 beach.jpg
/// 002 image 2        // no label supplied
/// ```
fn image_line(index: usize, labels: &[String]) -> String {
    match labels.get(index) {
        Some(label) if !label.is_empty() => format!("{} {}", format_index(index + 1), label),
        _ => format!("{} image {}", format_index(index + 1), index + 1),
    }
}

fn axis_name(axis: Axis) -> &'static str {
    match axis {
        Axis::Horizontal => "Horizontal strip",
        Axis::Vertical => "Vertical stack",
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Labels for images loaded from files: the file name, or the full path
/// when it has none.
pub fn labels_from_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            p.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect()
}

// ============================================================================
// Layout output
// ============================================================================

/// Format the layout of `collage`: canvas summary, then one entry per image.
///
/// Placements are shown in output pixels, i.e. after fit-scaling.
pub fn format_layout_output(
    collage: &Collage,
    layout: &CollageLayout,
    labels: &[String],
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Layout".to_string());
    lines.push(format!(
        "{}{}, {}x{}",
        indent(1),
        axis_name(layout.axis),
        layout.full.width,
        layout.full.height
    ));
    lines.push(format!(
        "{}Borders: outer {}px, inner {}px",
        indent(1),
        layout.outer_border,
        layout.inner_border
    ));
    if layout.is_scaled() {
        lines.push(format!(
            "{}Fit to frame: {}x{} (scale {:.3})",
            indent(1),
            layout.canvas_width(),
            layout.canvas_height(),
            layout.canvas_scale
        ));
    }

    lines.push(String::new());
    lines.push("Images".to_string());
    for (index, view) in collage.views().iter().enumerate() {
        lines.push(image_line(index, labels));
        match layout.scaled_placement(index) {
            Some(rect) => lines.push(format!(
                "{}Placed: {}x{} at ({}, {})",
                indent(1),
                rect.width,
                rect.height,
                rect.x,
                rect.y
            )),
            None => lines.push(format!("{}Skipped: zero size", indent(1))),
        }

        let state = view.state();
        if let Some(crop) = state.crop {
            lines.push(format!(
                "{}Crop: {},{} {}x{}",
                indent(1),
                crop.x,
                crop.y,
                crop.width,
                crop.height
            ));
        }
        if state.rotation != 0 {
            lines.push(format!("{}Rotation: {}°", indent(1), state.rotation));
        }
    }

    lines
}

/// Print layout output to stdout.
pub fn print_layout_output(collage: &Collage, layout: &CollageLayout, labels: &[String]) {
    for line in format_layout_output(collage, layout, labels) {
        println!("{}", line);
    }
}

// ============================================================================
// Compose output
// ============================================================================

/// One-line summary of a finished composition.
pub fn format_compose_summary(layout: &CollageLayout, output: &Path) -> String {
    let count = layout.placements.len();
    format!(
        "Composed {} image{} \u{2192} {} ({}x{})",
        count,
        plural(count),
        output.display(),
        layout.canvas_width(),
        layout.canvas_height()
    )
}

/// Summary for a saved project file.
pub fn format_project_summary(image_count: usize, output: &Path) -> String {
    format!(
        "Saved {} image{} \u{2192} {}",
        image_count,
        plural(image_count),
        output.display()
    )
}

// ============================================================================
// Tests
// ============================================================================
