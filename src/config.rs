//! Configuration module.
//!
//! Handles loading, validating, and merging `tych.toml` files. Stock
//! defaults are overridden by a user file, which only needs the keys it
//! wants to change. Command-line flags override both.
//!
//! ## Config File Location
//!
//! `tych` looks for `tych.toml` in the working directory, or reads the file
//! given with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [border]
//! outer_weight = 0.05       # Outer border, fraction of the minimum dimension
//! inner_weight = 0.05       # Gap between images, fraction of the minimum dimension
//! color = "#ffffff"         # "#rgb", "#rrggbb" or "#rrggbbaa"
//!
//! [layout]
//! swap_orientation = false  # Invert the automatic strip/stack choice
//!
//! [output]
//! max_width = 0             # Fit the collage into this frame (0 = unbounded)
//! max_height = 0
//! max_source_size = 0       # Downscale sources on load (0 = keep full size)
//!
//! [processing]
//! max_threads = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::collage::Collage;
use crate::color::Color;
use crate::geometry::Dimensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tych.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `tych.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TychConfig {
    /// Border sizes and color.
    pub border: BorderConfig,
    /// Axis selection.
    pub layout: LayoutConfig,
    /// Output frame and source size limits.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl TychConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, weight) in [
            ("border.outer_weight", self.border.outer_weight),
            ("border.inner_weight", self.border.inner_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a non-negative number"
                )));
            }
        }
        Color::from_hex(&self.border.color)
            .map_err(|e| ConfigError::Validation(format!("border.color: {e}")))?;
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn border_color(&self) -> Result<Color, ConfigError> {
        Color::from_hex(&self.border.color)
            .map_err(|e| ConfigError::Validation(format!("border.color: {e}")))
    }

    /// An empty collage carrying the configured border and axis settings.
    pub fn collage(&self) -> Result<Collage, ConfigError> {
        let mut collage = Collage::new(self.border.outer_weight);
        collage.set_inner_border_weight(self.border.inner_weight);
        collage.set_border_color(self.border_color()?);
        collage.set_orientation_swapped(self.layout.swap_orientation);
        Ok(collage)
    }

    /// The output frame, if any axis is bounded.
    ///
    /// An unset (zero) axis is treated as unbounded.
    pub fn frame(&self) -> Option<Dimensions> {
        let bound = |v: u32| if v == 0 { u32::MAX } else { v };
        match (self.output.max_width, self.output.max_height) {
            (0, 0) => None,
            (w, h) => Some(Dimensions::new(bound(w), bound(h))),
        }
    }

    /// Longest source edge to keep on load, if limited.
    pub fn max_source_size(&self) -> Option<u32> {
        match self.output.max_source_size {
            0 => None,
            n => Some(n),
        }
    }
}

/// Border settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BorderConfig {
    /// Outer border as a fraction of the minimum image dimension.
    pub outer_weight: f64,
    /// Gap between images as a fraction of the minimum image dimension.
    pub inner_weight: f64,
    /// Border color as hex.
    pub color: String,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            outer_weight: 0.05,
            inner_weight: 0.05,
            color: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Stack mostly-portrait sets and line up mostly-landscape sets instead.
    pub swap_orientation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Maximum output width; `0` leaves the width unbounded.
    pub max_width: u32,
    /// Maximum output height; `0` leaves the height unbounded.
    pub max_height: u32,
    /// Downscale sources whose longer edge exceeds this on load; `0` disables.
    pub max_source_size: u32,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of rayon worker threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(TychConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but
/// is not valid TOML.
pub fn load_raw_config(file: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !file.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(file)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<TychConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: TychConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `tych.toml` from `dir`, falling back to stock defaults when absent.
pub fn load_config(dir: &Path) -> Result<TychConfig, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILE_NAME))?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Load an explicitly named config file. A missing file is an error.
pub fn load_config_file(file: &Path) -> Result<TychConfig, ConfigError> {
    let content = fs::read_to_string(file)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Returns a fully-commented stock `tych.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# tych Configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as tych.toml in the directory you run tych from,
# or pass it explicitly with --config. Command-line flags win over
# anything set here. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Borders
# ---------------------------------------------------------------------------
[border]
# Border sizes are fractions of the collage's minimum dimension: the
# smallest image height for side-by-side strips, the smallest width for
# vertical stacks. 0.05 on a 2000px strip gives a 100px border.
outer_weight = 0.05
inner_weight = 0.05

# Border color: "#rgb", "#rrggbb", or "#rrggbbaa" for translucent borders.
color = "#ffffff"

# ---------------------------------------------------------------------------
# Layout
# ---------------------------------------------------------------------------
[layout]
# Mostly portrait sets go side by side, mostly landscape sets are stacked.
# Set to true to invert that choice.
swap_orientation = false

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Fit the finished collage inside max_width x max_height, never enlarging.
# 0 leaves that axis unbounded.
max_width = 0
max_height = 0

# Downscale each source on load so its longer edge is at most this many
# pixels. Speeds up work on large camera files. 0 keeps full resolution.
max_source_size = 0

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel workers. Omit for auto (= number of CPU cores).
# Values larger than the core count are clamped down.
# max_threads = 4
"##
}
