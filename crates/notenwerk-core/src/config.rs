// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every stage receives its settings explicitly; there
// is no shared mutable default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NotenwerkError, Result};

/// Resolution assumed for pages whose source carries no DPI metadata.
pub const DEFAULT_DPI: u32 = 72;

/// Settings for the page normalization stages (DPI, skew, denoise,
/// illumination, binarization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Resolution every page is rescaled to.
    pub target_dpi: u32,
    /// Non-local-means filter strength; 0 disables denoising.
    pub denoise_strength: f32,
    /// Neighbourhood size for adaptive thresholding. Must be odd.
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local weighted mean.
    pub adaptive_c: f32,
    /// Skew estimation settings.
    pub skew: SkewConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_dpi: 300,
            denoise_strength: 10.0,
            adaptive_block_size: 35,
            adaptive_c: 10.0,
            skew: SkewConfig::default(),
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_dpi == 0 {
            return Err(invalid("target_dpi must be a positive integer"));
        }
        if !self.denoise_strength.is_finite() || self.denoise_strength < 0.0 {
            return Err(invalid("denoise_strength must be a finite, non-negative number"));
        }
        validate_block_size(self.adaptive_block_size)?;
        if !self.adaptive_c.is_finite() {
            return Err(invalid("adaptive_c must be finite"));
        }
        self.skew.validate()
    }
}

/// Checks the adaptive-threshold neighbourhood size.
pub fn validate_block_size(block_size: u32) -> Result<()> {
    if block_size == 0 || block_size % 2 == 0 {
        return Err(invalid(format!(
            "adaptive block size must be odd and positive, got {block_size}"
        )));
    }
    Ok(())
}

/// Skew estimation: segment voting followed by a strict Hough fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Segments tilted further than this (degrees) do not vote.
    pub limit_degrees: f32,
    /// Upper bound on the number of segments that vote.
    pub max_segments: usize,
    /// Accumulator votes a line needs before it is walked for segments.
    pub segment_vote_threshold: u32,
    /// Largest run of background tolerated inside one segment (pixels).
    pub max_line_gap: u32,
    /// Accumulator votes required by the fallback pass.
    pub fallback_vote_threshold: u32,
    /// Number of fallback lines considered.
    pub fallback_max_lines: usize,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            limit_degrees: 15.0,
            max_segments: 100,
            segment_vote_threshold: 100,
            max_line_gap: 20,
            fallback_vote_threshold: 150,
            fallback_max_lines: 50,
        }
    }
}

impl SkewConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.limit_degrees.is_finite() || !(0.0..=90.0).contains(&self.limit_degrees) {
            return Err(invalid("skew limit must lie in [0, 90] degrees"));
        }
        if self.max_segments == 0 {
            return Err(invalid("skew max_segments must be positive"));
        }
        Ok(())
    }
}

/// Directional morphology used to isolate staff lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffMaskConfig {
    /// Structuring element length as a fraction of the image width.
    pub horizontal_kernel_ratio: f32,
    /// Lower bound on the structuring element length, if any.
    pub min_line_length: Option<u32>,
}

impl Default for StaffMaskConfig {
    fn default() -> Self {
        Self {
            horizontal_kernel_ratio: 0.15,
            min_line_length: None,
        }
    }
}

impl StaffMaskConfig {
    pub fn validate(&self) -> Result<()> {
        validate_ratio("horizontal_kernel_ratio", self.horizontal_kernel_ratio)
    }
}

/// Margins, headers, staff regions and system grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Pixels darker than this count as page content.
    pub margin_threshold: u8,
    /// Fraction of the page height searched for headers.
    pub max_header_ratio: f32,
    /// Minimum foreground fraction of an accepted header blob.
    pub min_header_confidence: f32,
    pub mask: StaffMaskConfig,
    /// Height of the vertical closing that merges one staff's lines.
    pub band_height: u32,
    /// Smallest accepted staff blob, in pixels.
    pub min_area: u32,
    /// Blobs entirely inside this top fraction of the page are ignored.
    pub ignore_top_ratio: f32,
    /// Largest gap (pixels) between staves of the same system.
    pub max_vertical_gap: i64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_threshold: 245,
            max_header_ratio: 0.2,
            min_header_confidence: 0.3,
            mask: StaffMaskConfig::default(),
            band_height: 11,
            min_area: 100,
            ignore_top_ratio: 0.1,
            max_vertical_gap: 25,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        validate_ratio("max_header_ratio", self.max_header_ratio)?;
        validate_ratio("min_header_confidence", self.min_header_confidence)?;
        validate_ratio("ignore_top_ratio", self.ignore_top_ratio)?;
        if self.band_height == 0 {
            return Err(invalid("band_height must be positive"));
        }
        self.mask.validate()
    }
}

/// How a remap samples its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

/// Staff-line tracing and rectification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Lines per staff (5 for common notation).
    pub expected_lines: usize,
    /// Moving-average window applied to each traced curve.
    pub smoothing_window: usize,
    pub interpolation: Interpolation,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            expected_lines: 5,
            smoothing_window: 5,
            interpolation: Interpolation::Bilinear,
        }
    }
}

impl RectifyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.expected_lines == 0 {
            return Err(invalid("expected_lines must be positive"));
        }
        Ok(())
    }
}

/// Post-rectification staff-line thickening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub kernel_width: u32,
    pub iterations: u32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            kernel_width: 5,
            iterations: 1,
        }
    }
}

impl EnhanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_width == 0 {
            return Err(invalid("enhance kernel_width must be positive"));
        }
        Ok(())
    }
}

/// Everything one page needs, end to end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub layout: LayoutConfig,
    pub rectify: RectifyConfig,
    pub enhance: EnhanceConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.layout.validate()?;
        self.rectify.validate()?;
        self.enhance.validate()
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }
}

fn validate_ratio(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!("{name} must lie in [0, 1], got {value}")));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> NotenwerkError {
    NotenwerkError::InvalidConfiguration(message.into())
}
