// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for staff-geometry normalization.

use serde::{Deserialize, Serialize};

use crate::error::{NotenwerkError, Result};

/// Empty border around the page content, in pixels from each edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

/// Axis-aligned pixel rectangle; `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// A textual blob near the top margin (title, composer, tempo marking).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaderRegion {
    pub bbox: BoundingBox,
    /// Fraction of foreground pixels inside `bbox`, in [0, 1].
    pub confidence: f32,
}

/// Bounding box of one detected staff. Always non-empty on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffRegion {
    top: u32,
    bottom: u32,
    left: u32,
    right: u32,
}

impl StaffRegion {
    /// Build a region, rejecting empty extents.
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Result<Self> {
        if top >= bottom || left >= right {
            return Err(NotenwerkError::InvalidInput(format!(
                "empty staff region: rows {top}..{bottom}, columns {left}..{right}"
            )));
        }
        Ok(Self {
            top,
            bottom,
            left,
            right,
        })
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Signed vertical gap from the bottom of `self` to the top of `next`.
    pub fn gap_to(&self, next: &StaffRegion) -> i64 {
        next.top as i64 - self.bottom as i64
    }
}

/// Staves read together as one unit, sorted by `top`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct System {
    pub staves: Vec<StaffRegion>,
}

impl System {
    pub fn len(&self) -> usize {
        self.staves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staves.is_empty()
    }
}

/// One traced vertical-position curve per staff line, sampled at every
/// column of the traced image.
///
/// Stored line-major: sample `x` of line `i` lives at `i * width + x`. Every
/// sample is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffLinePaths {
    line_count: usize,
    width: usize,
    samples: Vec<f32>,
}

impl StaffLinePaths {
    pub fn from_lines(lines: Vec<Vec<f32>>) -> Result<Self> {
        let line_count = lines.len();
        let width = lines.first().map(Vec::len).unwrap_or(0);
        if lines.iter().any(|line| line.len() != width) {
            return Err(NotenwerkError::InvalidInput(
                "staff line paths must all span the same width".into(),
            ));
        }
        let samples: Vec<f32> = lines.into_iter().flatten().collect();
        if samples.iter().any(|v| !v.is_finite()) {
            return Err(NotenwerkError::InvalidInput(
                "staff line paths contain undefined samples".into(),
            ));
        }
        Ok(Self {
            line_count,
            width,
            samples,
        })
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn line(&self, index: usize) -> &[f32] {
        &self.samples[index * self.width..(index + 1) * self.width]
    }

    pub fn lines(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.line_count).map(move |i| self.line(i))
    }

    pub fn at(&self, line: usize, x: usize) -> f32 {
        self.samples[line * self.width + x]
    }

    /// Largest distance between any traced sample and its canonical row.
    pub fn max_deviation(&self, reference: &StaffReference) -> f32 {
        self.lines()
            .zip(reference.canonical_positions())
            .flat_map(|(line, &target)| line.iter().map(move |&y| (y - target).abs()))
            .fold(0.0, f32::max)
    }
}

/// Canonical, evenly spaced target rows for the lines of one staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffReference {
    canonical_positions: Vec<f32>,
    line_spacing: f32,
}

impl StaffReference {
    /// Grid of `line_count` rows starting at `first` and `line_spacing` apart.
    pub fn new(first: f32, line_spacing: f32, line_count: usize) -> Result<Self> {
        if !line_spacing.is_finite() || line_spacing <= 0.0 {
            return Err(NotenwerkError::InvalidInput(format!(
                "line spacing must be positive, got {line_spacing}"
            )));
        }
        if !first.is_finite() {
            return Err(NotenwerkError::InvalidInput(
                "first canonical line position is undefined".into(),
            ));
        }
        let canonical_positions = (0..line_count)
            .map(|i| first + i as f32 * line_spacing)
            .collect();
        Ok(Self {
            canonical_positions,
            line_spacing,
        })
    }

    pub fn canonical_positions(&self) -> &[f32] {
        &self.canonical_positions
    }

    pub fn line_spacing(&self) -> f32 {
        self.line_spacing
    }

    pub fn line_count(&self) -> usize {
        self.canonical_positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_region_rejects_empty_extent() {
        assert!(StaffRegion::new(10, 10, 0, 5).is_err());
        assert!(StaffRegion::new(0, 5, 7, 3).is_err());
        let region = StaffRegion::new(2, 9, 1, 4).unwrap();
        assert_eq!((region.height(), region.width()), (7, 3));
    }

    #[test]
    fn gap_can_be_negative_for_overlapping_regions() {
        let upper = StaffRegion::new(0, 20, 0, 10).unwrap();
        let lower = StaffRegion::new(15, 30, 0, 10).unwrap();
        assert_eq!(upper.gap_to(&lower), -5);
    }

    #[test]
    fn reference_positions_are_evenly_spaced() {
        let reference = StaffReference::new(10.0, 4.5, 5).unwrap();
        assert_eq!(
            reference.canonical_positions(),
            &[10.0, 14.5, 19.0, 23.5, 28.0]
        );
        assert!(StaffReference::new(10.0, 0.0, 5).is_err());
    }

    #[test]
    fn paths_reject_ragged_or_undefined_lines() {
        assert!(StaffLinePaths::from_lines(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(StaffLinePaths::from_lines(vec![vec![1.0, f32::NAN]]).is_err());
    }

    #[test]
    fn max_deviation_measures_worst_sample() {
        let paths =
            StaffLinePaths::from_lines(vec![vec![10.0, 11.0, 9.5], vec![20.0, 20.0, 22.0]])
                .unwrap();
        let reference = StaffReference::new(10.0, 10.0, 2).unwrap();
        assert!((paths.max_deviation(&reference) - 2.0).abs() < 1e-6);
        assert_eq!(paths.at(1, 2), 22.0);
    }
}
