// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical staff reference from traced curves.

use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::{StaffLinePaths, StaffReference};
use tracing::debug;

/// Evenly spaced target rows for the traced lines.
///
/// The spacing is the median of every adjacent-line gap at every column, so
/// local distortion barely moves it. The grid starts at the median row of the
/// first line. Needs at least two lines.
pub fn build_reference(paths: &StaffLinePaths) -> Result<StaffReference> {
    if paths.line_count() < 2 {
        return Err(NotenwerkError::InvalidInput(format!(
            "at least two staff lines are needed for a reference, got {}",
            paths.line_count()
        )));
    }
    if paths.width() == 0 {
        return Err(NotenwerkError::InvalidInput("staff line paths are empty".into()));
    }

    let mut gaps: Vec<f32> = paths
        .lines()
        .zip(paths.lines().skip(1))
        .flat_map(|(upper, lower)| upper.iter().zip(lower).map(|(a, b)| (b - a).abs()))
        .collect();
    let spacing = median(&mut gaps);
    let first = median(&mut paths.line(0).to_vec());
    debug!(first, spacing, "Staff reference computed");

    StaffReference::new(first, spacing, paths.line_count())
}

/// Median of a non-empty slice; the mean of the middle pair for even lengths.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
