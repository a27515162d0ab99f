// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Curve-following rectification of one staff region.
//
// For every output row, the pair of canonical lines bracketing it (including
// one virtual line a spacing above the first and below the last) gives a
// fractional position. The same fraction between the matching pair of traced
// curves, at the same column, is the source row. Rows therefore follow the
// local warp rather than one global transform.

use image::{GrayImage, Luma};
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::{Interpolation, RectifyConfig, StaffLinePaths, StaffReference};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use crate::raster::{Border, RemapGrid, remap};
use crate::rectify::reference::build_reference;
use crate::rectify::tracer::trace_lines;

/// A staff region with its lines straightened onto the reference grid.
#[derive(Debug, Clone, Serialize)]
pub struct RectifiedStaff {
    #[serde(skip)]
    pub image: GrayImage,
    pub reference: StaffReference,
    /// Curves traced on the input mask, before rectification.
    pub line_paths: StaffLinePaths,
    /// The input mask carried through the same map, when requested.
    #[serde(skip)]
    pub mask: Option<GrayImage>,
}

/// Straighten the staff in `image`, using `mask` to trace its lines.
#[instrument(skip(image, mask, config), fields(width = image.width(), height = image.height()))]
pub fn rectify(image: &GrayImage, mask: &GrayImage, config: &RectifyConfig) -> Result<RectifiedStaff> {
    let (grid, reference, line_paths) = prepare(image, mask, config)?;
    let rectified = remap(image, &grid, config.interpolation, Border::Replicate);
    info!(spacing = reference.line_spacing(), "Staff region rectified");
    Ok(RectifiedStaff {
        image: rectified,
        reference,
        line_paths,
        mask: None,
    })
}

/// Like [`rectify`], and also resample the mask: nearest-neighbour with a
/// zero border, so it stays binary (0 or 255).
#[instrument(skip(image, mask, config), fields(width = image.width(), height = image.height()))]
pub fn rectify_with_mask(
    image: &GrayImage,
    mask: &GrayImage,
    config: &RectifyConfig,
) -> Result<RectifiedStaff> {
    let (grid, reference, line_paths) = prepare(image, mask, config)?;
    let rectified = remap(image, &grid, config.interpolation, Border::Replicate);
    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 { Luma([255u8]) } else { Luma([0u8]) }
    });
    let warped_mask = remap(&binary, &grid, Interpolation::Nearest, Border::Constant(Luma([0u8])));
    info!(spacing = reference.line_spacing(), "Staff region and mask rectified");
    Ok(RectifiedStaff {
        image: rectified,
        reference,
        line_paths,
        mask: Some(warped_mask),
    })
}

/// Rectify many `(image, mask)` pairs in parallel; one result per pair, in
/// input order.
pub fn batch_rectify(
    staffs: &[(GrayImage, GrayImage)],
    config: &RectifyConfig,
) -> Vec<Result<RectifiedStaff>> {
    staffs
        .par_iter()
        .map(|(image, mask)| rectify(image, mask, config))
        .collect()
}

fn prepare(
    image: &GrayImage,
    mask: &GrayImage,
    config: &RectifyConfig,
) -> Result<(RemapGrid, StaffReference, StaffLinePaths)> {
    if image.dimensions() != mask.dimensions() {
        return Err(NotenwerkError::InvalidInput(format!(
            "image is {:?} but mask is {:?}",
            image.dimensions(),
            mask.dimensions()
        )));
    }
    let line_paths = trace_lines(mask, config.expected_lines, config.smoothing_window)?;
    let reference = build_reference(&line_paths)?;
    let grid = rectification_map(&line_paths, &reference, image.height());
    Ok((grid, reference, line_paths))
}

/// Source coordinates for every output pixel of a `paths.width()` by
/// `height` staff.
pub fn rectification_map(paths: &StaffLinePaths, reference: &StaffReference, height: u32) -> RemapGrid {
    let width = paths.width();
    let spacing = reference.line_spacing();
    let canonical = reference.canonical_positions();
    let (Some(&first), Some(&last)) = (canonical.first(), canonical.last()) else {
        return RemapGrid::from_fn(width as u32, height, |x, y| (x as f32, y as f32));
    };

    let mut targets = Vec::with_capacity(canonical.len() + 2);
    targets.push(first - spacing);
    targets.extend_from_slice(canonical);
    targets.push(last + spacing);
    let last_bracket = targets.len() - 2;

    let bottom = height.saturating_sub(1) as f32;
    let mut rows_by_column = Vec::with_capacity(width * height as usize);
    let mut sources = vec![0.0f32; targets.len()];

    for x in 0..width {
        let traced = paths.lines().map(|line| line[x]);
        sources[0] = (paths.at(0, x) - spacing).max(0.0);
        for (slot, y) in sources[1..].iter_mut().zip(traced) {
            *slot = y;
        }
        sources[last_bracket + 1] = (paths.at(paths.line_count() - 1, x) + spacing).min(bottom);

        for y in 0..height {
            let y = y as f32;
            let bracket = targets
                .partition_point(|&target| target <= y)
                .saturating_sub(1)
                .min(last_bracket);
            let (dst_start, dst_end) = (targets[bracket], targets[bracket + 1]);
            let (src_start, src_end) = (sources[bracket], sources[bracket + 1]);
            let source = if dst_end == dst_start {
                src_start
            } else {
                let ratio = (y - dst_start) / (dst_end - dst_start);
                src_start + ratio * (src_end - src_start)
            };
            rows_by_column.push(source);
        }
    }

    RemapGrid::from_column_rows(width as u32, height, &rows_by_column)
}
