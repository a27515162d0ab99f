// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff-line isolation by horizontal opening.

use image::GrayImage;
use notenwerk_core::StaffMaskConfig;
use tracing::{debug, instrument};

use crate::raster::{LineElement, dilate, erode, otsu_binarize_inverted};

/// Shortest structuring element ever used, in pixels.
const MIN_KERNEL_LENGTH: u32 = 5;

/// Length of the horizontal element for a page `width` pixels wide.
pub fn kernel_length(width: u32, config: &StaffMaskConfig) -> u32 {
    let scaled = (width as f32 * config.horizontal_kernel_ratio).round() as u32;
    let length = scaled.max(MIN_KERNEL_LENGTH);
    config.min_line_length.map_or(length, |min| length.max(min))
}

/// Binary mask (255 = staff line) of the long horizontal strokes on a page.
///
/// Ink is found with an inverted Otsu threshold, then opened with a
/// horizontal line element: anything shorter than the element (noteheads,
/// stems, text) erodes away, and the surviving strokes dilate back to their
/// original extent.
#[instrument(skip(gray, config), fields(width = gray.width(), height = gray.height()))]
pub fn extract_mask(gray: &GrayImage, config: &StaffMaskConfig) -> GrayImage {
    let (binary, level) = otsu_binarize_inverted(gray);
    let element = LineElement::horizontal(kernel_length(gray.width(), config));
    debug!(level, kernel = element.length, "Opening staff-line mask");

    dilate(&erode(&binary, element), element, 1)
}
