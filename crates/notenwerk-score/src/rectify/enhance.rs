// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff-line contrast enhancement after rectification.

use image::GrayImage;
use imageproc::contrast::equalize_histogram;
use notenwerk_core::EnhanceConfig;
use notenwerk_core::error::Result;
use tracing::{debug, instrument};

use crate::raster::{LineElement, dilate, invert, stretch_to_full_range};

/// Thicken faint horizontal strokes and stretch the result to full range.
///
/// The equalized image is inverted so ink is bright, dilated along rows
/// `iterations` times with a `kernel_width` element, inverted back and
/// rescaled. Fails with `InvalidConfiguration` for a zero kernel width.
#[instrument(skip(gray, config), fields(width = gray.width(), height = gray.height()))]
pub fn enhance(gray: &GrayImage, config: &EnhanceConfig) -> Result<GrayImage> {
    config.validate()?;

    let equalized = equalize_histogram(gray);
    let element = LineElement::horizontal(config.kernel_width);
    let thickened = dilate(&invert(&equalized), element, config.iterations);
    debug!(kernel = config.kernel_width, iterations = config.iterations, "Strokes thickened");

    Ok(stretch_to_full_range(&invert(&thickened)))
}
