// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Illumination flattening for photographed pages.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::median_filter;
use tracing::{debug, instrument};

use crate::raster::to_gray;

/// Radius of the median window that estimates the paper background (25x25).
const BACKGROUND_RADIUS: u32 = 12;

/// Divide the page by a smoothed estimate of its background.
///
/// Ink strokes are much thinner than the median window, so the filtered image
/// tracks the paper alone. Dividing by it (background clamped to at least 1)
/// and scaling by 255 flattens shading and vignetting; paper lands near white
/// everywhere while ink keeps its relative darkness.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn correct_illumination(image: &DynamicImage) -> GrayImage {
    let gray = to_gray(image);
    let background = median_filter(&gray, BACKGROUND_RADIUS, BACKGROUND_RADIUS);
    debug!("Background estimated");

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as f32;
        let paper = background.get_pixel(x, y).0[0].max(1) as f32;
        Luma([(value * 255.0 / paper).round().clamp(0.0, 255.0) as u8])
    })
}
