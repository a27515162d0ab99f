// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale conversion and global thresholding.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};

/// Convert any page raster to 8-bit luma. Grayscale input is copied.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Inverted Otsu binarization: ink (`<=` the Otsu level) becomes 255 on a 0
/// background. Returns the mask and the level.
pub fn otsu_binarize_inverted(gray: &GrayImage) -> (GrayImage, u8) {
    let level = otsu_level(gray);
    (threshold(gray, level, ThresholdType::BinaryInverted), level)
}

pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut inverted = gray.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// Linearly rescale intensities so the darkest pixel maps to 0 and the
/// brightest to 255. A constant image is returned unchanged.
pub fn stretch_to_full_range(gray: &GrayImage) -> GrayImage {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if gray.width() == 0 || gray.height() == 0 || min >= max {
        return gray.clone();
    }
    let scale = 255.0 / (max - min) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = (gray.get_pixel(x, y).0[0] - min) as f32 * scale;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
