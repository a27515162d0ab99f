// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive binarization against a Gaussian-weighted local mean.

use image::{GrayImage, Luma};
use imageproc::filter::separable_filter_equal;
use notenwerk_core::config::validate_block_size;
use notenwerk_core::error::Result;
use tracing::{debug, instrument};

/// Per-pixel threshold: the Gaussian-weighted mean of the `block_size` x
/// `block_size` neighbourhood minus `c`.
///
/// Pixels brighter than their threshold become white (255), the rest black
/// (0). Fails with `InvalidConfiguration` for an even or zero `block_size`.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn adaptive_binarize(gray: &GrayImage, block_size: u32, c: f32) -> Result<GrayImage> {
    validate_block_size(block_size)?;

    let kernel = gaussian_kernel(block_size);
    let local_mean = separable_filter_equal(gray, &kernel);
    debug!(taps = kernel.len(), "Local mean computed");

    Ok(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - c;
        if gray.get_pixel(x, y).0[0] as f32 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    }))
}

/// Normalized 1-D Gaussian of `size` taps, sigma derived from the size the
/// way common vision libraries do (`0.3 * ((size - 1) / 2 - 1) + 0.8`).
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let centre = (size / 2) as f32;
    let raw: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - centre;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notenwerk_core::NotenwerkError;

    #[test]
    fn even_block_sizes_are_rejected() {
        let gray = GrayImage::from_pixel(10, 10, Luma([128u8]));
        for block_size in [0u32, 2, 4, 34] {
            assert!(matches!(
                adaptive_binarize(&gray, block_size, 10.0),
                Err(NotenwerkError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn strokes_survive_uneven_lighting() {
        let gray = GrayImage::from_fn(60, 40, |x, y| {
            let paper = 110 + x * 2;
            if y == 20 { Luma([(paper / 3) as u8]) } else { Luma([paper as u8]) }
        });
        let binary = adaptive_binarize(&gray, 11, 10.0).unwrap();
        assert!((0..60).all(|x| binary.get_pixel(x, 20).0[0] == 0));
        assert!((0..60).all(|x| binary.get_pixel(x, 5).0[0] == 255));
        assert!((0..60).all(|x| binary.get_pixel(x, 35).0[0] == 255));
    }

    #[test]
    fn offset_moves_the_threshold_in_both_directions() {
        let gray = GrayImage::from_pixel(15, 15, Luma([128u8]));
        let paper = adaptive_binarize(&gray, 5, 10.0).unwrap();
        assert!(paper.pixels().all(|p| p.0[0] == 255));

        let ink = adaptive_binarize(&gray, 5, -10.0).unwrap();
        assert!(ink.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(7);
        assert_eq!(kernel.len(), 7);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[6]).abs() < 1e-7);
        assert!(kernel[3] > kernel[2]);
    }
}
