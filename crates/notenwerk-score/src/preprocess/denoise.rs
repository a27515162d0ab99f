// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Non-local-means denoising.
//
// Each pixel becomes a weighted mean of the pixels in a 21x21 search window,
// weighted by how similar their 7x7 neighbourhoods are. Patch distances for
// one search offset are box sums over a squared-difference image, so every
// offset costs one pass over a shared summed-area table regardless of the
// patch size. Rows accumulate in parallel.

use image::{DynamicImage, ImageBuffer, Pixel};
use notenwerk_core::error::{NotenwerkError, Result};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::raster::SummedAreaTable;

const TEMPLATE_RADIUS: usize = 3;
const SEARCH_RADIUS: i64 = 10;

/// Edge-preserving denoise; `strength` is the filter parameter `h`.
///
/// Larger values smooth more aggressively. Colour images are filtered per
/// channel. A strength of 0 returns a copy.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn denoise(image: &DynamicImage, strength: f32) -> Result<DynamicImage> {
    if !strength.is_finite() || strength < 0.0 {
        return Err(NotenwerkError::InvalidConfiguration(format!(
            "denoise strength must be finite and non-negative, got {strength}"
        )));
    }
    if strength == 0.0 {
        return Ok(image.clone());
    }

    let denoised = match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(denoise_buffer(gray, strength)),
        other => DynamicImage::ImageRgb8(denoise_buffer(&other.to_rgb8(), strength)),
    };
    debug!("Denoising complete");
    Ok(denoised)
}

fn denoise_buffer<P>(src: &ImageBuffer<P, Vec<u8>>, strength: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (width, height) = (src.width() as usize, src.height() as usize);
    let mut output = src.clone();
    if width == 0 || height == 0 {
        return output;
    }
    let raw = src.as_raw();
    let dst: &mut [u8] = &mut output;

    for c in 0..channels {
        let plane: Vec<f64> = raw.iter().skip(c).step_by(channels).map(|&v| v as f64).collect();
        let filtered = nl_means_plane(&plane, width, height, strength as f64);
        for (i, value) in filtered.into_iter().enumerate() {
            dst[i * channels + c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}

fn nl_means_plane(plane: &[f64], width: usize, height: usize, strength: f64) -> Vec<f64> {
    let h2 = strength * strength;
    let mut numerator = vec![0f64; plane.len()];
    let mut denominator = vec![0f64; plane.len()];

    let shifted = |x: usize, y: usize, dx: i64, dy: i64| -> f64 {
        let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as usize;
        let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as usize;
        plane[sy * width + sx]
    };

    let mut distances = SummedAreaTable::from_fn(width, height, |_, _| 0.0);
    for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
        for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
            distances.refill(|x, y| {
                let diff = plane[y * width + x] - shifted(x, y, dx, dy);
                diff * diff
            });
            let distances = &distances;
            numerator
                .par_chunks_mut(width)
                .zip(denominator.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (num_row, den_row))| {
                    for (x, (num, den)) in num_row.iter_mut().zip(den_row.iter_mut()).enumerate() {
                        let d2 = distances.region_mean(x, y, TEMPLATE_RADIUS);
                        let weight = (-d2 / h2).exp();
                        *num += weight * shifted(x, y, dx, dy);
                        *den += weight;
                    }
                });
        }
    }

    numerator
        .into_iter()
        .zip(denominator)
        .zip(plane)
        .map(|((num, den), &original)| if den > 0.0 { num / den } else { original })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// Deterministic pseudo-random offsets in [-spread, spread].
    fn jitter(x: u32, y: u32, spread: i32) -> i32 {
        let hash = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % 1000;
        (hash as i32 * (2 * spread + 1)) / 1000 - spread
    }

    fn noisy_step() -> GrayImage {
        GrayImage::from_fn(32, 32, |x, y| {
            let base = if x < 16 { 40 } else { 210 };
            Luma([(base + jitter(x, y, 12)).clamp(0, 255) as u8])
        })
    }

    fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
        let n = values.clone().count() as f64;
        let mean = values.clone().sum::<f64>() / n;
        values.map(|v| (v - mean).powi(2)).sum::<f64>() / n
    }

    #[test]
    fn flat_regions_get_smoother_and_edges_survive() {
        let noisy = noisy_step();
        let image = DynamicImage::ImageLuma8(noisy.clone());
        let denoised = denoise(&image, 15.0).unwrap();
        let denoised = denoised.as_luma8().unwrap();

        let left = |img: &GrayImage| {
            let values: Vec<f64> = (4..28)
                .flat_map(|y| (2..12).map(move |x| (x, y)))
                .map(|(x, y)| img.get_pixel(x, y).0[0] as f64)
                .collect();
            values
        };
        let before = variance(left(&noisy).into_iter());
        let after = variance(left(denoised).into_iter());
        assert!(after < before / 2.0, "variance {before} -> {after}");

        assert!(denoised.get_pixel(6, 16).0[0] < 70);
        assert!(denoised.get_pixel(26, 16).0[0] > 180);
    }

    /// Straight per-pixel evaluation of the same weights, no box sums.
    fn direct_nl_means(plane: &[f64], width: usize, height: usize, strength: f64) -> Vec<f64> {
        let at = |x: i64, y: i64| {
            plane[y.clamp(0, height as i64 - 1) as usize * width + x.clamp(0, width as i64 - 1) as usize]
        };
        let radius = TEMPLATE_RADIUS as i64;
        let mut out = Vec::with_capacity(plane.len());
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let (mut num, mut den) = (0.0, 0.0);
                for dy in -SEARCH_RADIUS..=SEARCH_RADIUS {
                    for dx in -SEARCH_RADIUS..=SEARCH_RADIUS {
                        let (mut total, mut count) = (0.0, 0.0);
                        for py in (y - radius).max(0)..(y + radius + 1).min(height as i64) {
                            for px in (x - radius).max(0)..(x + radius + 1).min(width as i64) {
                                let diff = at(px, py) - at(px + dx, py + dy);
                                total += diff * diff;
                                count += 1.0;
                            }
                        }
                        let weight = (-(total / count) / (strength * strength)).exp();
                        num += weight * at(x + dx, y + dy);
                        den += weight;
                    }
                }
                out.push(num / den);
            }
        }
        out
    }

    #[test]
    fn parallel_rows_match_direct_evaluation() {
        let (width, height) = (9usize, 7usize);
        let plane: Vec<f64> = (0..width * height)
            .map(|i| (100 + jitter(i as u32 % 9, i as u32 / 9, 40)) as f64)
            .collect();
        let fast = nl_means_plane(&plane, width, height, 12.0);
        let direct = direct_nl_means(&plane, width, height, 12.0);
        for (a, b) in fast.iter().zip(&direct) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_strength_is_a_copy() {
        let image = DynamicImage::ImageLuma8(noisy_step());
        assert_eq!(denoise(&image, 0.0).unwrap(), image);
    }

    #[test]
    fn negative_strength_is_rejected() {
        let image = DynamicImage::ImageLuma8(noisy_step());
        assert!(matches!(
            denoise(&image, -1.0),
            Err(NotenwerkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn colour_images_keep_three_channels() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 9, Rgb([200, 30, 90])));
        let denoised = denoise(&image, 10.0).unwrap();
        let rgb = denoised.as_rgb8().unwrap();
        assert_eq!(rgb.dimensions(), (12, 9));
        assert_eq!(rgb.get_pixel(5, 5), &Rgb([200, 30, 90]));
    }
}
