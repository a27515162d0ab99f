// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DPI normalization: rescale a page so every later stage works at one
// resolution.

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Pixel};
use notenwerk_core::error::{NotenwerkError, Result};
use tracing::{debug, instrument};

/// Rescale `image` from `current_dpi` to `target_dpi`.
///
/// Upscaling uses cubic (Catmull-Rom) interpolation; downscaling averages the
/// covered source area. Each output axis is `round(len * target / current)`
/// pixels, at least 1. Equal resolutions return a copy of the input.
///
/// Grayscale input stays grayscale; any other layout is resampled as RGB.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn normalize_dpi(image: &DynamicImage, current_dpi: u32, target_dpi: u32) -> Result<DynamicImage> {
    if current_dpi == 0 || target_dpi == 0 {
        return Err(NotenwerkError::InvalidConfiguration(format!(
            "DPI values must be positive (current {current_dpi}, target {target_dpi})"
        )));
    }
    if current_dpi == target_dpi {
        return Ok(image.clone());
    }

    let scale = target_dpi as f64 / current_dpi as f64;
    let new_width = ((image.width() as f64 * scale).round() as u32).max(1);
    let new_height = ((image.height() as f64 * scale).round() as u32).max(1);
    debug!(scale, new_width, new_height, "Rescaling page");

    let resized = if scale > 1.0 {
        image.resize_exact(new_width, new_height, FilterType::CatmullRom)
    } else {
        match image {
            DynamicImage::ImageLuma8(gray) => {
                DynamicImage::ImageLuma8(resize_area(gray, new_width, new_height))
            }
            other => DynamicImage::ImageRgb8(resize_area(&other.to_rgb8(), new_width, new_height)),
        }
    };
    Ok(resized)
}

/// Area-averaging downscale: each output pixel is the coverage-weighted mean
/// of the source pixels its footprint overlaps.
pub fn resize_area<P>(src: &ImageBuffer<P, Vec<u8>>, new_width: u32, new_height: u32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (src_w, src_h) = (src.width() as usize, src.height() as usize);
    let (dst_w, dst_h) = (new_width as usize, new_height as usize);
    let mut output: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(new_width, new_height);
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return output;
    }

    let x_taps = area_taps(src_w, dst_w);
    let y_taps = area_taps(src_h, dst_h);
    let raw = src.as_raw();

    // Horizontal pass into a dst_w x src_h float plane.
    let mut horizontal = vec![0f32; dst_w * src_h * channels];
    for y in 0..src_h {
        for (ox, taps) in x_taps.iter().enumerate() {
            for c in 0..channels {
                let acc: f32 = taps
                    .iter()
                    .map(|&(sx, w)| raw[(y * src_w + sx) * channels + c] as f32 * w)
                    .sum();
                horizontal[(y * dst_w + ox) * channels + c] = acc;
            }
        }
    }

    let dst: &mut [u8] = &mut output;
    for (oy, taps) in y_taps.iter().enumerate() {
        for ox in 0..dst_w {
            for c in 0..channels {
                let acc: f32 = taps
                    .iter()
                    .map(|&(sy, w)| horizontal[(sy * dst_w + ox) * channels + c] * w)
                    .sum();
                dst[(oy * dst_w + ox) * channels + c] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    output
}

/// Source indices and normalized coverage weights for each output index.
fn area_taps(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|o| {
            let start = o as f64 * scale;
            let end = ((o + 1) as f64 * scale).min(src_len as f64);
            let span = (end - start).max(f64::EPSILON);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|i| {
                    let overlap = end.min((i + 1) as f64) - start.max(i as f64);
                    (overlap > 0.0).then(|| (i, (overlap / span) as f32))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn doubling_dpi_doubles_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 50));
        let scaled = normalize_dpi(&image, 150, 300).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (200, 100));
    }

    #[test]
    fn equal_dpi_returns_identical_copy() {
        let gray = GrayImage::from_fn(13, 7, |x, y| Luma([(x * 17 + y * 3) as u8]));
        let image = DynamicImage::ImageLuma8(gray);
        let copy = normalize_dpi(&image, 300, 300).unwrap();
        assert_eq!(copy, image);
    }

    #[test]
    fn zero_dpi_is_invalid_configuration() {
        let image = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(matches!(
            normalize_dpi(&image, 0, 300),
            Err(NotenwerkError::InvalidConfiguration(_))
        ));
        assert!(normalize_dpi(&image, 300, 0).is_err());
    }

    #[test]
    fn downscale_averages_blocks() {
        let gray = GrayImage::from_fn(4, 4, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 { Luma([200u8]) } else { Luma([40u8]) }
        });
        let image = DynamicImage::ImageLuma8(gray);
        let scaled = normalize_dpi(&image, 300, 150).unwrap();
        let scaled = scaled.as_luma8().unwrap();
        assert_eq!(scaled.dimensions(), (2, 2));
        assert_eq!(scaled.get_pixel(0, 0).0[0], 200);
        assert_eq!(scaled.get_pixel(1, 0).0[0], 40);
    }

    #[test]
    fn tiny_images_keep_at_least_one_pixel() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([90u8])));
        let scaled = normalize_dpi(&image, 600, 72).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (1, 1));
        assert_eq!(scaled.as_luma8().unwrap().get_pixel(0, 0).0[0], 90);
    }
}
