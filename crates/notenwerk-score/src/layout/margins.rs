// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page margins and header blobs near the top edge.

use image::GrayImage;
use image::imageops::crop_imm;
use notenwerk_core::{HeaderRegion, Margins};
use tracing::{debug, instrument};

use crate::raster::{components, foreground_in, otsu_binarize_inverted};

/// Distance from each edge to the nearest pixel darker than `threshold`.
///
/// A page without such pixels reports its full height as the top and bottom
/// margins and its full width as the left and right margins.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn estimate_margins(gray: &GrayImage, threshold: u8) -> Margins {
    let (width, height) = gray.dimensions();
    let mut rows: Option<(u32, u32)> = None;
    let mut cols: Option<(u32, u32)> = None;

    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] >= threshold {
            continue;
        }
        rows = Some(rows.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))));
        cols = Some(cols.map_or((x, x), |(lo, hi)| (lo.min(x), hi.max(x))));
    }

    match (rows, cols) {
        (Some((first_row, last_row)), Some((first_col, last_col))) => Margins {
            top: first_row,
            bottom: height - last_row - 1,
            left: first_col,
            right: width - last_col - 1,
        },
        _ => {
            debug!("No content pixels; page is blank");
            Margins {
                top: height,
                bottom: height,
                left: width,
                right: width,
            }
        }
    }
}

/// Solid blobs in the top `max_header_ratio` of the page, sorted by top edge.
///
/// The page is Otsu-binarized as a whole, then only the header band is
/// labelled. A blob's confidence is the fraction of its bounding box covered
/// by foreground; blobs below `min_confidence` are dropped.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn detect_headers(gray: &GrayImage, max_header_ratio: f32, min_confidence: f32) -> Vec<HeaderRegion> {
    let (width, height) = gray.dimensions();
    if height == 0 || width == 0 || max_header_ratio <= 0.0 {
        return Vec::new();
    }
    let band_height = ((height as f32 * max_header_ratio).round() as u32).clamp(1, height);

    let (binary, level) = otsu_binarize_inverted(gray);
    let band = crop_imm(&binary, 0, 0, width, band_height).to_image();
    debug!(band_height, level, "Header band binarized");

    let mut headers: Vec<HeaderRegion> = components(&band)
        .into_iter()
        .filter_map(|component| {
            let confidence =
                foreground_in(&band, &component.bbox) as f32 / component.bbox.area() as f32;
            (confidence >= min_confidence).then_some(HeaderRegion {
                bbox: component.bbox,
                confidence,
            })
        })
        .collect();
    headers.sort_by_key(|header| header.bbox.top);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fill, synthetic_score};
    use image::Luma;

    #[test]
    fn margins_hug_header_and_staves() {
        let margins = estimate_margins(&synthetic_score(), 245);
        assert_eq!(
            margins,
            Margins {
                top: 4,
                bottom: 25,
                left: 10,
                right: 10
            }
        );
    }

    #[test]
    fn blank_page_margins_are_full_dimensions() {
        let blank = GrayImage::from_pixel(40, 30, Luma([255u8]));
        assert_eq!(
            estimate_margins(&blank, 245),
            Margins {
                top: 30,
                bottom: 30,
                left: 40,
                right: 40
            }
        );
    }

    #[test]
    fn content_rows_bound_the_vertical_margins() {
        let mut page = GrayImage::from_pixel(60, 100, Luma([255u8]));
        fill(&mut page, 4..95, 10..50, 0);
        let margins = estimate_margins(&page, 245);
        assert_eq!((margins.top, margins.bottom), (4, 100 - 1 - 94));
        assert_eq!((margins.left, margins.right), (10, 10));
    }

    #[test]
    fn single_header_block_is_found() {
        let page = synthetic_score();
        let headers = detect_headers(&page, 0.2, 0.3);
        assert_eq!(headers.len(), 1);

        let bbox = headers[0].bbox;
        assert!(bbox.left <= 15);
        assert!(bbox.right >= page.width() - 15);
        assert!(bbox.top <= 4);
        assert!(bbox.bottom >= 11);
        assert!((0.5..=1.0).contains(&headers[0].confidence));
    }

    #[test]
    fn sparse_blobs_fall_below_confidence() {
        let mut page = GrayImage::from_pixel(60, 60, Luma([255u8]));
        // An L-shaped stroke covers a small share of its bounding box.
        fill(&mut page, 2..3, 5..45, 0);
        fill(&mut page, 2..10, 5..6, 0);
        assert!(detect_headers(&page, 0.2, 0.3).is_empty());
        assert_eq!(detect_headers(&page, 0.2, 0.1).len(), 1);
    }

    #[test]
    fn empty_band_yields_nothing() {
        assert!(detect_headers(&synthetic_score(), 0.0, 0.3).is_empty());
        assert!(detect_headers(&GrayImage::new(10, 0), 0.2, 0.3).is_empty());
    }
}
