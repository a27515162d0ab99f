// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff regions and their grouping into systems.

use image::GrayImage;
use image::imageops::crop_imm;
use notenwerk_core::{LayoutConfig, StaffRegion, System};
use tracing::{debug, info, instrument};

use crate::layout::staff_mask::extract_mask;
use crate::raster::{LineElement, components, dilate, erode};

/// Locate staves on a page, sorted by `(top, left)`.
///
/// The staff-line mask is closed vertically with a `band_height` element so
/// that the lines of one staff fuse into one blob. Blobs with fewer than
/// `min_area` pixels, or ending inside the top `ignore_top_ratio` of the
/// page, are discarded.
#[instrument(skip(gray, config), fields(width = gray.width(), height = gray.height()))]
pub fn find_regions(gray: &GrayImage, config: &LayoutConfig) -> Vec<StaffRegion> {
    let mask = extract_mask(gray, &config.mask);
    let band = LineElement::vertical(config.band_height);
    let merged = erode(&dilate(&mask, band, 1), band);

    let top_cutoff = (gray.height() as f32 * config.ignore_top_ratio).round() as u32;
    let blobs = components(&merged);
    debug!(blobs = blobs.len(), top_cutoff, "Staff blobs labelled");

    let mut regions: Vec<StaffRegion> = blobs
        .into_iter()
        .filter(|blob| blob.area >= config.min_area as u64 && blob.bbox.bottom > top_cutoff)
        .filter_map(|blob| {
            StaffRegion::new(blob.bbox.top, blob.bbox.bottom, blob.bbox.left, blob.bbox.right).ok()
        })
        .collect();
    regions.sort_by_key(|region| (region.top(), region.left()));

    info!(regions = regions.len(), "Staff regions found");
    regions
}

/// Group staves whose vertical gap is at most `max_vertical_gap` pixels.
///
/// Regions are ordered by `top`; each region joins the current system when
/// the gap from the previous region's bottom to its top is small enough, and
/// starts a new system otherwise.
pub fn group_regions(regions: &[StaffRegion], max_vertical_gap: i64) -> Vec<System> {
    let mut sorted = regions.to_vec();
    sorted.sort_by_key(StaffRegion::top);

    let mut systems: Vec<System> = Vec::new();
    for region in sorted {
        match systems.last_mut() {
            Some(system)
                if system
                    .staves
                    .last()
                    .is_some_and(|previous| previous.gap_to(&region) <= max_vertical_gap) =>
            {
                system.staves.push(region);
            }
            _ => systems.push(System {
                staves: vec![region],
            }),
        }
    }
    systems
}

/// Pixels of `region`, clipped to the image bounds.
pub fn crop_region(gray: &GrayImage, region: &StaffRegion) -> GrayImage {
    crop_imm(gray, region.left(), region.top(), region.width(), region.height()).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{synthetic_score, two_system_page};

    fn region(top: u32, bottom: u32) -> StaffRegion {
        StaffRegion::new(top, bottom, 0, 50).unwrap()
    }

    #[test]
    fn two_staves_are_found_and_kept_apart() {
        let regions = find_regions(&two_system_page(), &LayoutConfig::default());
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].top(), regions[0].bottom()), (30, 51));
        assert_eq!((regions[1].top(), regions[1].bottom()), (90, 111));
        assert_eq!((regions[0].left(), regions[0].right()), (10, 150));

        let systems = group_regions(&regions, 25);
        assert_eq!(systems.len(), 2);
        assert!(systems.iter().all(|system| system.len() == 1));
        assert!(systems[0].staves[0].top() < systems[1].staves[0].top());

        assert_eq!(group_regions(&regions, 40).len(), 1);
    }

    #[test]
    fn default_band_fuses_closely_spaced_staves() {
        // The 9-row gap between the two staves is bridged by the 11-row
        // closing, and the header grows up to the page edge.
        let regions = find_regions(&synthetic_score(), &LayoutConfig::default());
        let boxes: Vec<(u32, u32)> = regions.iter().map(|r| (r.top(), r.bottom())).collect();
        assert_eq!(boxes, vec![(0, 12), (28, 71)]);
        assert_eq!((regions[1].left(), regions[1].right()), (10, 110));
    }

    #[test]
    fn header_is_ignored_only_inside_the_top_band() {
        let page = synthetic_score();
        let narrow = LayoutConfig {
            band_height: 5,
            ..LayoutConfig::default()
        };

        // The header ends at row 12, past the default cutoff at row 10.
        let regions = find_regions(&page, &narrow);
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[0].top(), regions[0].bottom()), (4, 12));

        let config = LayoutConfig {
            ignore_top_ratio: 0.2,
            ..narrow
        };
        let regions = find_regions(&page, &config);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].top(), regions[0].bottom()), (28, 45));
        assert_eq!((regions[1].top(), regions[1].bottom()), (54, 71));

        assert_eq!(group_regions(&regions, 8).len(), 2);
        assert_eq!(group_regions(&regions, 10).len(), 1);
    }

    #[test]
    fn small_blobs_are_dropped() {
        let config = LayoutConfig {
            min_area: 5000,
            ..LayoutConfig::default()
        };
        assert!(find_regions(&two_system_page(), &config).is_empty());
    }

    #[test]
    fn grouping_sorts_and_chains_gaps() {
        let regions = [region(110, 140), region(0, 40), region(60, 90), region(50, 58)];
        let systems = group_regions(&regions, 12);
        let tops: Vec<Vec<u32>> = systems
            .iter()
            .map(|system| system.staves.iter().map(StaffRegion::top).collect())
            .collect();
        assert_eq!(tops, vec![vec![0, 50, 60], vec![110]]);
    }

    #[test]
    fn overlapping_regions_share_a_system() {
        let systems = group_regions(&[region(0, 40), region(30, 60)], 0);
        assert_eq!(systems.len(), 1);
    }

    #[test]
    fn empty_input_groups_to_nothing() {
        assert!(group_regions(&[], 25).is_empty());
    }

    #[test]
    fn crop_is_clamped_to_the_page() {
        let page = two_system_page();
        let staff = StaffRegion::new(30, 51, 10, 150).unwrap();
        let crop = crop_region(&page, &staff);
        assert_eq!(crop.dimensions(), (140, 21));
        assert_eq!(crop.get_pixel(0, 0).0[0], 0);

        let overhanging = StaffRegion::new(130, 200, 100, 400).unwrap();
        assert_eq!(crop_region(&page, &overhanging).dimensions(), (60, 10));
    }
}
