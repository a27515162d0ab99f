// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connected-component statistics over binary masks.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use notenwerk_core::BoundingBox;

/// Bounding box and pixel count of one 8-connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    pub bbox: BoundingBox,
    pub area: u64,
}

/// Label the non-zero pixels of `binary` and summarize each component, in
/// label order (top-to-bottom, left-to-right by first pixel).
pub fn components(binary: &GrayImage) -> Vec<Component> {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let mut stats: BTreeMap<u32, Component> = BTreeMap::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        stats
            .entry(label)
            .and_modify(|c| {
                c.bbox.top = c.bbox.top.min(y);
                c.bbox.left = c.bbox.left.min(x);
                c.bbox.bottom = c.bbox.bottom.max(y + 1);
                c.bbox.right = c.bbox.right.max(x + 1);
                c.area += 1;
            })
            .or_insert(Component {
                bbox: BoundingBox {
                    top: y,
                    left: x,
                    bottom: y + 1,
                    right: x + 1,
                },
                area: 1,
            });
    }

    stats.into_values().collect()
}

/// Number of non-zero pixels inside `bbox`.
pub fn foreground_in(binary: &GrayImage, bbox: &BoundingBox) -> u64 {
    (bbox.top..bbox.bottom)
        .flat_map(|y| (bbox.left..bbox.right).map(move |x| (x, y)))
        .filter(|&(x, y)| binary.get_pixel(x, y).0[0] > 0)
        .count() as u64
}
