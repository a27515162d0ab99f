// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout analysis: content margins, header blobs, the staff-line mask,
// staff regions and systems. Every function takes a grayscale page; colour
// input goes through `raster::to_gray` first.

pub mod margins;
pub mod regions;
pub mod staff_mask;

use notenwerk_core::{HeaderRegion, Margins, StaffRegion, System};
use serde::{Deserialize, Serialize};

pub use margins::{detect_headers, estimate_margins};
pub use regions::{crop_region, find_regions, group_regions};
pub use staff_mask::extract_mask;

/// Everything layout analysis learns about one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub margins: Margins,
    /// Header blobs, top to bottom.
    pub headers: Vec<HeaderRegion>,
    /// Staff systems, top to bottom.
    pub systems: Vec<System>,
}

impl PageLayout {
    /// Staff regions of every system in reading order.
    pub fn staves(&self) -> impl Iterator<Item = &StaffRegion> {
        self.systems.iter().flat_map(|system| system.staves.iter())
    }

    pub fn staff_count(&self) -> usize {
        self.staves().count()
    }
}
