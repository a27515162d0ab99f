// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// notenwerk-score — Staff-geometry normalization for music-score pages.
//
// Provides page preprocessing (DPI normalization, deskew, denoise,
// illumination correction, adaptive binarization), layout analysis (margins,
// headers, staff-line masks, staff regions and systems), and staff-line
// rectification (curve tracing, canonical reference, dense remap, contrast
// enhancement).

pub mod layout;
pub mod pipeline;
pub mod preprocess;
pub mod raster;
pub mod rectify;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the entry points so callers can use `notenwerk_score::normalize_page` etc.
pub use layout::{
    PageLayout, crop_region, detect_headers, estimate_margins, extract_mask, find_regions,
    group_regions,
};
pub use pipeline::{
    MemoryPageSource, NormalizedPage, PageSource, ProcessedPage, RasterPage, RegionOutcome,
    SUPPORTED_EXTENSIONS,
    locate_layout, normalize_page, process_page, process_pages, rectify_region,
};
pub use preprocess::{adaptive_binarize, correct_illumination, denoise, deskew, estimate_skew, normalize_dpi};
pub use rectify::{
    RectifiedStaff, batch_rectify, build_reference, enhance, rectify, rectify_with_mask, trace_lines,
};
