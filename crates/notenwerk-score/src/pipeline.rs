// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end page processing: normalize, analyse layout, then rectify and
// enhance every staff region. Pages and regions are independent, so both
// levels fan out over the rayon pool and are merged back by index.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::{
    DEFAULT_DPI, LayoutConfig, PipelineConfig, PreprocessConfig, RectifyConfig, StaffRegion,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::layout::{
    PageLayout, crop_region, detect_headers, estimate_margins, extract_mask, find_regions,
    group_regions,
};
use crate::preprocess::{adaptive_binarize, correct_illumination, denoise, deskew, normalize_dpi};
use crate::rectify::{RectifiedStaff, enhance, rectify_with_mask};

/// File extensions a page can be opened from. PDF rasterization happens
/// upstream.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "pgm"];

/// One decoded page and the resolution it was captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPage {
    pub image: DynamicImage,
    pub dpi: u32,
}

impl RasterPage {
    // -- Construction ---------------------------------------------------------

    pub fn new(image: DynamicImage, dpi: u32) -> Self {
        Self { image, dpi }
    }

    /// Wrap an image whose source carried no resolution metadata.
    pub fn with_assumed_dpi(image: DynamicImage) -> Self {
        Self::new(image, DEFAULT_DPI)
    }

    /// Decode an encoded raster (PNG, JPEG, TIFF, ...). `dpi` defaults to
    /// [`DEFAULT_DPI`].
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8], dpi: Option<u32>) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            NotenwerkError::UnsupportedFormat(format!("failed to decode page: {err}"))
        })?;
        debug!(width = image.width(), height = image.height(), "Page decoded from bytes");
        Ok(Self::with_dpi_hint(image, dpi))
    }

    fn with_dpi_hint(image: DynamicImage, dpi: Option<u32>) -> Self {
        match dpi {
            Some(dpi) => Self::new(image, dpi),
            None => Self::with_assumed_dpi(image),
        }
    }

    /// Load a page from disk, rejecting extensions outside
    /// [`SUPPORTED_EXTENSIONS`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, dpi: Option<u32>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(NotenwerkError::UnsupportedFormat(format!(
                "unsupported page format: {}",
                path.display()
            )));
        }
        let image = image::open(path).map_err(|err| {
            NotenwerkError::ImageError(format!("failed to open {}: {}", path.display(), err))
        })?;
        info!(width = image.width(), height = image.height(), "Page loaded");
        Ok(Self::with_dpi_hint(image, dpi))
    }
}

/// Supplier of decoded pages, such as a rasterized document.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Decode page `index` (zero-based).
    fn page(&self, index: usize) -> Result<RasterPage>;
}

/// Pages that are already decoded and held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPageSource {
    pages: Vec<RasterPage>,
}

impl MemoryPageSource {
    pub fn new(pages: Vec<RasterPage>) -> Self {
        Self { pages }
    }

    pub fn push(&mut self, page: RasterPage) {
        self.pages.push(page);
    }
}

impl PageSource for MemoryPageSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<RasterPage> {
        self.pages.get(index).cloned().ok_or_else(|| {
            NotenwerkError::InvalidInput(format!(
                "page {index} out of range (source has {})",
                self.pages.len()
            ))
        })
    }
}

/// A page after resolution, skew, noise and lighting correction, binarized
/// (ink 0, paper 255).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPage {
    #[serde(skip)]
    pub image: GrayImage,
    pub dpi: u32,
    /// Rotation applied during deskew, in degrees.
    pub skew_degrees: f32,
}

/// Result of rectifying one staff region of a page.
#[derive(Debug)]
pub struct RegionOutcome {
    /// Position of the region in reading order.
    pub index: usize,
    /// Index of the system the region belongs to.
    pub system: usize,
    pub region: StaffRegion,
    /// The rectified and enhanced staff, or why this region was skipped.
    pub result: Result<RectifiedStaff>,
}

/// Everything produced for one page.
#[derive(Debug)]
pub struct ProcessedPage {
    pub normalized: NormalizedPage,
    pub layout: PageLayout,
    /// One outcome per staff region, in reading order.
    pub staves: Vec<RegionOutcome>,
}

impl ProcessedPage {
    /// Staves that rectified successfully.
    pub fn rectified(&self) -> impl Iterator<Item = &RectifiedStaff> {
        self.staves.iter().filter_map(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failed_count(&self) -> usize {
        self.staves.iter().filter(|outcome| outcome.result.is_err()).count()
    }
}

/// DPI normalization, deskew, denoise, illumination correction and adaptive
/// binarization, in that order. The page's own DPI is the source resolution.
#[instrument(skip(page, config), fields(width = page.image.width(), height = page.image.height(), dpi = page.dpi))]
pub fn normalize_page(page: &RasterPage, config: &PreprocessConfig) -> Result<NormalizedPage> {
    config.validate()?;

    let resized = normalize_dpi(&page.image, page.dpi, config.target_dpi)?;
    let (deskewed, skew_degrees) = deskew(&resized, &config.skew);
    let denoised = denoise(&deskewed, config.denoise_strength)?;
    let flattened = correct_illumination(&denoised);
    let image = adaptive_binarize(&flattened, config.adaptive_block_size, config.adaptive_c)?;

    info!(skew_degrees, width = image.width(), height = image.height(), "Page normalized");
    Ok(NormalizedPage {
        image,
        dpi: config.target_dpi,
        skew_degrees,
    })
}

/// Margins, header blobs and staff systems of a normalized page.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn locate_layout(image: &GrayImage, config: &LayoutConfig) -> Result<PageLayout> {
    config.validate()?;

    let margins = estimate_margins(image, config.margin_threshold);
    let headers = detect_headers(image, config.max_header_ratio, config.min_header_confidence);
    let regions = find_regions(image, config);
    let systems = group_regions(&regions, config.max_vertical_gap);

    info!(
        headers = headers.len(),
        staves = regions.len(),
        systems = systems.len(),
        "Layout located"
    );
    Ok(PageLayout {
        margins,
        headers,
        systems,
    })
}

/// Rectify one staff crop against its staff-line mask crop. The rectified
/// mask is returned alongside the image.
pub fn rectify_region(
    image: &GrayImage,
    mask: &GrayImage,
    config: &RectifyConfig,
) -> Result<RectifiedStaff> {
    config.validate()?;
    rectify_with_mask(image, mask, config)
}

/// Run the whole pipeline on one page.
///
/// Staff regions are rectified in parallel. A region that cannot be traced
/// is recorded as a failed outcome and the rest of the page carries on; only
/// page-level failures (configuration, normalization) abort.
#[instrument(skip(page, config), fields(dpi = page.dpi))]
pub fn process_page(page: &RasterPage, config: &PipelineConfig) -> Result<ProcessedPage> {
    config.validate()?;

    let normalized = normalize_page(page, &config.preprocess)?;
    let layout = locate_layout(&normalized.image, &config.layout)?;
    let mask = extract_mask(&normalized.image, &config.layout.mask);

    let regions: Vec<(usize, StaffRegion)> = layout
        .systems
        .iter()
        .enumerate()
        .flat_map(|(system, members)| members.staves.iter().map(move |region| (system, *region)))
        .collect();

    let staves: Vec<RegionOutcome> = regions
        .into_par_iter()
        .enumerate()
        .map(|(index, (system, region))| {
            let result = rectify_and_enhance(&normalized.image, &mask, &region, config);
            if let Err(err) = &result {
                warn!(index, system, error = %err, "Skipping staff region");
            }
            RegionOutcome {
                index,
                system,
                region,
                result,
            }
        })
        .collect();

    let processed = ProcessedPage {
        normalized,
        layout,
        staves,
    };
    info!(
        staves = processed.staves.len(),
        failed = processed.failed_count(),
        "Page processed"
    );
    Ok(processed)
}

fn rectify_and_enhance(
    page: &GrayImage,
    mask: &GrayImage,
    region: &StaffRegion,
    config: &PipelineConfig,
) -> Result<RectifiedStaff> {
    let image = crop_region(page, region);
    let mask = crop_region(mask, region);
    let mut staff = rectify_region(&image, &mask, &config.rectify)?;
    staff.image = enhance(&staff.image, &config.enhance)?;
    Ok(staff)
}

/// Process every page of `source` in parallel; one result per page, in page
/// order.
#[instrument(skip(source, config), fields(pages = source.page_count()))]
pub fn process_pages(source: &dyn PageSource, config: &PipelineConfig) -> Vec<Result<ProcessedPage>> {
    let results: Vec<Result<ProcessedPage>> = (0..source.page_count())
        .into_par_iter()
        .map(|index| {
            let page = source.page(index)?;
            process_page(&page, config)
        })
        .collect();

    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        warn!(failed, "Some pages could not be processed");
    }
    results
}
