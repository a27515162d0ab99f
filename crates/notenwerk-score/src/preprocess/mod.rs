// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page preprocessing: DPI normalization, skew estimation and correction,
// non-local-means denoising, illumination flattening, and adaptive
// binarization.

pub mod binarize;
pub mod denoise;
pub mod dpi;
pub mod illumination;
pub mod skew;

pub use binarize::adaptive_binarize;
pub use denoise::denoise;
pub use dpi::normalize_dpi;
pub use illumination::correct_illumination;
pub use skew::{deskew, estimate_skew, rotate_about_center};
