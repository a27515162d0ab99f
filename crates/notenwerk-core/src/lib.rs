// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notenwerk — Core types, configuration and error definitions shared by the
// staff-normalization crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    DEFAULT_DPI, EnhanceConfig, Interpolation, LayoutConfig, PipelineConfig, PreprocessConfig,
    RectifyConfig, SkewConfig, StaffMaskConfig,
};
pub use error::{NotenwerkError, Result};
pub use types::*;
