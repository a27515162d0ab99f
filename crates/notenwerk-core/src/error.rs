// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Notenwerk.

use thiserror::Error;

/// Top-level error type for all Notenwerk operations.
#[derive(Debug, Error)]
pub enum NotenwerkError {
    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    // -- Page source --
    #[error("unsupported page format: {0}")]
    UnsupportedFormat(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Staff geometry --
    #[error("staff mask contains no foreground pixels")]
    MaskEmpty,

    #[error("could not anchor {expected} staff lines in any column")]
    InsufficientStaffLines { expected: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Configuration files --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NotenwerkError {
    /// True for failures that only mean "this region is not a usable staff".
    ///
    /// Page-level callers skip the region and keep processing the page.
    pub fn is_region_failure(&self) -> bool {
        matches!(
            self,
            Self::MaskEmpty | Self::InsufficientStaffLines { .. } | Self::InvalidInput(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NotenwerkError>;
