// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster primitives shared by every stage: grayscale and threshold helpers,
// summed-area tables, line-element morphology, connected components and
// coordinate remapping.

pub mod components;
pub mod integral;
pub mod morphology;
pub mod remap;
pub mod threshold;

pub use components::{Component, components, foreground_in};
pub use integral::SummedAreaTable;
pub use morphology::{LineElement, dilate, erode};
pub use remap::{Border, RemapGrid, remap};
pub use threshold::{invert, otsu_binarize_inverted, stretch_to_full_range, to_gray};
