// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff-line rectification: trace each line of a staff region, derive an
// evenly spaced reference grid, resample the region onto it and thicken the
// straightened lines.

pub mod enhance;
pub mod rectifier;
pub mod reference;
pub mod tracer;

pub use enhance::enhance;
pub use rectifier::{RectifiedStaff, batch_rectify, rectification_map, rectify, rectify_with_mask};
pub use reference::build_reference;
pub use tracer::trace_lines;
