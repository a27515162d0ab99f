// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Summed-area tables for constant-time box sums.

/// Summed-area table over a `width x height` grid of `f64` values.
///
/// `table[y * (width+1) + x]` holds the sum of all values in the rectangle
/// `[0, x) x [0, y)`. The table has a zero-padded first row and column.
pub struct SummedAreaTable {
    width: usize,
    height: usize,
    table: Vec<f64>,
}

impl SummedAreaTable {
    /// Build the table from a value generator evaluated once per cell.
    pub fn from_fn(width: usize, height: usize, value: impl FnMut(usize, usize) -> f64) -> Self {
        let mut table = Self {
            width,
            height,
            table: vec![0.0f64; (width + 1) * (height + 1)],
        };
        table.refill(value);
        table
    }

    /// Recompute every cell in place from new values, keeping the grid size
    /// and the allocation.
    pub fn refill(&mut self, mut value: impl FnMut(usize, usize) -> f64) {
        let stride = self.width + 1;
        for y in 0..self.height {
            let mut row_sum = 0.0f64;
            for x in 0..self.width {
                row_sum += value(x, y);
                let idx = (y + 1) * stride + (x + 1);
                let above = y * stride + (x + 1);
                self.table[idx] = row_sum + self.table[above];
            }
        }
    }

    /// Mean over the square of the given radius centred on `(cx, cy)`,
    /// clamped to the grid bounds.
    pub fn region_mean(&self, cx: usize, cy: usize, radius: usize) -> f64 {
        let x1 = cx.saturating_sub(radius);
        let y1 = cy.saturating_sub(radius);
        let x2 = (cx + radius + 1).min(self.width);
        let y2 = (cy + radius + 1).min(self.height);

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return 0.0;
        }
        self.sum(x1, y1, x2, y2) / area
    }

    /// Sum over `[x1, x2) x [y1, y2)`.
    pub fn sum(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> f64 {
        let stride = self.width + 1;
        self.table[y2 * stride + x2] - self.table[y1 * stride + x2] - self.table[y2 * stride + x1]
            + self.table[y1 * stride + x1]
    }
}
