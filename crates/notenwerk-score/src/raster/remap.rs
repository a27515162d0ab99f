// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dense coordinate remapping: every output pixel names the (sub-pixel) source
// location it is sampled from. Rotation and staff rectification both resample
// through this one routine.

use image::{ImageBuffer, Pixel};
use notenwerk_core::Interpolation;

/// Per-output-pixel source coordinates, row-major.
#[derive(Debug, Clone)]
pub struct RemapGrid {
    width: u32,
    height: u32,
    map_x: Vec<f32>,
    map_y: Vec<f32>,
}

impl RemapGrid {
    /// Evaluate `source(x, y) -> (src_x, src_y)` for every output pixel.
    pub fn from_fn(width: u32, height: u32, mut source: impl FnMut(u32, u32) -> (f32, f32)) -> Self {
        let len = width as usize * height as usize;
        let mut map_x = Vec::with_capacity(len);
        let mut map_y = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = source(x, y);
                map_x.push(sx);
                map_y.push(sy);
            }
        }
        Self {
            width,
            height,
            map_x,
            map_y,
        }
    }

    /// Build a grid that keeps each column's x and takes y from a column-major
    /// table of source rows (`rows_by_column[x * height + y]`).
    pub fn from_column_rows(width: u32, height: u32, rows_by_column: &[f32]) -> Self {
        Self::from_fn(width, height, |x, y| {
            (x as f32, rows_by_column[x as usize * height as usize + y as usize])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source(&self, x: u32, y: u32) -> (f32, f32) {
        let idx = y as usize * self.width as usize + x as usize;
        (self.map_x[idx], self.map_y[idx])
    }
}

/// What a sample outside the source image reads.
#[derive(Debug, Clone, Copy)]
pub enum Border<P> {
    /// Clamp to the nearest edge pixel.
    Replicate,
    /// Read a fixed pixel value.
    Constant(P),
}

/// Resample `src` through `grid`. The output has the grid's dimensions.
pub fn remap<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    grid: &RemapGrid,
    interpolation: Interpolation,
    border: Border<P>,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (src_w, src_h) = (src.width() as i64, src.height() as i64);
    let raw = src.as_raw();
    let mut output: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(grid.width(), grid.height());
    let out_w = grid.width() as usize;

    let fetch = |xi: i64, yi: i64, c: usize| -> f32 {
        let inside = xi >= 0 && yi >= 0 && xi < src_w && yi < src_h;
        match border {
            _ if inside => raw[((yi * src_w + xi) as usize) * channels + c] as f32,
            Border::Replicate if src_w > 0 && src_h > 0 => {
                let cx = xi.clamp(0, src_w - 1);
                let cy = yi.clamp(0, src_h - 1);
                raw[((cy * src_w + cx) as usize) * channels + c] as f32
            }
            Border::Replicate => 0.0,
            Border::Constant(pixel) => pixel.channels()[c] as f32,
        }
    };

    let dst: &mut [u8] = &mut output;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let (sx, sy) = grid.source(x, y);
            let base = (y as usize * out_w + x as usize) * channels;
            for c in 0..channels {
                let value = match interpolation {
                    Interpolation::Nearest => fetch(sx.round() as i64, sy.round() as i64, c),
                    Interpolation::Bilinear => {
                        let x0 = sx.floor();
                        let y0 = sy.floor();
                        let fx = sx - x0;
                        let fy = sy - y0;
                        let (x0, y0) = (x0 as i64, y0 as i64);
                        let top = fetch(x0, y0, c) * (1.0 - fx) + fetch(x0 + 1, y0, c) * fx;
                        let bottom =
                            fetch(x0, y0 + 1, c) * (1.0 - fx) + fetch(x0 + 1, y0 + 1, c) * fx;
                        top * (1.0 - fy) + bottom * fy
                    }
                };
                dst[base + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    output
}
