// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grayscale erosion and dilation with one-pixel-thick line elements.
//
// Staff work only ever needs horizontal and vertical lines, so each pass is a
// sliding min/max along rows or columns, linear in the image size regardless
// of the element length. Pixels outside the image never win the min/max.
// Dilation uses the reflected element, so openings and closings with an
// even-length element do not shift strokes.

use std::collections::VecDeque;

use image::GrayImage;

/// Orientation of a line structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A rectangular structuring element one pixel thick.
///
/// The anchor sits at `length / 2`, so for pixel `i` the erosion window
/// covers `[i - length/2, i - length/2 + length)`; dilation mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineElement {
    pub axis: Axis,
    pub length: u32,
}

impl LineElement {
    pub fn horizontal(length: u32) -> Self {
        Self {
            axis: Axis::Horizontal,
            length: length.max(1),
        }
    }

    pub fn vertical(length: u32) -> Self {
        Self {
            axis: Axis::Vertical,
            length: length.max(1),
        }
    }
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

impl Extreme {
    /// True when `incoming` makes `queued` irrelevant for every later window.
    fn supersedes(self, incoming: u8, queued: u8) -> bool {
        match self {
            Self::Min => incoming <= queued,
            Self::Max => incoming >= queued,
        }
    }
}

/// Minimum filter under `element`.
pub fn erode(image: &GrayImage, element: LineElement) -> GrayImage {
    apply(image, element, Extreme::Min)
}

/// Maximum filter under `element`, repeated `iterations` times.
pub fn dilate(image: &GrayImage, element: LineElement, iterations: u32) -> GrayImage {
    let mut current = image.clone();
    for _ in 0..iterations {
        current = apply(&current, element, Extreme::Max);
    }
    current
}

fn apply(image: &GrayImage, element: LineElement, extreme: Extreme) -> GrayImage {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut output = image.clone();
    if width == 0 || height == 0 || element.length <= 1 {
        return output;
    }
    let length = element.length as usize;
    let src: &[u8] = image.as_raw();
    let dst: &mut [u8] = &mut output;

    match element.axis {
        Axis::Horizontal => {
            for y in 0..height {
                let row = y * width..(y + 1) * width;
                sliding_extreme(&src[row.clone()], &mut dst[row], length, extreme);
            }
        }
        Axis::Vertical => {
            let mut column = vec![0u8; height];
            let mut filtered = vec![0u8; height];
            for x in 0..width {
                for (y, value) in column.iter_mut().enumerate() {
                    *value = src[y * width + x];
                }
                sliding_extreme(&column, &mut filtered, length, extreme);
                for (y, value) in filtered.iter().enumerate() {
                    dst[y * width + x] = *value;
                }
            }
        }
    }
    output
}

/// Monotonic-deque running min/max over a window of `length` samples
/// anchored at `length / 2` (reflected for the max), truncated at both ends
/// of the line.
fn sliding_extreme(line: &[u8], out: &mut [u8], length: usize, extreme: Extreme) {
    let n = line.len();
    let (anchor, reach) = match extreme {
        Extreme::Min => (length / 2, length - 1 - length / 2),
        Extreme::Max => (length - 1 - length / 2, length / 2),
    };
    let mut window: VecDeque<usize> = VecDeque::with_capacity(length);
    let mut next = 0usize;

    for (i, slot) in out.iter_mut().enumerate().take(n) {
        let hi = (i + reach).min(n - 1);
        while next <= hi {
            while let Some(&back) = window.back() {
                if extreme.supersedes(line[next], line[back]) {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(next);
            next += 1;
        }
        let lo = i.saturating_sub(anchor);
        while let Some(&front) = window.front() {
            if front < lo {
                window.pop_front();
            } else {
                break;
            }
        }
        if let Some(&front) = window.front() {
            *slot = line[front];
        }
    }
}
