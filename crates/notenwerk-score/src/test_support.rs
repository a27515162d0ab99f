// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic rasters shared by the unit tests.

use image::{GrayImage, Luma};

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Paint rows `rows` over columns `columns` with `value`.
pub fn fill(image: &mut GrayImage, rows: std::ops::Range<u32>, columns: std::ops::Range<u32>, value: u8) {
    for y in rows {
        for x in columns.clone() {
            image.put_pixel(x, y, Luma([value]));
        }
    }
}

/// 200x200 white page with five level 2px lines at y = 50, 75, .., 150
/// spanning x = 20..180.
pub fn ruled_page() -> GrayImage {
    let mut page = GrayImage::from_pixel(200, 200, WHITE);
    for y in [50u32, 75, 100, 125, 150] {
        fill(&mut page, y - 1..y + 1, 20..180, 0);
    }
    page
}

/// 120x96 score: a grey header block at rows 4..12 and two five-line staves
/// (1px lines, spacing 4) starting at rows 28 and 54, columns 10..110.
pub fn synthetic_score() -> GrayImage {
    let mut page = GrayImage::from_pixel(120, 96, WHITE);
    fill(&mut page, 4..12, 15..105, 60);
    for base in [28u32, 54] {
        for line in 0..5 {
            let y = base + line * 4;
            fill(&mut page, y..y + 1, 10..110, 0);
        }
    }
    page
}

/// 160x140 page with two widely separated staves and no header: rows
/// 30..51 and 90..111 once each staff's lines are merged.
pub fn two_system_page() -> GrayImage {
    let mut page = GrayImage::from_pixel(160, 140, WHITE);
    for base in [30u32, 90] {
        for line in 0..5 {
            let y = base + line * 5;
            fill(&mut page, y..y + 1, 10..150, 0);
        }
    }
    page
}

pub const STAFF_WIDTH: u32 = 160;
pub const STAFF_HEIGHT: u32 = 120;
pub const STAFF_BASELINE: f32 = 40.0;
pub const STAFF_SPACING: f32 = 6.0;

/// Centre row of staff line `line` at column `x` for a staff bent by a sine
/// of the given amplitude (one period across the width).
pub fn staff_line_centre(line: u32, x: u32, amplitude: f32) -> f32 {
    let phase = 2.0 * std::f32::consts::PI * x as f32 / STAFF_WIDTH as f32;
    STAFF_BASELINE + line as f32 * STAFF_SPACING + amplitude * phase.sin()
}

/// Binary mask (255 = line) of a five-line staff with 3px lines, bent by a
/// sine of `amplitude` pixels. All lines bend in phase so spacing stays even.
pub fn staff_mask(amplitude: f32) -> GrayImage {
    let mut mask = GrayImage::new(STAFF_WIDTH, STAFF_HEIGHT);
    for line in 0..5 {
        for x in 0..STAFF_WIDTH {
            let centre = staff_line_centre(line, x, amplitude).round() as u32;
            for y in centre - 1..=centre + 1 {
                mask.put_pixel(x, y, WHITE);
            }
        }
    }
    mask
}

/// Page counterpart of [`staff_mask`]: black lines on white paper.
pub fn staff_image(amplitude: f32) -> GrayImage {
    let mask = staff_mask(amplitude);
    GrayImage::from_fn(STAFF_WIDTH, STAFF_HEIGHT, |x, y| {
        if mask.get_pixel(x, y).0[0] > 0 { BLACK } else { WHITE }
    })
}
