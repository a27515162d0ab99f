// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staff-line curve tracing.
//
// Each column of a staff mask contributes candidate line centres (the
// midpoints of its vertical foreground runs). Walking left to right, a column
// with enough candidates picks the subset closest to the previous column's
// lines; sparser columns inherit the previous lines unchanged. Columns before
// the first anchor are filled afterwards by interpolation, then every curve
// is smoothed.

use image::GrayImage;
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::StaffLinePaths;
use tracing::{debug, info, instrument};

/// Above this many combinations per column, selection switches from
/// enumeration to dynamic programming.
const EXHAUSTIVE_LIMIT: u64 = 20_000;

/// Follow `expected_lines` staff lines across every column of `mask`.
///
/// Fails with `InvalidConfiguration` when `expected_lines` is 0, with
/// `MaskEmpty` when the mask has no foreground, and with
/// `InsufficientStaffLines` when no column shows enough lines to anchor on.
#[instrument(skip(mask), fields(width = mask.width(), height = mask.height()))]
pub fn trace_lines(
    mask: &GrayImage,
    expected_lines: usize,
    smoothing_window: usize,
) -> Result<StaffLinePaths> {
    if expected_lines == 0 {
        return Err(NotenwerkError::InvalidConfiguration(
            "expected_lines must be positive".into(),
        ));
    }

    let candidates: Vec<Vec<f32>> = (0..mask.width()).map(|x| column_centres(mask, x)).collect();
    if candidates.iter().all(Vec::is_empty) {
        return Err(NotenwerkError::MaskEmpty);
    }

    // Forward pass: select where possible, propagate otherwise.
    let mut columns: Vec<Option<Vec<f32>>> = Vec::with_capacity(candidates.len());
    let mut previous: Option<Vec<f32>> = None;
    let mut anchored = 0usize;
    for centres in &candidates {
        if centres.len() >= expected_lines {
            let chosen = select_lines(centres, expected_lines, previous.as_deref());
            previous = Some(chosen);
            anchored += 1;
        }
        columns.push(previous.clone());
    }
    if previous.is_none() {
        return Err(NotenwerkError::InsufficientStaffLines {
            expected: expected_lines,
        });
    }
    debug!(anchored, columns = columns.len(), "Forward pass complete");

    // Gap filling and smoothing, one curve at a time.
    let mut lines = Vec::with_capacity(expected_lines);
    for line in 0..expected_lines {
        let samples: Vec<Option<f32>> = columns
            .iter()
            .map(|column| column.as_ref().map(|positions| positions[line]))
            .collect();
        let filled = interpolate_gaps(&samples).ok_or(NotenwerkError::InsufficientStaffLines {
            expected: expected_lines,
        })?;
        lines.push(smooth(&filled, smoothing_window));
    }

    info!(lines = expected_lines, anchored, "Staff lines traced");
    StaffLinePaths::from_lines(lines)
}

/// Midpoints of the vertical foreground runs in column `x`, top to bottom.
fn column_centres(mask: &GrayImage, x: u32) -> Vec<f32> {
    let mut centres = Vec::new();
    let mut start: Option<u32> = None;
    for y in 0..mask.height() {
        match (mask.get_pixel(x, y).0[0] > 0, start) {
            (true, None) => start = Some(y),
            (false, Some(s)) => {
                centres.push((s + y - 1) as f32 / 2.0);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        centres.push((s + mask.height() - 1) as f32 / 2.0);
    }
    centres
}

/// Pick `k` of the ascending `candidates` minimising the squared distance to
/// `previous`. Ties go to the lexicographically first choice; without a
/// previous column every choice costs nothing, so the topmost `k` win.
fn select_lines(candidates: &[f32], k: usize, previous: Option<&[f32]>) -> Vec<f32> {
    let indices = match previous {
        None => (0..k).collect(),
        Some(previous) if combination_count(candidates.len(), k) <= EXHAUSTIVE_LIMIT => {
            exhaustive_selection(candidates, previous)
        }
        Some(previous) => dp_selection(candidates, previous),
    };
    indices.into_iter().map(|i| candidates[i]).collect()
}

/// `n` choose `k`, saturating.
fn combination_count(n: usize, k: usize) -> u64 {
    let k = k.min(n.saturating_sub(k)) as u64;
    let mut count = 1u64;
    for i in 0..k {
        count = count.saturating_mul(n as u64 - i) / (i + 1);
        if count > EXHAUSTIVE_LIMIT {
            return u64::MAX;
        }
    }
    count
}

fn squared_distance(candidate: f32, target: f32) -> f64 {
    let d = candidate as f64 - target as f64;
    d * d
}

fn exhaustive_selection(candidates: &[f32], previous: &[f32]) -> Vec<usize> {
    let cost = |indices: &[usize]| -> f64 {
        indices
            .iter()
            .zip(previous)
            .map(|(&i, &target)| squared_distance(candidates[i], target))
            .sum()
    };

    let mut indices: Vec<usize> = (0..previous.len()).collect();
    let mut best = indices.clone();
    let mut best_cost = cost(&indices);
    while next_combination(&mut indices, candidates.len()) {
        let c = cost(&indices);
        if c < best_cost {
            best_cost = c;
            best.clone_from(&indices);
        }
    }
    best
}

/// Advance `indices` to the next combination in lexicographic order.
fn next_combination(indices: &mut [usize], n: usize) -> bool {
    let k = indices.len();
    let Some(i) = (0..k).rev().find(|&i| indices[i] < n - k + i) else {
        return false;
    };
    indices[i] += 1;
    for j in i + 1..k {
        indices[j] = indices[j - 1] + 1;
    }
    true
}

/// Order-preserving assignment of lines to candidates.
///
/// `best[i][j]` is the cheapest way to place lines `i..k` on candidates
/// `j..n`. Reconstruction takes a candidate whenever taking it is optimal,
/// which yields the lexicographically first optimum.
fn dp_selection(candidates: &[f32], previous: &[f32]) -> Vec<usize> {
    let (n, k) = (candidates.len(), previous.len());
    let mut best = vec![vec![f64::INFINITY; n + 1]; k + 1];
    best[k].fill(0.0);

    let take = |best: &[Vec<f64>], i: usize, j: usize| {
        squared_distance(candidates[j], previous[i]) + best[i + 1][j + 1]
    };
    for i in (0..k).rev() {
        for j in (0..n).rev() {
            best[i][j] = take(&best, i, j).min(best[i][j + 1]);
        }
    }

    let mut chosen = Vec::with_capacity(k);
    let mut j = 0;
    for i in 0..k {
        while take(&best, i, j) > best[i][j] {
            j += 1;
        }
        chosen.push(j);
        j += 1;
    }
    chosen
}

/// Linear interpolation over the undefined samples, holding the nearest
/// defined value beyond either end. `None` if nothing is defined.
fn interpolate_gaps(samples: &[Option<f32>]) -> Option<Vec<f32>> {
    let known: Vec<(usize, f32)> = samples
        .iter()
        .enumerate()
        .filter_map(|(x, value)| value.map(|v| (x, v)))
        .collect();
    let (&(_, first), &(_, last)) = (known.first()?, known.last()?);

    let filled = (0..samples.len())
        .map(|x| {
            let after = known.partition_point(|&(kx, _)| kx < x);
            match (after.checked_sub(1).map(|i| known[i]), known.get(after)) {
                (_, Some(&(kx, v))) if kx == x => v,
                (None, _) => first,
                (Some(_), None) => last,
                (Some((x0, y0)), Some(&(x1, y1))) => {
                    let t = (x - x0) as f32 / (x1 - x0) as f32;
                    y0 + t * (y1 - y0)
                }
            }
        })
        .collect();
    Some(filled)
}

/// Centred moving average with edge padding. Even windows shrink by one;
/// windows of 1 or less leave the curve untouched.
fn smooth(curve: &[f32], window: usize) -> Vec<f32> {
    let window = if window % 2 == 0 { window.saturating_sub(1) } else { window };
    if window <= 1 || curve.is_empty() {
        return curve.to_vec();
    }
    let radius = (window / 2) as isize;
    let last = curve.len() as isize - 1;
    (0..=last)
        .map(|i| {
            let total: f32 = (i - radius..=i + radius)
                .map(|j| curve[j.clamp(0, last) as usize])
                .sum();
            total / window as f32
        })
        .collect()
}
