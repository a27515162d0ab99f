// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation and correction.
//
// Staff lines are the longest straight strokes on a score page, so the page
// tilt is the mean orientation of long, nearly horizontal segments. Segments
// come from Hough peaks walked along the binarized page; when none survive the
// tilt filter, the raw Hough line orientations vote instead.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use notenwerk_core::{Interpolation, SkewConfig};
use tracing::{debug, info, instrument, warn};

use crate::raster::{Border, RemapGrid, otsu_binarize_inverted, remap, to_gray};

/// Skews smaller than this (degrees) are left alone.
const MIN_CORRECTION_DEGREES: f32 = 0.01;

/// Sigma matching a 5x5 Gaussian kernel.
const PRE_BLUR_SIGMA: f32 = 1.1;

/// Neighbouring Hough peaks closer than this (in r and degrees) are merged.
const SUPPRESSION_RADIUS: u32 = 8;

/// Half-width of the band searched on either side of a Hough line.
const WALK_BAND: i32 = 2;

/// Straight piece of a stroke, in image coordinates (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    p0: [f32; 2],
    p1: [f32; 2],
}

impl Segment {
    fn length(&self) -> f32 {
        (self.p1[0] - self.p0[0]).hypot(self.p1[1] - self.p0[1])
    }

    /// Orientation in [-90, 90] degrees.
    fn angle_degrees(&self) -> f32 {
        let dy = self.p1[1] - self.p0[1];
        let dx = self.p1[0] - self.p0[0];
        fold_degrees(dy.atan2(dx).to_degrees())
    }
}

/// Fold an orientation into [-90, 90]; lines have no direction.
fn fold_degrees(mut angle: f32) -> f32 {
    if angle > 90.0 {
        angle -= 180.0;
    }
    if angle < -90.0 {
        angle += 180.0;
    }
    angle
}

/// Estimate the page tilt in degrees.
///
/// Positive values mean the content must rotate counter-clockwise to become
/// level. Returns 0 when nothing line-like survives either pass; that is "no
/// detectable skew", not a failure.
#[instrument(skip(image, config), fields(width = image.width(), height = image.height()))]
pub fn estimate_skew(image: &DynamicImage, config: &SkewConfig) -> f32 {
    let binary = skew_binary(image);
    let limit = config.limit_degrees;
    let segments = detect_segments(&binary, config);
    let angles: Vec<f32> = segments
        .iter()
        .map(Segment::angle_degrees)
        .filter(|angle| angle.abs() <= limit)
        .collect();
    debug!(segments = segments.len(), voting = angles.len(), "Segment pass complete");

    if let Some(mean) = mean(&angles) {
        info!(angle = mean, "Skew estimated from segments");
        return mean;
    }

    warn!("No segment within the skew limit; falling back to Hough line orientations");
    let edges = canny(&binary, 50.0, 150.0);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: config.fallback_vote_threshold,
            suppression_radius: SUPPRESSION_RADIUS,
        },
    );
    let angles: Vec<f32> = lines
        .iter()
        .take(config.fallback_max_lines)
        .map(|line| fold_degrees(line.angle_in_degrees as f32 - 90.0))
        .filter(|angle| angle.abs() <= limit)
        .collect();

    match mean(&angles) {
        Some(mean) => {
            info!(angle = mean, lines = angles.len(), "Skew estimated from Hough fallback");
            mean
        }
        None => {
            warn!("No detectable skew");
            0.0
        }
    }
}

/// Equalized, lightly blurred page with ink as 255.
fn skew_binary(image: &DynamicImage) -> GrayImage {
    let gray = equalize_histogram(&to_gray(image));
    let blurred = gaussian_blur_f32(&gray, PRE_BLUR_SIGMA);
    let (binary, level) = otsu_binarize_inverted(&blurred);
    debug!(level, "Skew binarization threshold");
    binary
}

/// Estimate the tilt and rotate it away.
///
/// Returns the corrected page and the applied angle. Tilts below 0.01 degrees
/// yield an unrotated copy and an angle of 0. Output dimensions always match
/// the input; uncovered corners replicate the nearest border pixel.
#[instrument(skip(image, config))]
pub fn deskew(image: &DynamicImage, config: &SkewConfig) -> (DynamicImage, f32) {
    let angle = estimate_skew(image, config);
    if angle.abs() < MIN_CORRECTION_DEGREES {
        return (image.clone(), 0.0);
    }
    info!(angle, "Deskewing page");
    (rotate_about_center(image, angle), angle)
}

/// Rotate counter-clockwise by `degrees` about the image centre, keeping the
/// canvas size. Bilinear sampling, replicated borders.
pub fn rotate_about_center(image: &DynamicImage, degrees: f32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let cx = (width / 2) as f32;
    let cy = (height / 2) as f32;
    let (sin, cos) = degrees.to_radians().sin_cos();

    // Inverse mapping: output pixel -> source location.
    let grid = RemapGrid::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        (cx + cos * dx - sin * dy, cy + sin * dx + cos * dy)
    });

    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(remap(
            gray,
            &grid,
            Interpolation::Bilinear,
            Border::Replicate,
        )),
        other => DynamicImage::ImageRgb8(remap(
            &other.to_rgb8(),
            &grid,
            Interpolation::Bilinear,
            Border::Replicate,
        )),
    }
}

/// Long straight segments of foreground, at most `config.max_segments`.
///
/// Every Hough peak is walked pixel by pixel; foreground found within a
/// narrow band around the line is chained into runs that tolerate gaps of up
/// to `max_line_gap`. Runs at least half the image width long (10px minimum)
/// become segments whose endpoints lie on a least-squares fit of the run.
fn detect_segments(binary: &GrayImage, config: &SkewConfig) -> Vec<Segment> {
    let min_length = (binary.width() / 2).max(10) as f32;
    let peaks = detect_lines(
        binary,
        LineDetectionOptions {
            vote_threshold: config.segment_vote_threshold,
            suppression_radius: SUPPRESSION_RADIUS,
        },
    );
    debug!(peaks = peaks.len(), min_length, "Hough peaks for segment walk");

    let mut segments = Vec::new();
    for line in &peaks {
        for segment in walk_line(binary, line, config.max_line_gap as f32) {
            if segment.length() >= min_length {
                segments.push(segment);
                if segments.len() >= config.max_segments {
                    return segments;
                }
            }
        }
    }
    segments
}

/// Chain the foreground along one polar line into fitted segments.
fn walk_line(binary: &GrayImage, line: &PolarLine, max_gap: f32) -> Vec<Segment> {
    let (width, height) = (binary.width() as i32, binary.height() as i32);
    let theta = (line.angle_in_degrees as f32).to_radians();
    let normal = [theta.cos(), theta.sin()];
    let direction = [-normal[1], normal[0]];
    let origin = [line.r * normal[0], line.r * normal[1]];
    let reach = (width as f32).hypot(height as f32).ceil() as i32;

    let mut segments = Vec::new();
    let mut run: Vec<[f32; 2]> = Vec::new();
    let mut last_hit = f32::NEG_INFINITY;

    for step in -reach..=reach {
        let t = step as f32;
        let base = [origin[0] + t * direction[0], origin[1] + t * direction[1]];

        let mut hits = 0u32;
        let mut centroid = [0.0f32; 2];
        for offset in -WALK_BAND..=WALK_BAND {
            let px = (base[0] + offset as f32 * normal[0]).round() as i32;
            let py = (base[1] + offset as f32 * normal[1]).round() as i32;
            if px < 0 || py < 0 || px >= width || py >= height {
                continue;
            }
            if binary.get_pixel(px as u32, py as u32).0[0] > 0 {
                hits += 1;
                centroid[0] += px as f32;
                centroid[1] += py as f32;
            }
        }
        if hits == 0 {
            continue;
        }

        if t - last_hit > max_gap + 1.0 && !run.is_empty() {
            segments.extend(fit_segment(&run));
            run.clear();
        }
        run.push([centroid[0] / hits as f32, centroid[1] / hits as f32]);
        last_hit = t;
    }
    segments.extend(fit_segment(&run));
    segments
}

/// Principal-axis fit of a run; endpoints are the first and last points
/// projected onto the fitted line.
fn fit_segment(points: &[[f32; 2]]) -> Option<Segment> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f32;
    let mx = points.iter().map(|p| p[0]).sum::<f32>() / n;
    let my = points.iter().map(|p| p[1]).sum::<f32>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let (dx, dy) = (p[0] - mx, p[1] - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let phi = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let axis = [phi.cos(), phi.sin()];
    let project = |p: &[f32; 2]| {
        let s = (p[0] - mx) * axis[0] + (p[1] - my) * axis[1];
        [mx + s * axis[0], my + s * axis[1]]
    };
    let first = points.first()?;
    let last = points.last()?;
    Some(Segment {
        p0: project(first),
        p1: project(last),
    })
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fill, ruled_page};
    use image::{GrayImage, Luma};

    #[test]
    fn level_staff_has_no_skew() {
        let page = DynamicImage::ImageLuma8(ruled_page());
        let angle = estimate_skew(&page, &SkewConfig::default());
        assert!(angle.abs() < 0.5, "angle {angle}");
    }

    #[test]
    fn rotated_staff_is_detected_and_corrected() {
        let page = DynamicImage::ImageLuma8(ruled_page());
        let rotated = rotate_about_center(&page, -8.0);
        let config = SkewConfig::default();

        let initial = estimate_skew(&rotated, &config);
        assert!((initial - 8.0).abs() < 1.0, "initial {initial}");

        let (corrected, applied) = deskew(&rotated, &config);
        assert!(applied.abs() > 1.0);
        assert_eq!(corrected.width(), rotated.width());
        assert_eq!(corrected.height(), rotated.height());

        let residual = estimate_skew(&corrected, &config);
        assert!(residual.abs() < 1.0, "residual {residual}");
        assert!(residual.abs() < initial.abs());
    }

    /// 800x600 page with five 3px lines only 360px long, well short of the
    /// half-width a segment needs.
    fn short_lines_page() -> DynamicImage {
        let mut page = GrayImage::from_pixel(800, 600, Luma([255u8]));
        for y in [220u32, 260, 300, 340, 380] {
            fill(&mut page, y - 1..y + 2, 220..580, 0);
        }
        DynamicImage::ImageLuma8(page)
    }

    #[test]
    fn short_lines_fall_back_to_hough_orientations() {
        let config = SkewConfig::default();
        for tilt in [-6.0f32, 0.0, 4.0] {
            let rotated = rotate_about_center(&short_lines_page(), tilt);
            assert!(detect_segments(&skew_binary(&rotated), &config).is_empty());

            let angle = estimate_skew(&rotated, &config);
            assert!((angle + tilt).abs() < 1.0, "tilt {tilt}, estimated {angle}");
        }
    }

    #[test]
    fn walk_reach_does_not_overflow_on_huge_pages() {
        let line = PolarLine {
            r: 0.0,
            angle_in_degrees: 90,
        };
        let binary = GrayImage::new(50_000, 1);
        assert!(walk_line(&binary, &line, 20.0).is_empty());
    }

    #[test]
    fn blank_page_reports_zero_and_deskew_copies() {
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([255u8])));
        let (corrected, applied) = deskew(&page, &SkewConfig::default());
        assert_eq!(applied, 0.0);
        assert_eq!(corrected, page);
    }

    #[test]
    fn angles_fold_into_half_turn() {
        assert_eq!(fold_degrees(172.0), -8.0);
        assert_eq!(fold_degrees(-172.0), 8.0);
        let segment = Segment {
            p0: [100.0, 10.0],
            p1: [0.0, 0.0],
        };
        assert!((segment.angle_degrees() - 5.710_593).abs() < 1e-3);
    }

    #[test]
    fn rotation_by_zero_is_identity() {
        let page = DynamicImage::ImageLuma8(ruled_page());
        assert_eq!(rotate_about_center(&page, 0.0), page);
    }
}
