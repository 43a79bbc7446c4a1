//! Multi-level dark-blob candidate search.
//!
//! A single threshold fails under variable lighting, so the normalized frame
//! is binarized at several dark levels. Each level is evaluated on its own:
//! outer boundaries of dark regions are traced, measured and kept when their
//! enclosed area is plausible for a pupil. The same blob usually shows up at
//! several levels; picking one is the scorer's job.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};

use crate::config::TrackerConfig;

/// Outer boundary of a dark region found at one threshold level.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Closed boundary polygon (pixel centers), straight runs compressed to
    /// their end points.
    pub points: Vec<[i32; 2]>,
    /// Area enclosed by `points` in pixels².
    pub area: f64,
    /// Length of the closed polygon `points` in pixels.
    pub perimeter: f64,
    /// Threshold level that produced this contour.
    pub threshold: u8,
}

/// Run every configured threshold level and collect size-plausible
/// candidates, in threshold order then discovery (raster) order.
pub fn find_candidates(normalized: &GrayImage, config: &TrackerConfig) -> Vec<Candidate> {
    let [min_area, max_area] = config.pupil_area_range;
    let mut out = Vec::new();
    for &threshold in &config.threshold_levels {
        let before = out.len();
        for points in outer_contours(normalized, threshold) {
            let area = polygon_area(&points);
            if !(area > min_area && area < max_area) {
                continue;
            }
            let perimeter = closed_perimeter(&points);
            tracing::trace!(
                threshold,
                area,
                perimeter,
                n_points = points.len(),
                "candidate contour"
            );
            out.push(Candidate {
                points,
                area,
                perimeter,
                threshold,
            });
        }
        tracing::trace!(threshold, kept = out.len() - before, "threshold level scanned");
    }
    out
}

/// Foreground mask of samples at or below `threshold`.
pub fn binarize_dark(frame: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = GrayImage::new(frame.width(), frame.height());
    for (dst, src) in mask.pixels_mut().zip(frame.pixels()) {
        *dst = Luma([if src[0] <= threshold { 255 } else { 0 }]);
    }
    mask
}

/// Compressed outer boundaries of the top-level dark regions at `threshold`.
/// Holes and regions nested inside holes are not reported.
pub fn outer_contours(frame: &GrayImage, threshold: u8) -> Vec<Vec<[i32; 2]>> {
    let mask = binarize_dark(frame, threshold);
    find_contours::<i32>(&mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let dense: Vec<[i32; 2]> = c.points.iter().map(|p| [p.x, p.y]).collect();
            compress_chain(&dense)
        })
        .collect()
}

/// Drop every boundary point that continues the previous step unchanged,
/// keeping only the corners of horizontal, vertical and diagonal runs.
pub fn compress_chain(points: &[[i32; 2]]) -> Vec<[i32; 2]> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |from: [i32; 2], to: [i32; 2]| [to[0] - from[0], to[1] - from[1]];
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[[i32; 2]]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i64 = (0..n)
        .map(|i| {
            let [x0, y0] = points[i];
            let [x1, y1] = points[(i + 1) % n];
            i64::from(x0) * i64::from(y1) - i64::from(x1) * i64::from(y0)
        })
        .sum();
    twice.abs() as f64 * 0.5
}

/// Length of a closed polygon, including the closing segment.
pub fn closed_perimeter(points: &[[i32; 2]]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let [x0, y0] = points[i];
            let [x1, y1] = points[(i + 1) % n];
            f64::from(x1 - x0).hypot(f64::from(y1 - y0))
        })
        .sum()
}
