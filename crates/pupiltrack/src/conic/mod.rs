//! Pupil boundary model: implicit conics, geometric ellipses and the
//! ellipse-specific direct least-squares fit.

mod eigen;
mod fit;
mod types;

pub use fit::{fit_conic_direct, fit_ellipse_direct, MIN_FIT_POINTS};
pub use types::{ConicCoeffs, Ellipse};

/// Fit the pupil ellipse to integer contour points.
pub fn fit_contour_ellipse(points: &[[i32; 2]]) -> Option<Ellipse> {
    let pts: Vec<[f64; 2]> = points
        .iter()
        .map(|&[x, y]| [f64::from(x), f64::from(y)])
        .collect();
    fit_ellipse_direct(&pts)
}
