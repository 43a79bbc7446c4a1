//! Ellipse-specific direct least squares (Fitzgibbon, Pilu & Fisher).
//!
//! Minimizes the algebraic residual subject to `4AC − B² = 1`, which makes
//! every non-degenerate solution an ellipse. The 6×6 generalized eigenproblem
//! is reduced to a 3×3 one on the quadratic coefficients (Halíř & Flusser).

use nalgebra::{Matrix3, Vector3};

use super::eigen::ellipse_eigenvector;
use super::types::{ConicCoeffs, Ellipse};

/// Minimum number of boundary points needed to determine an ellipse.
pub const MIN_FIT_POINTS: usize = 5;

/// Fit a conic to 2D points with the ellipse-specific direct least-squares
/// method.
///
/// Points are shifted to their centroid and scaled to a mean radius of √2
/// before building the scatter matrix, then the coefficients are mapped back
/// to image coordinates. Returns `None` for fewer than [`MIN_FIT_POINTS`]
/// points or when the result is not a proper ellipse (collinear or
/// duplicated points).
pub fn fit_conic_direct(points: &[[f64; 2]]) -> Option<ConicCoeffs> {
    if points.len() < MIN_FIT_POINTS {
        return None;
    }
    let frame = Normalization::of(points);

    // Scatter blocks for the quadratic [x², xy, y²] and linear [x, y, 1] terms.
    let mut s_qq = Matrix3::<f64>::zeros();
    let mut s_ql = Matrix3::<f64>::zeros();
    let mut s_ll = Matrix3::<f64>::zeros();
    for &p in points {
        let [x, y] = frame.apply(p);
        let quad = Vector3::new(x * x, x * y, y * y);
        let lin = Vector3::new(x, y, 1.0);
        s_qq += quad * quad.transpose();
        s_ql += quad * lin.transpose();
        s_ll += lin * lin.transpose();
    }

    // Linear coefficients are eliminated: l = T q with T = −S_ll⁻¹ S_qlᵀ.
    let elim = -(s_ll.try_inverse()? * s_ql.transpose());
    let reduced = s_qq + s_ql * elim;
    // Inverse of the constraint block [[0,0,2],[0,−1,0],[2,0,0]].
    let constraint_inv = Matrix3::new(0.0, 0.0, 0.5, 0.0, -1.0, 0.0, 0.5, 0.0, 0.0);

    let quad = ellipse_eigenvector(&(constraint_inv * reduced))?;
    let lin = elim * quad;

    let conic = frame.unapply([quad[0], quad[1], quad[2], lin[0], lin[1], lin[2]]);
    conic.to_ellipse().filter(Ellipse::is_valid)?;
    Some(conic)
}

/// Fit an ellipse and return its geometric parameters.
pub fn fit_ellipse_direct(points: &[[f64; 2]]) -> Option<Ellipse> {
    fit_conic_direct(points)?.to_ellipse()
}

/// Similarity `p' = s (p − m)` that centers the points and brings their
/// mean distance from the centroid to √2.
struct Normalization {
    mean: [f64; 2],
    scale: f64,
}

impl Normalization {
    fn of(points: &[[f64; 2]]) -> Self {
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
        let mean = [sx / n, sy / n];
        let spread = points
            .iter()
            .map(|p| (p[0] - mean[0]).hypot(p[1] - mean[1]))
            .sum::<f64>()
            / n;
        let scale = if spread > 1e-15 {
            std::f64::consts::SQRT_2 / spread
        } else {
            1.0
        };
        Self { mean, scale }
    }

    fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.mean[0]) * self.scale,
            (p[1] - self.mean[1]) * self.scale,
        ]
    }

    /// Express a conic fitted in normalized coordinates in image coordinates:
    /// with `p' = H p` in homogeneous form the conic matrix becomes `Hᵀ C H`.
    fn unapply(&self, c: [f64; 6]) -> ConicCoeffs {
        let [a, b, cc, d, e, f] = c;
        let m = Matrix3::new(a, 0.5 * b, 0.5 * d, 0.5 * b, cc, 0.5 * e, 0.5 * d, 0.5 * e, f);
        let s = self.scale;
        let (tx, ty) = (-s * self.mean[0], -s * self.mean[1]);
        let h = Matrix3::new(s, 0.0, tx, 0.0, s, ty, 0.0, 0.0, 1.0);
        let w = h.transpose() * m * h;
        ConicCoeffs([
            w[(0, 0)],
            2.0 * w[(0, 1)],
            w[(1, 1)],
            2.0 * w[(0, 2)],
            2.0 * w[(1, 2)],
            w[(2, 2)],
        ])
    }
}
