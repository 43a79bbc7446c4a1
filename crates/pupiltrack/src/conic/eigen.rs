//! Eigenvector selection for the reduced 3×3 ellipse-fit system.
//!
//! The system matrix is not symmetric, so eigenvalues are taken from the
//! characteristic cubic in closed form and each eigenvector from the null
//! space of `A − λI`.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Vector3};

/// Eigenvector of `system` satisfying the ellipse constraint
/// `4 v₀ v₂ − v₁² > 0`.
///
/// Noise-free or near-degenerate input can produce several admissible
/// eigenpairs; the one with the smallest |λ| (lowest algebraic residual) is
/// returned.
pub(crate) fn ellipse_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    // Characteristic polynomial λ³ − tr λ² + m λ − det, with m the sum of
    // principal 2×2 minors.
    let tr = system.trace();
    let m = 0.5 * (tr * tr - (system * system).trace());
    let det = system.determinant();

    real_cubic_roots(-tr, m, -det)
        .into_iter()
        .filter_map(|lambda| {
            let v = null_vector(&(system - Matrix3::from_diagonal_element(lambda)))?;
            (4.0 * v[0] * v[2] > v[1] * v[1]).then_some((lambda.abs(), v))
        })
        .min_by(|l, r| l.0.total_cmp(&r.0))
        .map(|(_, v)| v)
}

/// Unit vector spanning the null space of a rank-2 matrix.
///
/// Each cross product of two rows is orthogonal to the whole row space; the
/// largest one is the best conditioned.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [0, 1, 2].map(|i| m.row(i).transpose());
    let best = [(0, 1), (0, 2), (1, 2)]
        .into_iter()
        .map(|(i, j)| rows[i].cross(&rows[j]))
        .max_by(|l, r| l.norm_squared().total_cmp(&r.norm_squared()))?;
    let norm = best.norm();
    if norm.is_nan() || norm < 1e-15 {
        return None;
    }
    Some(best / norm)
}

/// Real roots of `x³ + b x² + c x + d`: three values when all roots are
/// real, otherwise the single real one.
fn real_cubic_roots(b: f64, c: f64, d: f64) -> Vec<f64> {
    // Substitute x = t − b/3 to get t³ + p t + q.
    let offset = b / 3.0;
    let p = c - b * offset;
    let q = d - c * offset + 2.0 * offset.powi(3);

    let half_q = 0.5 * q;
    let third_p = p / 3.0;
    let delta = half_q * half_q + third_p.powi(3);

    if delta > 0.0 {
        // One real root (Cardano).
        let s = delta.sqrt();
        return vec![(-half_q + s).cbrt() + (-half_q - s).cbrt() - offset];
    }

    // Three real roots (Viète); p ≤ 0 here.
    let amp = 2.0 * (-third_p).max(0.0).sqrt();
    if amp < 1e-15 {
        return vec![-offset; 3];
    }
    let phi = (3.0 * q / (p * amp)).clamp(-1.0, 1.0).acos() / 3.0;
    (0..3)
        .map(|k| amp * (phi - 2.0 * PI * f64::from(k) / 3.0).cos() - offset)
        .collect()
}
