//! Conic coefficients and geometric ellipses.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Matrix2, SymmetricEigen, Vector2};
use serde::{Deserialize, Serialize};

/// Implicit conic `A x² + B xy + C y² + D x + E y + F = 0`, stored as
/// `[A, B, C, D, E, F]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConicCoeffs(pub [f64; 6]);

/// Ellipse in pixel coordinates. `a ≥ b` after any conversion from a conic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    /// Semi-major axis.
    pub a: f64,
    /// Semi-minor axis.
    pub b: f64,
    /// Direction of the major axis from +x in radians, in (−π/2, π/2].
    pub angle: f64,
}

impl ConicCoeffs {
    /// Quadratic part of the conic as a symmetric 2×2 matrix.
    fn quadratic(&self) -> Matrix2<f64> {
        let [a, b, c, ..] = self.0;
        Matrix2::new(a, 0.5 * b, 0.5 * b, c)
    }

    /// True when the quadratic part is definite (`B² < 4AC`).
    pub fn is_ellipse(&self) -> bool {
        self.quadratic().determinant() > 0.0
    }

    /// Geometric parameters of a real, non-degenerate ellipse.
    pub fn to_ellipse(self) -> Option<Ellipse> {
        if !self.is_ellipse() {
            return None;
        }
        let q = self.quadratic();
        let [.., d, e, f] = self.0;
        let lin = Vector2::new(d, e);

        // Gradient vanishes at the center: 2 Q c + l = 0.
        let center = q.try_inverse()? * lin * -0.5;
        let level = f + 0.5 * lin.dot(&center);
        if !level.is_finite() || level.abs() < 1e-15 {
            return None;
        }

        let eig = SymmetricEigen::new(q);
        let semi = eig.eigenvalues.map(|lambda| -level / lambda);
        if semi.iter().any(|&s| s.is_nan() || s <= 0.0) {
            return None;
        }
        let major = if semi[0] >= semi[1] { 0 } else { 1 };
        let minor = 1 - major;
        let dir = eig.eigenvectors.column(major);

        let ellipse = Ellipse {
            cx: center.x,
            cy: center.y,
            a: semi[major].sqrt(),
            b: semi[minor].sqrt(),
            angle: normalize_angle(dir[1].atan2(dir[0])),
        };
        ellipse.is_valid().then_some(ellipse)
    }
}

impl Ellipse {
    /// Positive, finite axes and finite pose.
    pub fn is_valid(&self) -> bool {
        let finite = [self.cx, self.cy, self.a, self.b, self.angle]
            .iter()
            .all(|v| v.is_finite());
        finite && self.a > 0.0 && self.b > 0.0
    }

    /// Full length of the major axis.
    pub fn width(&self) -> f64 {
        2.0 * self.a
    }

    /// Full length of the minor axis.
    pub fn height(&self) -> f64 {
        2.0 * self.b
    }

    /// Enclosed area, `π a b`.
    pub fn area(&self) -> f64 {
        PI * self.a * self.b
    }
}

#[cfg(test)]
impl ConicCoeffs {
    /// Value of the implicit polynomial at `(x, y)`.
    pub(crate) fn algebraic_distance(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.0;
        x * (a * x + b * y + d) + y * (c * y + e) + f
    }
}

#[cfg(test)]
impl Ellipse {
    /// Implicit form, scaled so that `F` is `|c|²_Q − 1`.
    pub(crate) fn to_conic(self) -> ConicCoeffs {
        let rot = nalgebra::Rotation2::new(self.angle).into_inner();
        let axes = Matrix2::from_diagonal(&Vector2::new(
            1.0 / (self.a * self.a),
            1.0 / (self.b * self.b),
        ));
        let q = rot * axes * rot.transpose();
        let c = Vector2::new(self.cx, self.cy);
        let lin = q * c * -2.0;
        let f = c.dot(&(q * c)) - 1.0;
        ConicCoeffs([q[(0, 0)], 2.0 * q[(0, 1)], q[(1, 1)], lin.x, lin.y, f])
    }

    /// `n` boundary points at equal parameter steps.
    pub(crate) fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        let rot = nalgebra::Rotation2::new(self.angle);
        (0..n)
            .map(|i| {
                let t = 2.0 * PI * i as f64 / n as f64;
                let p = rot * Vector2::new(self.a * t.cos(), self.b * t.sin());
                [self.cx + p.x, self.cy + p.y]
            })
            .collect()
    }
}

fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(PI);
    if wrapped > FRAC_PI_2 {
        wrapped - PI
    } else {
        wrapped
    }
}
