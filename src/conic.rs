//! Conics and the least-squares conic fitter used by the circle builder.
use crate::error::{RectifyError, Result};
use crate::linalg::{normalization_transform, smallest_right_vector};
use crate::params::Tolerances;
use nalgebra::{DMatrix, Matrix3};
use serde::Serialize;

/// General conic `A x² + B xy + C y² + D x + E y + F = 0`, stored as
/// `[A, B, C, D, E, F]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Conic {
    pub coeffs: [f64; 6],
}

impl Conic {
    pub const fn from_coeffs(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    /// Symmetric matrix form; off-diagonal entries hold half the cross
    /// coefficients so that `p^T M p` equals the polynomial.
    pub fn matrix(&self) -> Matrix3<f64> {
        let [a, b, c, d, e, f] = self.coeffs;
        Matrix3::new(
            a,
            b / 2.0,
            d / 2.0,
            b / 2.0,
            c,
            e / 2.0,
            d / 2.0,
            e / 2.0,
            f,
        )
    }

    /// Inverse of [`Conic::matrix`]. Asymmetric input is symmetrised by
    /// summing the mirrored entries.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self::from_coeffs([
            m[(0, 0)],
            m[(0, 1)] + m[(1, 0)],
            m[(1, 1)],
            m[(0, 2)] + m[(2, 0)],
            m[(1, 2)] + m[(2, 1)],
            m[(2, 2)],
        ])
    }

    /// Polynomial value at `(x, y)`.
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d, e, f] = self.coeffs;
        a * x * x + b * x * y + c * y * y + d * x + e * y + f
    }

    /// Coefficient vector scaled to unit length.
    pub fn normalized(&self) -> Self {
        let n = self.coeffs.iter().map(|v| v * v).sum::<f64>().sqrt();
        if n == 0.0 {
            return *self;
        }
        Self::from_coeffs(self.coeffs.map(|v| v / n))
    }

    /// `B² − 4AC < 0`.
    pub fn is_ellipse(&self) -> bool {
        let [a, b, c, ..] = self.coeffs;
        b * b - 4.0 * a * c < 0.0
    }
}

/// Least-squares conic through `points` (at least five).
///
/// Points are shifted and scaled to unit mean distance before building the
/// design matrix with rows `[x², xy, y², x, y, 1]`; the conic is the right
/// singular vector of the smallest singular value, mapped back to pixel
/// coordinates. A second singular value that is not well separated from the
/// largest one (collinear or duplicated points) is reported as
/// [`RectifyError::IllConditionedFit`].
pub fn fit_conic(points: &[[f64; 2]], tol: &Tolerances) -> Result<Conic> {
    if points.len() < 5 {
        return Err(RectifyError::TooFewPoints {
            needed: 5,
            got: points.len(),
        });
    }
    let t = normalization_transform(points, tol.eps)
        .ok_or(RectifyError::IllConditionedFit { ratio: 0.0 })?;

    let mut design = DMatrix::<f64>::zeros(points.len(), 6);
    for (r, p) in points.iter().enumerate() {
        let x = t[(0, 0)] * p[0] + t[(0, 2)];
        let y = t[(1, 1)] * p[1] + t[(1, 2)];
        let row = [x * x, x * y, y * y, x, y, 1.0];
        for (c, v) in row.iter().enumerate() {
            design[(r, c)] = *v;
        }
    }

    let (v, separation) = smallest_right_vector(&design)?;
    if separation < tol.fit_separation {
        return Err(RectifyError::IllConditionedFit { ratio: separation });
    }
    let normalized = Conic::from_coeffs([v[0], v[1], v[2], v[3], v[4], v[5]]);
    let m = t.transpose() * normalized.matrix() * t;
    Ok(Conic::from_matrix(&m).normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_proportional(got: &Conic, expected: [f64; 6]) {
        let e = Conic::from_coeffs(expected).normalized();
        let g = got.normalized();
        let sign = if g.coeffs[0] * e.coeffs[0] < 0.0 { -1.0 } else { 1.0 };
        for k in 0..6 {
            assert!(
                (sign * g.coeffs[k] - e.coeffs[k]).abs() < 1e-8,
                "coefficient {k}: {:?} vs {:?}",
                g.coeffs,
                e.coeffs
            );
        }
    }

    fn ellipse_points(n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|k| {
                let t = 0.3 + k as f64 * 1.1;
                [10.0 + 4.0 * t.cos(), 5.0 + 2.0 * t.sin()]
            })
            .collect()
    }

    #[test]
    fn five_points_recover_axis_aligned_ellipse() {
        let conic = fit_conic(&ellipse_points(5), &Tolerances::default()).unwrap();
        assert_proportional(&conic, [1.0, 0.0, 4.0, -20.0, -40.0, 184.0]);
        assert!(conic.is_ellipse());
    }

    #[test]
    fn overdetermined_fit_passes_through_samples() {
        let pts = ellipse_points(12);
        let conic = fit_conic(&pts, &Tolerances::default()).unwrap();
        let scale = conic.coeffs.iter().map(|v| v.abs()).fold(0.0, f64::max);
        for p in &pts {
            assert!(conic.eval(p[0], p[1]).abs() < 1e-9 * scale * 200.0);
        }
    }

    #[test]
    fn collinear_points_are_ill_conditioned() {
        let pts: Vec<[f64; 2]> = (0..5).map(|k| [k as f64, 2.0 * k as f64 + 1.0]).collect();
        assert!(matches!(
            fit_conic(&pts, &Tolerances::default()),
            Err(RectifyError::IllConditionedFit { .. })
        ));
    }

    #[test]
    fn too_few_points() {
        let pts = ellipse_points(4);
        assert_eq!(
            fit_conic(&pts, &Tolerances::default()),
            Err(RectifyError::TooFewPoints { needed: 5, got: 4 })
        );
    }

    #[test]
    fn matrix_form_round_trip_halves_cross_terms() {
        let c = Conic::from_coeffs([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let m = c.matrix();
        assert_eq!(m[(0, 1)], 1.0);
        assert_eq!(m[(1, 2)], 2.5);
        assert_eq!(Conic::from_matrix(&m), c);
        let p = nalgebra::Vector3::new(0.5, -1.5, 1.0);
        assert!(((p.transpose() * m * p)[0] - c.eval(0.5, -1.5)).abs() < 1e-12);
    }
}
