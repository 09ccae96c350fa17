use crate::types::Homography;
use nalgebra::{Matrix3, Vector3};

/// Post-compose `h` with an axis scaling, mapping the target plane onto a
/// raster of a different resolution.
pub fn scale_homography(h: &Homography, sx: f64, sy: f64) -> Homography {
    if !(sx.is_finite() && sy.is_finite()) || sx == 0.0 || sy == 0.0 {
        return *h;
    }
    let scale = Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0);
    scale * h
}

/// Fix the overall scale: `H[2][2] = 1` when `|H[2][2]| > eps·|H|`, unit
/// Frobenius norm otherwise.
pub fn normalize_homography(h: &Homography, eps: f64) -> Homography {
    let n = h.norm();
    if n == 0.0 || !n.is_finite() {
        return *h;
    }
    let h22 = h[(2, 2)];
    if h22.abs() > eps * n {
        h / h22
    } else {
        h / n
    }
}

/// Sign of the Jacobian determinant of `h` at `(x, y)`: negative when the
/// map mirrors the neighbourhood of that point. `None` when the point maps
/// to (or next to) the line at infinity and the sign is meaningless.
pub fn jacobian_sign(h: &Homography, p: [f64; 2], eps: f64) -> Option<f64> {
    let row = h.row(2);
    let w = (row * Vector3::new(p[0], p[1], 1.0))[0];
    let scale = row.norm() * (1.0 + p[0].abs() + p[1].abs());
    if !w.is_finite() || w.abs() <= eps * scale {
        return None;
    }
    let sign = (h.determinant() / (w * w * w)).signum();
    sign.is_finite().then_some(sign)
}
