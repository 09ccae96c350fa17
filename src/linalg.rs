//! Stateless linear-algebra helpers shared by the estimators and builders.
//!
//! - `svd_sorted`: SVD with singular values in descending order. Wide inputs
//!   are padded with zero rows so the full right basis (and hence the null
//!   space) is always available.
//! - `null_space` / `smallest_right_vector`: homogeneous least squares with a
//!   tolerance relative to the largest singular value.
//! - `solve_cramer3`: determinant-ratio solve for 3×3 systems.
//! - `pencil_eigenvalues`: real roots of `det(C1 - μ C2) = 0`, i.e. the
//!   eigenvalues of `C2⁻¹ C1`, from its Schur form.
use crate::error::{RectifyError, Result};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use std::cmp::Ordering;

/// Singular values (descending) with their right singular vectors.
#[derive(Clone, Debug)]
pub struct SortedSvd {
    pub singular_values: Vec<f64>,
    pub right_vectors: Vec<DVector<f64>>,
}

impl SortedSvd {
    pub fn max_singular_value(&self) -> f64 {
        self.singular_values.first().copied().unwrap_or(0.0)
    }
}

/// SVD of an arbitrary `m × n` matrix, right vectors ordered by decreasing
/// singular value. For `m < n` the matrix is padded to `n × n` with zero rows,
/// contributing exact zero singular values.
pub fn svd_sorted(a: &DMatrix<f64>) -> Result<SortedSvd> {
    let (rows, cols) = a.shape();
    let work = if rows < cols {
        let mut padded = DMatrix::<f64>::zeros(cols, cols);
        padded.view_mut((0, 0), (rows, cols)).copy_from(a);
        padded
    } else {
        a.clone()
    };
    let svd = work.svd(false, true);
    let v_t = svd.v_t.ok_or(RectifyError::SvdFailed)?;
    let sv = svd.singular_values;
    let mut order: Vec<usize> = (0..sv.len()).collect();
    order.sort_by(|&i, &j| sv[j].partial_cmp(&sv[i]).unwrap_or(Ordering::Equal));
    Ok(SortedSvd {
        singular_values: order.iter().map(|&i| sv[i]).collect(),
        right_vectors: order.iter().map(|&i| v_t.row(i).transpose()).collect(),
    })
}

/// Right singular vectors whose singular value is at most
/// `rel_tol · σ_max`. Empty when `a` has full column rank.
pub fn null_space(a: &DMatrix<f64>, rel_tol: f64) -> Result<Vec<DVector<f64>>> {
    let svd = svd_sorted(a)?;
    let limit = rel_tol * svd.max_singular_value();
    Ok(svd
        .singular_values
        .iter()
        .zip(svd.right_vectors)
        .filter(|(s, _)| **s <= limit)
        .map(|(_, v)| v)
        .collect())
}

/// Least-squares solution of `A x = 0`, `|x| = 1`, together with the ratio
/// `σ_{n-1} / σ_max`. A tiny ratio means the null space is at least two
/// dimensional and the solution is not unique.
pub fn smallest_right_vector(a: &DMatrix<f64>) -> Result<(DVector<f64>, f64)> {
    let svd = svd_sorted(a)?;
    let n = svd.singular_values.len();
    if n < 2 {
        return Err(RectifyError::SvdFailed);
    }
    let max = svd.max_singular_value();
    let separation = if max > 0.0 {
        svd.singular_values[n - 2] / max
    } else {
        0.0
    };
    let v = svd.right_vectors[n - 1].clone();
    Ok((v, separation))
}

#[inline]
pub fn det3(m: &Matrix3<f64>) -> f64 {
    m.determinant()
}

/// Solve `a x = b` by Cramer's rule.
pub fn solve_cramer3(a: &Matrix3<f64>, b: &Vector3<f64>, eps: f64) -> Result<Vector3<f64>> {
    let det = det3(a);
    if !det.is_finite() || det.abs() <= eps {
        return Err(RectifyError::SingularSystem { det });
    }
    let mut x = Vector3::zeros();
    for k in 0..3 {
        let mut ak = *a;
        ak.set_column(k, b);
        x[k] = det3(&ak) / det;
    }
    Ok(x)
}

/// Real eigenvalues of the pencil `C1 - μ C2` (ascending).
///
/// Roots whose imaginary part is at most `real_rel` times the largest root
/// magnitude are kept as real; a repeated root usually comes back as such a
/// nearly-real conjugate pair.
pub fn pencil_eigenvalues(
    c1: &Matrix3<f64>,
    c2: &Matrix3<f64>,
    det_eps: f64,
    real_rel: f64,
) -> Result<Vec<f64>> {
    let det_c2 = det3(c2);
    if det_c2.abs() <= det_eps {
        return Err(RectifyError::SingularSystem { det: det_c2 });
    }
    let c2_inv = c2
        .try_inverse()
        .ok_or(RectifyError::SingularSystem { det: det_c2 })?;
    let eigen = (c2_inv * c1).complex_eigenvalues();
    let scale = eigen.iter().map(|z| z.norm()).fold(0.0, f64::max);
    let mut roots: Vec<f64> = eigen
        .iter()
        .filter(|z| z.re.is_finite() && z.im.abs() <= real_rel * scale)
        .map(|z| z.re)
        .collect();
    roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Ok(roots)
}

/// Similarity moving the centroid to the origin with mean distance √2.
/// `None` when all points coincide, i.e. the mean distance is at most `eps`
/// relative to the centroid magnitude.
pub fn normalization_transform(points: &[[f64; 2]], eps: f64) -> Option<Matrix3<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let my = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| (p[0] - mx).hypot(p[1] - my))
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist <= eps * mx.hypot(my).max(1.0) {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0))
}
