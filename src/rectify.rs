//! Rectifying-homography builders and the method table.
//!
//! - [`affine_from_line_at_infinity`]: sends an imaged line at infinity back
//!   to `(0, 0, 1)`, removing the projective part of the distortion.
//! - [`metric_from_line_pairs`] / [`metric_from_points`]: five or more
//!   world-orthogonal line pairs constrain the imaged dual conic of the
//!   circular points; factoring it removes projective and affine distortion
//!   up to a similarity.
//! - [`circle_affine`]: two imaged circles meet in the imaged circular points;
//!   the real line through them is the line at infinity.
//! - [`rectify`]: dispatch on [`RectificationMethod`].
use crate::conic::{fit_conic, Conic};
use crate::error::{RectifyError, Result};
use crate::geometry::try_line_through;
use crate::homography::{jacobian_sign, normalize_homography};
use crate::linalg::{
    normalization_transform, null_space, pencil_eigenvalues, smallest_right_vector,
};
use crate::params::{RectifyParams, Tolerances};
use crate::types::{Homography, HomogeneousLine, HomogeneousPoint, VanishingData};
use crate::vanishing::{self, DirectionEstimator};
use log::{debug, info, warn};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Above this `|e3| / e1` the recovered dual conic is far from rank two.
const RANK2_WARN_RATIO: f64 = 0.1;

/// Rectification strategy. Each variant carries a fixed point count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RectificationMethod {
    #[serde(rename = "parallel")]
    Parallel,
    #[serde(rename = "cross-ratio-3")]
    CrossRatio3,
    #[serde(rename = "cross-ratio-4")]
    CrossRatio4,
    #[serde(rename = "homography-1d")]
    Homography1d,
    #[serde(rename = "geometric")]
    Geometric,
    #[serde(rename = "metric")]
    Metric,
    #[serde(rename = "circle")]
    Circle,
    #[serde(rename = "horizon")]
    Horizon,
}

impl RectificationMethod {
    pub const ALL: [RectificationMethod; 8] = [
        Self::Parallel,
        Self::CrossRatio3,
        Self::CrossRatio4,
        Self::Homography1d,
        Self::Geometric,
        Self::Metric,
        Self::Circle,
        Self::Horizon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::CrossRatio3 => "cross-ratio-3",
            Self::CrossRatio4 => "cross-ratio-4",
            Self::Homography1d => "homography-1d",
            Self::Geometric => "geometric",
            Self::Metric => "metric",
            Self::Circle => "circle",
            Self::Horizon => "horizon",
        }
    }

    /// Number of marked points the method consumes.
    pub fn required_points(self) -> usize {
        match self {
            Self::Parallel => 8,
            Self::CrossRatio3 => 6,
            Self::CrossRatio4 => 8,
            Self::Homography1d => 6,
            Self::Geometric => 6,
            Self::Metric => 20,
            Self::Circle => 10,
            Self::Horizon => 2,
        }
    }

    /// Per-direction estimator and its point count, for the methods that go
    /// through two vanishing points.
    pub fn direction_estimator(self) -> Option<(usize, DirectionEstimator)> {
        match self {
            Self::Parallel => Some((4, vanishing::parallel_estimator as DirectionEstimator)),
            Self::CrossRatio3 => Some((3, vanishing::cross_ratio_estimator as DirectionEstimator)),
            Self::CrossRatio4 => Some((4, vanishing::cross_ratio4_estimator as DirectionEstimator)),
            Self::Homography1d => {
                Some((3, vanishing::homography_1d_estimator as DirectionEstimator))
            }
            Self::Geometric => Some((3, vanishing::geometric_estimator as DirectionEstimator)),
            Self::Metric | Self::Circle | Self::Horizon => None,
        }
    }

}

impl std::fmt::Display for RectificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Affine rectification: the homography and whether the line was already at
/// infinity (identity returned).
#[derive(Clone, Copy, Debug)]
pub struct AffineOutcome {
    pub homography: Homography,
    pub already_affine: bool,
}

/// Outcome of one rectification request.
#[derive(Clone, Debug)]
pub struct RectificationResult {
    pub method: RectificationMethod,
    /// Maps source pixels to the rectified plane, normalized so `H[2][2] = 1`
    /// when possible.
    pub homography: Homography,
    /// Vanishing points and horizon for the methods that produce them.
    pub vanishing: Option<VanishingData>,
    /// Imaged line at infinity used by the affine methods.
    pub line_at_infinity: Option<HomogeneousLine>,
    pub already_affine: bool,
}

/// `H = [[1, 0, 0], [0, 1, 0], [a/c, b/c, 1]]` for the line `(a, b, c)`.
///
/// A line with `|c| ≤ ε` cannot be brought into this form; the identity is
/// returned with `already_affine` set, as it is for a line that already is
/// `(0, 0, 1)`.
pub fn affine_from_line_at_infinity(
    line: &HomogeneousLine,
    tol: &Tolerances,
) -> Result<AffineOutcome> {
    let n = line.norm();
    if n == 0.0 || !n.is_finite() {
        return Err(RectifyError::DegenerateGeometry("line at infinity is undefined"));
    }
    let identity = AffineOutcome {
        homography: Matrix3::identity(),
        already_affine: true,
    };
    if line.c.abs() <= tol.eps * n {
        info!("line at infinity passes through the image origin; keeping the identity");
        return Ok(identity);
    }
    let a = line.a / line.c;
    let b = line.b / line.c;
    if a.hypot(b) <= tol.eps {
        info!("image is already affine");
        return Ok(identity);
    }
    Ok(AffineOutcome {
        homography: Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, a, b, 1.0),
        already_affine: false,
    })
}

/// Metric rectification from line pairs that are orthogonal in the world.
///
/// Each pair `(l, m)` contributes the row
/// `[l0m0, ½(l0m1+l1m0), l1m1, ½(l0m2+l2m0), ½(l1m2+l2m1), l2m2]` of the
/// conjugacy condition `lᵀ C m = 0`. The smallest right singular vector gives
/// `C`, which is factored as `U diag(e1, e2, e3) Uᵀ`; with `e3` replaced by 1,
/// `A = U diag(√e1, √e2, 1)` and the result is `A⁻¹`.
pub fn metric_from_line_pairs(
    pairs: &[(HomogeneousLine, HomogeneousLine)],
    tol: &Tolerances,
) -> Result<Homography> {
    if pairs.len() < 5 {
        return Err(RectifyError::TooFewPoints {
            needed: 20,
            got: 4 * pairs.len(),
        });
    }
    let mut system = DMatrix::<f64>::zeros(pairs.len(), 6);
    for (r, (l, m)) in pairs.iter().enumerate() {
        let (ln, mn) = (l.norm(), m.norm());
        if ln == 0.0 || mn == 0.0 {
            return Err(RectifyError::DegenerateGeometry("undefined line in orthogonal pair"));
        }
        let l = l.to_vector() / ln;
        let m = m.to_vector() / mn;
        let row = [
            l[0] * m[0],
            0.5 * (l[0] * m[1] + l[1] * m[0]),
            l[1] * m[1],
            0.5 * (l[0] * m[2] + l[2] * m[0]),
            0.5 * (l[1] * m[2] + l[2] * m[1]),
            l[2] * m[2],
        ];
        for (c, v) in row.iter().enumerate() {
            system[(r, c)] = *v;
        }
    }

    let (s, separation) = smallest_right_vector(&system)?;
    if separation <= tol.fit_separation {
        return Err(RectifyError::DegenerateRectification(format!(
            "orthogonality constraints are rank deficient (separation {separation:e})"
        )));
    }
    let mut dual = Matrix3::new(
        s[0],
        s[1] / 2.0,
        s[3] / 2.0,
        s[1] / 2.0,
        s[2],
        s[4] / 2.0,
        s[3] / 2.0,
        s[4] / 2.0,
        s[5],
    );
    dual = (dual + dual.transpose()) * 0.5;
    if dual.trace() < 0.0 {
        dual = -dual;
    }

    let eig = SymmetricEigen::new(dual);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| {
        eig.eigenvalues[j]
            .partial_cmp(&eig.eigenvalues[i])
            .unwrap_or(Ordering::Equal)
    });
    let e = order.map(|k| eig.eigenvalues[k]);
    if !(e[0] > 0.0 && e[1] > tol.eps * e[0]) {
        return Err(RectifyError::DegenerateRectification(format!(
            "dual conic is not positive semi-definite (eigenvalues {:.3e}, {:.3e}, {:.3e})",
            e[0], e[1], e[2]
        )));
    }
    if e[2].abs() > RANK2_WARN_RATIO * e[0] {
        warn!(
            "metric: dual conic is far from rank two (e3/e1 = {:.3}); overriding e3",
            e[2] / e[0]
        );
    }
    let mut u = Matrix3::zeros();
    for (c, &k) in order.iter().enumerate() {
        u.set_column(c, &eig.eigenvectors.column(k));
    }
    let a_rect = u * Matrix3::from_diagonal(&Vector3::new(e[0].sqrt(), e[1].sqrt(), 1.0));
    let det = a_rect.determinant();
    if !det.is_finite() || det.abs() <= tol.singular_det {
        return Err(RectifyError::DegenerateRectification(format!(
            "rectifying matrix is singular (det {det:e})"
        )));
    }
    a_rect
        .try_inverse()
        .ok_or_else(|| RectifyError::DegenerateRectification("rectifying matrix is singular".into()))
}

/// Metric rectification from `4·k` marked points (`k ≥ 5`): every group of
/// four gives two segments orthogonal in the world. Points are normalized to
/// unit mean distance first; the result keeps the orientation of the source.
pub fn metric_from_points(points: &[HomogeneousPoint], tol: &Tolerances) -> Result<Homography> {
    if points.len() < 20 || points.len() % 4 != 0 {
        return Err(RectifyError::TooFewPoints {
            needed: 20.max(points.len().div_ceil(4) * 4),
            got: points.len(),
        });
    }
    let xy = points
        .iter()
        .map(|p| p.to_xy(tol.eps))
        .collect::<Result<Vec<_>>>()?;
    let t = normalization_transform(&xy, tol.eps)
        .ok_or(RectifyError::DegenerateGeometry("all points coincide"))?;
    let normalized: Vec<HomogeneousPoint> = xy
        .iter()
        .map(|p| HomogeneousPoint::from_vector(&(t * Vector3::new(p[0], p[1], 1.0))))
        .collect();

    let mut pairs = Vec::with_capacity(normalized.len() / 4);
    for quad in normalized.chunks_exact(4) {
        let l = try_line_through(&quad[0], &quad[1], tol.eps)?;
        let m = try_line_through(&quad[2], &quad[3], tol.eps)?;
        pairs.push((l, m));
    }
    let mut h = metric_from_line_pairs(&pairs, tol)? * t;

    let n = xy.len() as f64;
    let centroid = [
        xy.iter().map(|p| p[0]).sum::<f64>() / n,
        xy.iter().map(|p| p[1]).sum::<f64>() / n,
    ];
    // centroid first; a marked point if the centroid maps to infinity
    match std::iter::once(centroid)
        .chain(xy.iter().copied())
        .find_map(|p| jacobian_sign(&h, p, tol.eps))
    {
        Some(sign) if sign < 0.0 => {
            debug!("metric: flipping x to undo a reflection");
            h = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0)) * h;
        }
        Some(_) => {}
        None => warn!("metric: every marked point maps to infinity; orientation left as is"),
    }
    Ok(normalize_homography(&h, tol.eps))
}

/// Split a degenerate conic into its real lines.
///
/// A two-dimensional null space means `D` is a double line, recovered as the
/// cross product of the null vectors. Otherwise `D` is factored through its
/// two dominant eigenpairs: a second eigenvalue below `pencil_rel` times the
/// first leaves a double line along the first eigenvector, equal signs mean a
/// complex pair (no real lines), and opposite signs give
/// `D = a aᵀ - b bᵀ` with the lines `a + b` and `a - b`.
pub fn split_line_pair(d: &Matrix3<f64>, tol: &Tolerances) -> Result<Vec<HomogeneousLine>> {
    let d = (d + d.transpose()) * 0.5;
    let kernel = null_space(
        &DMatrix::from_iterator(3, 3, d.iter().copied()),
        tol.null_space_rel,
    )?;
    if kernel.len() >= 3 {
        return Ok(Vec::new());
    }
    if kernel.len() == 2 {
        let p = Vector3::new(kernel[0][0], kernel[0][1], kernel[0][2]);
        let q = Vector3::new(kernel[1][0], kernel[1][1], kernel[1][2]);
        return Ok(vec![HomogeneousLine::from_vector(&p.cross(&q))]);
    }

    let eig = SymmetricEigen::new(d);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| {
        eig.eigenvalues[j]
            .abs()
            .partial_cmp(&eig.eigenvalues[i].abs())
            .unwrap_or(Ordering::Equal)
    });
    let (l1, l2) = (eig.eigenvalues[order[0]], eig.eigenvalues[order[1]]);
    let v1 = eig.eigenvectors.column(order[0]).into_owned();
    if l2.abs() <= tol.pencil_rel * l1.abs() {
        return Ok(vec![HomogeneousLine::from_vector(&v1)]);
    }
    if l1.signum() == l2.signum() {
        return Ok(Vec::new());
    }
    let a = v1 * l1.abs().sqrt();
    let b = eig.eigenvectors.column(order[1]) * l2.abs().sqrt();
    Ok(vec![
        HomogeneousLine::from_vector(&(a + b)),
        HomogeneousLine::from_vector(&(a - b)),
    ])
}

/// Result of the circle-based builder.
#[derive(Clone, Debug)]
pub struct CircleRectification {
    pub outcome: AffineOutcome,
    pub line_at_infinity: HomogeneousLine,
    /// Conics fitted to the two point sets, in pixel coordinates.
    pub conics: [Conic; 2],
}

/// Affine rectification from two imaged circles.
///
/// Both point sets share one normalizing similarity. The degenerate members
/// `C1 - μ C2` of the pencil are split into lines; the imaged line at
/// infinity is the candidate that leaves every marked point strictly on one
/// side, preferring the one farthest from the points.
pub fn circle_affine(
    first: &[[f64; 2]],
    second: &[[f64; 2]],
    tol: &Tolerances,
) -> Result<CircleRectification> {
    let all: Vec<[f64; 2]> = first.iter().chain(second).copied().collect();
    let t = normalization_transform(&all, tol.eps)
        .ok_or(RectifyError::DegenerateGeometry("all points coincide"))?;
    let apply = |pts: &[[f64; 2]]| -> Vec<[f64; 2]> {
        pts.iter()
            .map(|p| [t[(0, 0)] * p[0] + t[(0, 2)], t[(1, 1)] * p[1] + t[(1, 2)]])
            .collect()
    };
    let (n1, n2) = (apply(first), apply(second));
    let (f1, f2) = (fit_conic(&n1, tol)?, fit_conic(&n2, tol)?);
    for (k, conic) in [&f1, &f2].into_iter().enumerate() {
        if !conic.is_ellipse() {
            warn!("circle: conic {} is not an ellipse; the circle may cross the horizon", k + 1);
        }
    }
    let (c1, c2) = (f1.matrix(), f2.matrix());

    let mus = pencil_eigenvalues(&c1, &c2, tol.singular_det, tol.pencil_rel)?;
    debug!("circle: pencil eigenvalues {mus:?}");

    let samples: Vec<HomogeneousPoint> = n1
        .iter()
        .chain(&n2)
        .map(|p| HomogeneousPoint::from_xy(p[0], p[1]))
        .collect();
    let mut best: Option<(HomogeneousLine, f64)> = None;
    for mu in mus {
        for line in split_line_pair(&(c1 - c2 * mu), tol)? {
            let Some(clearance) = one_sided_clearance(&line, &samples) else {
                debug!("circle: candidate for mu={mu:.6} crosses the marked points");
                continue;
            };
            if best.map_or(true, |(_, c)| clearance > c) {
                best = Some((line, clearance));
            }
        }
    }
    let (line_n, clearance) = best.ok_or_else(|| {
        RectifyError::DegenerateRectification(
            "no real line of the conic pencil avoids both circles".into(),
        )
    })?;
    debug!("circle: selected line at infinity with clearance {clearance:.4}");

    let line_at_infinity = HomogeneousLine::from_vector(&(t.transpose() * line_n.to_vector()));
    let outcome = affine_from_line_at_infinity(&line_at_infinity, tol)?;
    let conics = [
        Conic::from_matrix(&(t.transpose() * c1 * t)).normalized(),
        Conic::from_matrix(&(t.transpose() * c2 * t)).normalized(),
    ];
    Ok(CircleRectification {
        outcome,
        line_at_infinity,
        conics,
    })
}

/// Smallest distance from `line` to the samples when all of them lie strictly
/// on one side, `None` otherwise.
fn one_sided_clearance(line: &HomogeneousLine, samples: &[HomogeneousPoint]) -> Option<f64> {
    let n = line.norm();
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    let dir = line.a.hypot(line.b);
    let mut sign = 0.0;
    let mut min_abs = f64::INFINITY;
    for p in samples {
        let s = line.signed_distance(p) / n;
        if s == 0.0 || (sign != 0.0 && s.signum() != sign) {
            return None;
        }
        sign = s.signum();
        min_abs = min_abs.min(s.abs());
    }
    Some(if dir == 0.0 { f64::INFINITY } else { min_abs * n / dir })
}

/// Run `params.method` on `points`, which must match its point count.
pub fn rectify(points: &[HomogeneousPoint], params: &RectifyParams) -> Result<RectificationResult> {
    let method = params.method;
    let tol = &params.tolerances;
    if points.len() != method.required_points() {
        return Err(RectifyError::WrongPointCount {
            method: method.name(),
            expected: method.required_points(),
            got: points.len(),
        });
    }
    debug!("rectify: method={method} points={}", points.len());

    if let Some((per_direction, estimator)) = method.direction_estimator() {
        let data = vanishing::vanishing_pair(estimator, per_direction, points, params.ratios, tol)?;
        return affine_result(method, data.line_at_infinity, Some(data), tol);
    }

    match method {
        RectificationMethod::Horizon => {
            try_line_through(&points[0], &points[1], tol.eps)?;
            let data = VanishingData::from_pair(points[0], points[1]);
            affine_result(method, data.line_at_infinity, Some(data), tol)
        }
        RectificationMethod::Metric => Ok(RectificationResult {
            method,
            homography: metric_from_points(points, tol)?,
            vanishing: None,
            line_at_infinity: None,
            already_affine: false,
        }),
        RectificationMethod::Circle => {
            let xy = points
                .iter()
                .map(|p| p.to_xy(tol.eps))
                .collect::<Result<Vec<_>>>()?;
            let (first, second) = xy.split_at(5);
            let circle = circle_affine(first, second, tol)?;
            Ok(RectificationResult {
                method,
                homography: circle.outcome.homography,
                vanishing: None,
                line_at_infinity: Some(circle.line_at_infinity),
                already_affine: circle.outcome.already_affine,
            })
        }
        _ => Err(RectifyError::DegenerateGeometry("method has no estimator")),
    }
}

fn affine_result(
    method: RectificationMethod,
    line: HomogeneousLine,
    vanishing: Option<VanishingData>,
    tol: &Tolerances,
) -> Result<RectificationResult> {
    let outcome = affine_from_line_at_infinity(&line, tol)?;
    Ok(RectificationResult {
        method,
        homography: outcome.homography,
        vanishing,
        line_at_infinity: Some(line),
        already_affine: outcome.already_affine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    #[test]
    fn affine_builder_moves_line_to_infinity() {
        let line = HomogeneousLine::new(0.002, -0.001, 2.0);
        let out = affine_from_line_at_infinity(&line, &tol()).unwrap();
        assert!(!out.already_affine);
        let mapped = out.homography.try_inverse().unwrap().transpose() * line.to_vector();
        assert!(mapped[0].abs() < 1e-12 && mapped[1].abs() < 1e-12);
        assert_eq!(out.homography[(2, 0)], 0.001);
    }

    #[test]
    fn affine_builder_reports_already_affine() {
        let out = affine_from_line_at_infinity(&HomogeneousLine::new(0.0, 0.0, 5.0), &tol()).unwrap();
        assert!(out.already_affine);
        assert_eq!(out.homography, Matrix3::identity());
        let through_origin = HomogeneousLine::new(1.0, 1.0, 0.0);
        assert!(affine_from_line_at_infinity(&through_origin, &tol()).unwrap().already_affine);
        assert!(affine_from_line_at_infinity(&HomogeneousLine::new(0.0, 0.0, 0.0), &tol()).is_err());
    }

    #[test]
    fn split_recovers_real_line_pair() {
        let l = Vector3::new(1.0, 2.0, -3.0);
        let m = Vector3::new(-2.0, 0.5, 1.0);
        let d = l * m.transpose() + m * l.transpose();
        let lines = split_line_pair(&d, &tol()).unwrap();
        assert_eq!(lines.len(), 2);
        let is_multiple = |a: &HomogeneousLine, b: &Vector3<f64>| {
            a.to_vector().cross(b).norm() <= 1e-9 * a.norm() * b.norm()
        };
        assert!(
            (is_multiple(&lines[0], &l) && is_multiple(&lines[1], &m))
                || (is_multiple(&lines[0], &m) && is_multiple(&lines[1], &l))
        );
    }

    #[test]
    fn split_skips_complex_pair_and_keeps_double_line() {
        // x² + y² = 0 is the complex pair x ± iy
        let complex = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        assert!(split_line_pair(&complex, &tol()).unwrap().is_empty());
        let l = Vector3::new(0.0, 1.0, -4.0);
        let double = l * l.transpose();
        let lines = split_line_pair(&double, &tol()).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].to_vector().cross(&l).norm() < 1e-9 * lines[0].norm());
    }

    #[test]
    fn split_keeps_nearly_double_line() {
        // rank one up to a tiny same-sign residue
        let d = Matrix3::from_diagonal(&Vector3::new(1e-8, 1e-8, 1.0));
        let lines = split_line_pair(&d, &tol()).unwrap();
        assert_eq!(lines.len(), 1);
        let v = lines[0].to_vector();
        assert!(v[0].abs() < 1e-12 && v[1].abs() < 1e-12 && v[2].abs() > 0.0);
    }

    #[test]
    fn method_table_is_consistent() {
        for method in RectificationMethod::ALL {
            if let Some((per_direction, _)) = method.direction_estimator() {
                assert_eq!(2 * per_direction, method.required_points(), "{method}");
            }
            let json = format!("\"{}\"", method.name());
            let parsed: RectificationMethod = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn wrong_point_count_is_reported() {
        let params = RectifyParams::new(RectificationMethod::Metric);
        let points = vec![HomogeneousPoint::from_xy(0.0, 0.0); 8];
        assert_eq!(
            rectify(&points, &params).unwrap_err(),
            RectifyError::WrongPointCount {
                method: "metric",
                expected: 20,
                got: 8
            }
        );
    }

    #[test]
    fn horizon_uses_marked_line() {
        let params = RectifyParams::new(RectificationMethod::Horizon);
        let points = [
            HomogeneousPoint::from_xy(-500.0, -1000.0),
            HomogeneousPoint::from_xy(1500.0, -1000.0),
        ];
        let result = rectify(&points, &params).unwrap();
        let h = result.homography;
        assert!((h[(2, 0)]).abs() < 1e-15);
        assert!((h[(2, 1)] - 0.001).abs() < 1e-12);
        assert!(result.vanishing.is_some());
    }
}
