//! Vanishing-point estimators.
//!
//! Every estimator reduces the points marked along one world direction to a
//! single vanishing point. Running it once per direction and joining the two
//! results gives the image of the line at infinity ([`VanishingData`]).
//!
//! | estimator                       | points | ratio meaning                      |
//! |---------------------------------|--------|------------------------------------|
//! | [`from_parallel_segments`]      | 4      | unused                             |
//! | [`from_cross_ratio`]            | 3      | world `|BC| / |AB|`                |
//! | [`from_cross_ratio4`]           | 4      | world cross ratio `(A, B; C, ∞)`   |
//! | [`from_homography_1d`]          | 3      | world `|BC| / |AB|`                |
//! | [`from_geometric_construction`] | 3      | world `|BC| / |AB|`                |
//!
//! All of them work in scalar coordinates along the marked line or with pure
//! incidence constructions, so uniformly scaling the pixel coordinates scales
//! the result by the same factor.
use crate::error::{RectifyError, Result};
use crate::geometry::{
    cross_ratio, intersect, line_through, parallel_through_point, project_scalar,
    try_line_through,
};
use crate::linalg::solve_cramer3;
use crate::params::Tolerances;
use crate::types::{HomogeneousPoint, VanishingData};
use log::debug;
use nalgebra::{Matrix3, Vector3};

/// Uniform signature used by the method table: the points marked for one
/// direction, the user ratio for that direction, and the tolerances.
pub type DirectionEstimator =
    fn(&[HomogeneousPoint], f64, &Tolerances) -> Result<HomogeneousPoint>;

/// Vanishing point of two segments that are parallel in the world. Image
/// segments that are parallel as well yield an ideal point, which is a valid
/// outcome.
pub fn from_parallel_segments(
    p0: &HomogeneousPoint,
    p1: &HomogeneousPoint,
    p2: &HomogeneousPoint,
    p3: &HomogeneousPoint,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let l1 = try_line_through(p0, p1, tol.eps)?;
    let l2 = try_line_through(p2, p3, tol.eps)?;
    let v = intersect(&l1, &l2);
    if v.norm() <= tol.eps * l1.norm() * l2.norm() {
        return Err(RectifyError::CollinearInput(
            "both segments lie on the same image line",
        ));
    }
    if l1.is_parallel_to(&l2, tol.eps) || v.is_ideal(tol.eps) {
        debug!("parallel: image segments are parallel, vanishing point is ideal");
        return Ok(v.unit());
    }
    v.normalized(tol.eps)
}

/// Equidistant cross-ratio method: three collinear points `A, B, C` with a
/// known world ratio `|BC| / |AB|`. The vanishing point `V` satisfies
/// `(A, B; C, V) = 1 / ratio + 1`.
pub fn from_cross_ratio(
    a: &HomogeneousPoint,
    b: &HomogeneousPoint,
    c: &HomogeneousPoint,
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    check_ratio(ratio)?;
    vanishing_on_segment(a, b, c, 1.0 / ratio + 1.0, tol)
}

/// Four-point variant: the cross ratio `(A, B; C, V)` is supplied directly.
/// `D` only contributes to the logged image cross ratio `(A, B; C, D)`.
pub fn from_cross_ratio4(
    a: &HomogeneousPoint,
    b: &HomogeneousPoint,
    c: &HomogeneousPoint,
    d: &HomogeneousPoint,
    target: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    check_ratio(target)?;
    let pa = a.to_xy(tol.eps)?;
    let pb = b.to_xy(tol.eps)?;
    let pd = d.to_xy(tol.eps)?;
    let pc = c.to_xy(tol.eps)?;
    let s = [
        project_scalar(pa, pa, pb, tol.eps)?,
        project_scalar(pb, pa, pb, tol.eps)?,
        project_scalar(pc, pa, pb, tol.eps)?,
        project_scalar(pd, pa, pb, tol.eps)?,
    ];
    if let Ok(image_cr) = cross_ratio(s[0], s[1], s[2], s[3], tol.eps) {
        debug!("cross-ratio-4: image (A, B; C, D) = {image_cr:.6}, target (A, B; C, V) = {target:.6}");
    }
    vanishing_on_segment(a, b, c, target, tol)
}

/// Solve `(a, b; c, v) = target` for the scalar `v` along `AB` and map it
/// back to the image.
fn vanishing_on_segment(
    a: &HomogeneousPoint,
    b: &HomogeneousPoint,
    c: &HomogeneousPoint,
    target: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let pa = a.to_xy(tol.eps)?;
    let pb = b.to_xy(tol.eps)?;
    let pc = c.to_xy(tol.eps)?;
    let sa = project_scalar(pa, pa, pb, tol.eps)?;
    let sb = project_scalar(pb, pa, pb, tol.eps)?;
    let sc = project_scalar(pc, pa, pb, tol.eps)?;

    let a_coef = target * (sb - sc) - (sa - sc);
    let b_coef = -(sa - sc) * sb + target * sa * (sb - sc);
    if a_coef.abs() <= tol.eps {
        return Err(RectifyError::DivisionByZero(
            "cross-ratio equation has no finite solution",
        ));
    }
    let v = b_coef / a_coef;
    Ok(HomogeneousPoint::from_xy(
        pa[0] + v * (pb[0] - pa[0]),
        pa[1] + v * (pb[1] - pa[1]),
    ))
}

/// Fit the 1D projective map `x = (h00·X + h01) / (h10·X + 1)` from the world
/// coordinates `[0, 1, 1 + ratio]` to the scalars of `A, B, C` along `AC`;
/// the vanishing point is the image of `X → ∞`, i.e. `h00 / h10`.
pub fn from_homography_1d(
    a: &HomogeneousPoint,
    b: &HomogeneousPoint,
    c: &HomogeneousPoint,
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    check_ratio(ratio)?;
    let pa = a.to_xy(tol.eps)?;
    let pb = b.to_xy(tol.eps)?;
    let pc = c.to_xy(tol.eps)?;
    let world = [0.0, 1.0, 1.0 + ratio];
    let image = [
        project_scalar(pa, pa, pc, tol.eps)?,
        project_scalar(pb, pa, pc, tol.eps)?,
        project_scalar(pc, pa, pc, tol.eps)?,
    ];

    let m = Matrix3::from_fn(|r, col| match col {
        0 => world[r],
        1 => 1.0,
        _ => -image[r] * world[r],
    });
    let rhs = Vector3::new(image[0], image[1], image[2]);
    let h = solve_cramer3(&m, &rhs, tol.singular_det)?;
    let (h00, h10) = (h[0], h[2]);

    let dir = [pc[0] - pa[0], pc[1] - pa[1]];
    if h10.abs() <= tol.eps {
        debug!("homography-1d: h10 vanishes, the marked line is already affine");
        return Ok(HomogeneousPoint::ideal(dir[0], dir[1]).unit());
    }
    let v = h00 / h10;
    Ok(HomogeneousPoint::from_xy(pa[0] + v * dir[0], pa[1] + v * dir[1]))
}

/// Ruler construction: lay a metric ruler `L` through `A` perpendicular to
/// `AC` with marks `B*` at 1 and `C*` at `1 + ratio`, find the centre `O` of
/// the perspectivity `B*↦B, C*↦C`, and intersect the parallel to `L` through
/// `O` with `AC`.
pub fn from_geometric_construction(
    a: &HomogeneousPoint,
    b: &HomogeneousPoint,
    c: &HomogeneousPoint,
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    check_ratio(ratio)?;
    let pa = a.to_xy(tol.eps)?;
    let pc = c.to_xy(tol.eps)?;
    let anchor = HomogeneousPoint::from(pa);
    let end = HomogeneousPoint::from(pc);
    let line_ac = try_line_through(&anchor, &end, tol.eps)?;

    let perp = [-(pc[1] - pa[1]), pc[0] - pa[0]];
    let b_star = HomogeneousPoint::from_xy(pa[0] + perp[0], pa[1] + perp[1]);
    let c_star = HomogeneousPoint::from_xy(b_star.x + ratio * perp[0], b_star.y + ratio * perp[1]);
    let ruler = line_through(&anchor, &b_star);

    let through_b = try_line_through(&b_star, b, tol.eps)?;
    let through_c = try_line_through(&c_star, c, tol.eps)?;
    let o = intersect(&through_b, &through_c);
    if o.is_ideal(tol.eps) {
        return Err(RectifyError::DegenerateGeometry(
            "lines through the ruler marks are parallel",
        ));
    }
    let o = o.normalized(tol.eps)?;

    let v = intersect(&parallel_through_point(&ruler, &o), &line_ac);
    if v.norm() <= tol.eps * line_ac.norm() {
        return Err(RectifyError::DegenerateGeometry(
            "construction line coincides with the marked line",
        ));
    }
    if v.is_ideal(tol.eps) {
        debug!("geometric: vanishing point is ideal");
        return Ok(v.unit());
    }
    v.normalized(tol.eps)
}

fn check_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(RectifyError::InvalidRatio(ratio))
    }
}

pub fn parallel_estimator(
    points: &[HomogeneousPoint],
    _ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let [p0, p1, p2, p3] = points else {
        return Err(RectifyError::TooFewPoints {
            needed: 4,
            got: points.len(),
        });
    };
    from_parallel_segments(p0, p1, p2, p3, tol)
}

pub fn cross_ratio_estimator(
    points: &[HomogeneousPoint],
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let [a, b, c] = points else {
        return Err(RectifyError::TooFewPoints {
            needed: 3,
            got: points.len(),
        });
    };
    from_cross_ratio(a, b, c, ratio, tol)
}

pub fn cross_ratio4_estimator(
    points: &[HomogeneousPoint],
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let [a, b, c, d] = points else {
        return Err(RectifyError::TooFewPoints {
            needed: 4,
            got: points.len(),
        });
    };
    from_cross_ratio4(a, b, c, d, ratio, tol)
}

pub fn homography_1d_estimator(
    points: &[HomogeneousPoint],
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let [a, b, c] = points else {
        return Err(RectifyError::TooFewPoints {
            needed: 3,
            got: points.len(),
        });
    };
    from_homography_1d(a, b, c, ratio, tol)
}

pub fn geometric_estimator(
    points: &[HomogeneousPoint],
    ratio: f64,
    tol: &Tolerances,
) -> Result<HomogeneousPoint> {
    let [a, b, c] = points else {
        return Err(RectifyError::TooFewPoints {
            needed: 3,
            got: points.len(),
        });
    };
    from_geometric_construction(a, b, c, ratio, tol)
}

/// Run `estimator` on the first and second half of `points` and join the two
/// vanishing points.
pub fn vanishing_pair(
    estimator: DirectionEstimator,
    per_direction: usize,
    points: &[HomogeneousPoint],
    ratios: [f64; 2],
    tol: &Tolerances,
) -> Result<VanishingData> {
    if points.len() < 2 * per_direction {
        return Err(RectifyError::TooFewPoints {
            needed: 2 * per_direction,
            got: points.len(),
        });
    }
    let v1 = estimator(&points[..per_direction], ratios[0], tol)?;
    let v2 = estimator(&points[per_direction..2 * per_direction], ratios[1], tol)?;
    let data = VanishingData::from_pair(v1, v2);
    if data.line_at_infinity.norm() <= tol.eps * v1.norm() * v2.norm() {
        return Err(RectifyError::DegenerateGeometry(
            "both directions share one vanishing point",
        ));
    }
    debug!(
        "vanishing points v1=({:.3}, {:.3}, {:.3}) v2=({:.3}, {:.3}, {:.3})",
        v1.x, v1.y, v1.w, v2.x, v2.y, v2.w
    );
    Ok(data)
}
