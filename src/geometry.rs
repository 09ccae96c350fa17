//! Homogeneous point/line algebra.
//!
//! - `line_through` / `intersect`: cross products; an ideal intersection of
//!   parallel lines is a valid result, not an error.
//! - `project_scalar`: parameter of the orthogonal projection onto a segment,
//!   the 1D coordinate used by the cross-ratio estimators.
//! - `cross_ratio`: scalar cross ratio `((a-c)(b-d)) / ((a-d)(b-c))`.
//! - `transform_point`, `parallel_through_point`, `clip_line_to_rect`: helpers
//!   for the builders, the warper, and overlay drawing.
use crate::error::{RectifyError, Result};
use crate::types::{Homography, HomogeneousLine, HomogeneousPoint};
use nalgebra::Vector3;

/// Line joining two points. Returns the zero line when `p == q` up to scale;
/// use [`try_line_through`] to have that reported.
#[inline]
pub fn line_through(p: &HomogeneousPoint, q: &HomogeneousPoint) -> HomogeneousLine {
    HomogeneousLine::from_vector(&p.to_vector().cross(&q.to_vector()))
}

/// Like [`line_through`] but fails on coincident points.
pub fn try_line_through(
    p: &HomogeneousPoint,
    q: &HomogeneousPoint,
    eps: f64,
) -> Result<HomogeneousLine> {
    let l = line_through(p, q);
    if l.norm() <= eps * p.norm() * q.norm() {
        return Err(RectifyError::DegenerateGeometry(
            "line through coincident points",
        ));
    }
    Ok(l)
}

/// Meeting point of two lines; ideal (`w ≈ 0`) when they are parallel.
#[inline]
pub fn intersect(l: &HomogeneousLine, m: &HomogeneousLine) -> HomogeneousPoint {
    HomogeneousPoint::from_vector(&l.to_vector().cross(&m.to_vector()))
}

/// Scalar `t` such that the orthogonal projection of `p` onto the line is
/// `start + t·(end - start)`.
pub fn project_scalar(p: [f64; 2], start: [f64; 2], end: [f64; 2], eps: f64) -> Result<f64> {
    let vx = end[0] - start[0];
    let vy = end[1] - start[1];
    let len_sq = vx * vx + vy * vy;
    let scale_sq = start[0] * start[0] + start[1] * start[1] + end[0] * end[0] + end[1] * end[1];
    if len_sq == 0.0 || len_sq <= eps * eps * scale_sq {
        return Err(RectifyError::DivisionByZero("projection onto a zero-length segment"));
    }
    let px = p[0] - start[0];
    let py = p[1] - start[1];
    Ok((px * vx + py * vy) / len_sq)
}

/// Cross ratio of four collinear scalar coordinates.
pub fn cross_ratio(a: f64, b: f64, c: f64, d: f64, eps: f64) -> Result<f64> {
    let ad = a - d;
    let bc = b - c;
    if ad.abs() <= eps || bc.abs() <= eps {
        return Err(RectifyError::DivisionByZero("cross ratio with coincident points"));
    }
    Ok(((a - c) * (b - d)) / (ad * bc))
}

/// Apply `h` to the finite point `(x, y)`. `None` when the image lies at
/// infinity or is not finite.
pub fn transform_point(h: &Homography, p: [f64; 2], eps: f64) -> Option<[f64; 2]> {
    let v = h * Vector3::new(p[0], p[1], 1.0);
    let w = v[2];
    if !w.is_finite() || w.abs() <= eps * v.norm() {
        return None;
    }
    let out = [v[0] / w, v[1] / w];
    (out[0].is_finite() && out[1].is_finite()).then_some(out)
}

/// Line through a finite `point` with the same direction as `line`.
pub fn parallel_through_point(line: &HomogeneousLine, point: &HomogeneousPoint) -> HomogeneousLine {
    let [dx, dy] = line.direction();
    let shifted = HomogeneousPoint::new(point.x + dx * point.w, point.y + dy * point.w, point.w);
    line_through(point, &shifted)
}

/// Visible part of `line` inside the `[0, width] × [0, height]` rectangle, for
/// drawing the horizon over the source image.
pub fn clip_line_to_rect(
    line: &HomogeneousLine,
    width: f64,
    height: f64,
    eps: f64,
) -> Option<[[f64; 2]; 2]> {
    const EDGE_TOL: f64 = 1e-3;
    let HomogeneousLine { a, b, c } = *line;
    let scale = line.norm();
    if scale == 0.0 {
        return None;
    }
    let mut candidates: Vec<[f64; 2]> = Vec::with_capacity(4);
    if b.abs() > eps * scale {
        candidates.push([0.0, -c / b]);
        candidates.push([width, (-c - a * width) / b]);
    }
    if a.abs() > eps * scale {
        candidates.push([-c / a, 0.0]);
        candidates.push([(-c - b * height) / a, height]);
    }
    let mut unique: Vec<[f64; 2]> = Vec::with_capacity(2);
    for p in candidates {
        let inside = p[0] >= -EDGE_TOL
            && p[0] <= width + EDGE_TOL
            && p[1] >= -EDGE_TOL
            && p[1] <= height + EDGE_TOL;
        if inside
            && !unique
                .iter()
                .any(|q| (p[0] - q[0]).hypot(p[1] - q[1]) < EDGE_TOL)
        {
            unique.push(p);
        }
    }
    (unique.len() >= 2).then(|| [unique[0], unique[1]])
}
