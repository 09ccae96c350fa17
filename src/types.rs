//! Homogeneous value types exchanged between the estimators, builders and the
//! warper. All of them are defined up to a nonzero scale, so every comparison
//! is written in terms of cross products or ratios.
use crate::error::{RectifyError, Result};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// 3×3 projective transform acting on column vectors `(x, y, w)`.
pub type Homography = Matrix3<f64>;

/// Point of the projective plane. `w == 0` marks an ideal point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomogeneousPoint {
    pub x: f64,
    pub y: f64,
    pub w: f64,
}

impl HomogeneousPoint {
    pub const fn new(x: f64, y: f64, w: f64) -> Self {
        Self { x, y, w }
    }

    /// Finite point `(x, y, 1)`.
    pub const fn from_xy(x: f64, y: f64) -> Self {
        Self { x, y, w: 1.0 }
    }

    /// Ideal point in direction `(dx, dy)`.
    pub const fn ideal(dx: f64, dy: f64) -> Self {
        Self { x: dx, y: dy, w: 0.0 }
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.w)
    }

    pub fn norm(&self) -> f64 {
        self.to_vector().norm()
    }

    /// True when `|w|` is negligible relative to the whole vector.
    pub fn is_ideal(&self, eps: f64) -> bool {
        self.w.abs() <= eps * self.norm()
    }

    /// Divide by `w`. Fails for ideal (or all-zero) points.
    pub fn normalized(&self, eps: f64) -> Result<Self> {
        if self.norm() <= eps || self.is_ideal(eps) {
            return Err(RectifyError::DegenerateGeometry(
                "cannot normalize a point at infinity",
            ));
        }
        Ok(Self::new(self.x / self.w, self.y / self.w, 1.0))
    }

    /// Euclidean coordinates of a finite point.
    pub fn to_xy(&self, eps: f64) -> Result<[f64; 2]> {
        let p = self.normalized(eps)?;
        Ok([p.x, p.y])
    }

    /// Rescale to unit length; keeps ideal points representable.
    pub fn unit(&self) -> Self {
        let n = self.norm();
        if n == 0.0 {
            *self
        } else {
            Self::new(self.x / n, self.y / n, self.w / n)
        }
    }
}

impl From<[f64; 2]> for HomogeneousPoint {
    fn from(p: [f64; 2]) -> Self {
        Self::from_xy(p[0], p[1])
    }
}

impl From<[f64; 3]> for HomogeneousPoint {
    fn from(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

/// Line `a·x + b·y + c·w = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HomogeneousLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl HomogeneousLine {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.a, self.b, self.c)
    }

    pub fn norm(&self) -> f64 {
        self.to_vector().norm()
    }

    /// Direction vector `(-b, a)` of the line.
    pub fn direction(&self) -> [f64; 2] {
        [-self.b, self.a]
    }

    /// Scale so that `(a, b)` has unit length, turning `signed_distance`
    /// into a Euclidean distance. Fails for the line at infinity.
    pub fn normalized(&self, eps: f64) -> Result<Self> {
        let n = self.a.hypot(self.b);
        if n <= eps * self.norm() || n == 0.0 {
            return Err(RectifyError::DegenerateGeometry(
                "line has no finite direction",
            ));
        }
        Ok(Self::new(self.a / n, self.b / n, self.c / n))
    }

    /// Parallel iff the cross product's third coordinate vanishes, i.e. the
    /// two lines meet at an ideal point.
    pub fn is_parallel_to(&self, other: &Self, eps: f64) -> bool {
        let z = self.a * other.b - self.b * other.a;
        z.abs() <= eps * self.a.hypot(self.b) * other.a.hypot(other.b)
    }

    /// `l · p`, a signed distance when the line is normalized and `p.w == 1`.
    pub fn signed_distance(&self, p: &HomogeneousPoint) -> f64 {
        self.a * p.x + self.b * p.y + self.c * p.w
    }
}

impl From<[f64; 3]> for HomogeneousLine {
    fn from(l: [f64; 3]) -> Self {
        Self::new(l[0], l[1], l[2])
    }
}

/// Two vanishing points and the line at infinity they span, as returned by
/// every vanishing-point based method for overlay drawing.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VanishingData {
    pub v1: HomogeneousPoint,
    pub v2: HomogeneousPoint,
    pub line_at_infinity: HomogeneousLine,
}

impl VanishingData {
    pub fn from_pair(v1: HomogeneousPoint, v2: HomogeneousPoint) -> Self {
        let line_at_infinity = crate::geometry::line_through(&v1, &v2);
        Self {
            v1,
            v2,
            line_at_infinity,
        }
    }
}
