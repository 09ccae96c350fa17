//! Parameter types for a single rectification request.
//!
//! All numerical thresholds live in [`Tolerances`] so every estimator and
//! builder applies the same values. Defaults suit pixel coordinates of
//! ordinary photographs; the solvers are scale-invariant so they rarely need
//! tuning.

use crate::rectify::RectificationMethod;
use serde::Deserialize;

/// Numerical thresholds shared by all stages.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Threshold for divisors and solver coefficients. Homogeneous tests are
    /// relative: `|w| <= eps * |(x, y, w)|` marks an ideal point.
    pub eps: f64,
    /// Singular values below `null_space_rel * sigma_max` span the null space.
    pub null_space_rel: f64,
    /// Minimum `sigma_second_smallest / sigma_max` for a homogeneous
    /// least-squares system to have a unique solution direction.
    pub fit_separation: f64,
    /// Determinant magnitude under which a small linear system is singular.
    pub singular_det: f64,
    /// Degenerate conic pencils: a pencil root with `|im| <= pencil_rel * |λ|max`
    /// counts as real, and a member whose second eigenvalue is below
    /// `pencil_rel` times the first is a double line. Repeated roots are only
    /// accurate to about the square root of machine precision.
    pub pencil_rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            eps: 1e-12,
            null_space_rel: 1e-9,
            fit_separation: 1e-9,
            singular_det: 1e-12,
            pencil_rel: 1e-6,
        }
    }
}

/// Immutable per-call parameters: which method to run, the user-supplied
/// ratios (one per direction), and the tolerances.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RectifyParams {
    pub method: RectificationMethod,
    /// Real-world ratios for the ratio-based methods. `ratios[0]` applies to
    /// the first direction, `ratios[1]` to the second. Ignored otherwise.
    #[serde(default = "default_ratios")]
    pub ratios: [f64; 2],
    #[serde(default)]
    pub tolerances: Tolerances,
}

pub(crate) fn default_ratios() -> [f64; 2] {
    [1.0, 1.0]
}

impl RectifyParams {
    pub fn new(method: RectificationMethod) -> Self {
        Self {
            method,
            ratios: default_ratios(),
            tolerances: Tolerances::default(),
        }
    }

    pub fn with_ratios(mut self, ratios: [f64; 2]) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }
}
