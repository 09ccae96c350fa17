//! Serializable reports for tools and tests.
pub mod timing;

pub use self::timing::{StageTiming, TimingBreakdown};

use crate::rectify::{RectificationMethod, RectificationResult};
use crate::types::{Homography, HomogeneousLine, VanishingData};
use crate::warp::Bounds;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    pub width: usize,
    pub height: usize,
    /// Target-plane box covered by the output raster.
    pub bounds: Bounds,
    /// Source pixel → output pixel.
    pub homography: [[f64; 3]; 3],
}

/// Everything a caller needs to draw overlays and reproduce the result.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RectificationReport {
    pub method: RectificationMethod,
    /// Source pixel → rectified plane.
    pub homography: [[f64; 3]; 3],
    pub already_affine: bool,
    pub vanishing: Option<VanishingData>,
    pub line_at_infinity: Option<HomogeneousLine>,
    /// Visible part of the line at infinity inside the source image.
    pub horizon_segment: Option<[[f64; 2]; 2]>,
    pub input: InputDescriptor,
    pub output: Option<OutputDescriptor>,
    pub timings: TimingBreakdown,
}

impl RectificationReport {
    pub fn from_result(result: &RectificationResult, input: InputDescriptor) -> Self {
        Self {
            method: result.method,
            homography: matrix_rows(&result.homography),
            already_affine: result.already_affine,
            vanishing: result.vanishing,
            line_at_infinity: result.line_at_infinity,
            horizon_segment: None,
            input,
            output: None,
            timings: TimingBreakdown::default(),
        }
    }
}

/// Row-major copy of a homography for JSON output.
pub fn matrix_rows(h: &Homography) -> [[f64; 3]; 3] {
    [
        [h[(0, 0)], h[(0, 1)], h[(0, 2)]],
        [h[(1, 0)], h[(1, 1)], h[(1, 2)]],
        [h[(2, 0)], h[(2, 1)], h[(2, 2)]],
    ]
}
