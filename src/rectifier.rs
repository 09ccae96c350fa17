//! High-level entry point: estimate a rectifying homography from marked
//! points and resample the source image through it.
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{
    matrix_rows, InputDescriptor, OutputDescriptor, RectificationReport, TimingBreakdown,
};
use crate::error::Result;
use crate::geometry::clip_line_to_rect;
use crate::image::{ImageView, RgbaBuffer};
use crate::params::RectifyParams;
use crate::rectify::{rectify, RectificationResult};
use crate::types::HomogeneousPoint;
use crate::warp::{warp_image, WarpOptions};
use log::info;
use std::time::Instant;

/// Rectified raster plus the report describing how it was produced.
#[derive(Clone, Debug)]
pub struct RectifiedImage {
    pub image: RgbaBuffer,
    pub report: RectificationReport,
}

#[derive(Clone, Debug)]
pub struct Rectifier {
    params: RectifyParams,
    warp: WarpOptions,
}

impl Rectifier {
    pub fn new(params: RectifyParams) -> Self {
        Self {
            params,
            warp: WarpOptions {
                eps: params.tolerances.eps,
                ..WarpOptions::default()
            },
        }
    }

    pub fn with_warp_options(mut self, warp: WarpOptions) -> Self {
        self.warp = warp;
        self
    }

    /// Homography only, no resampling.
    pub fn estimate(&self, points: &[HomogeneousPoint]) -> Result<RectificationResult> {
        rectify(points, &self.params)
    }

    pub fn process<I>(&self, points: &[HomogeneousPoint], image: &I) -> Result<RectifiedImage>
    where
        I: ImageView<Pixel = u8> + Sync,
    {
        let t0 = Instant::now();
        let mut timings = TimingBreakdown::default();
        let result = timings.time("estimate", || self.estimate(points))?;
        let warped = timings.time("warp", || warp_image(image, &result.homography, &self.warp))?;
        timings.total_ms = elapsed_ms(t0);

        let input = InputDescriptor {
            width: image.width(),
            height: image.height(),
        };
        let mut report = RectificationReport::from_result(&result, input);
        report.horizon_segment = result.line_at_infinity.as_ref().and_then(|l| {
            clip_line_to_rect(
                l,
                image.width() as f64,
                image.height() as f64,
                self.params.tolerances.eps,
            )
        });
        report.output = Some(OutputDescriptor {
            width: warped.image.width(),
            height: warped.image.height(),
            bounds: warped.bounds,
            homography: matrix_rows(&warped.homography),
        });
        report.timings = timings;
        info!(
            "rectified with {}: {}x{} -> {}x{} in {:.2} ms",
            result.method,
            input.width,
            input.height,
            warped.image.width(),
            warped.image.height(),
            report.timings.total_ms
        );
        Ok(RectifiedImage {
            image: warped.image,
            report,
        })
    }
}
