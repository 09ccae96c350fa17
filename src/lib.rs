#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod homography;
pub mod image;
pub mod params;
pub mod rectifier;
pub mod rectify;
pub mod types;
pub mod warp;

// Building blocks, public for tools and tests.
pub mod conic;
pub mod geometry;
pub mod linalg;
pub mod vanishing;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{RectifyError, Result};
pub use crate::params::{RectifyParams, Tolerances};
pub use crate::rectifier::{RectifiedImage, Rectifier};
pub use crate::rectify::{rectify, RectificationMethod, RectificationResult};
pub use crate::types::{Homography, HomogeneousLine, HomogeneousPoint, VanishingData};
pub use crate::warp::{warp_image, OutputSize, WarpOptions};

pub use crate::diagnostics::RectificationReport;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use plane_rectifier::prelude::*;
///
/// # fn main() -> Result<(), RectifyError> {
/// let (w, h) = (640usize, 480usize);
/// let rgba = vec![255u8; w * h * 4];
/// let img = ImageU8::rgba(w, h, &rgba);
///
/// // horizon marked at y = -2000 in pixel coordinates
/// let points = [
///     HomogeneousPoint::from_xy(-500.0, -2000.0),
///     HomogeneousPoint::from_xy(1200.0, -2000.0),
/// ];
/// let rectifier = Rectifier::new(RectifyParams::new(RectificationMethod::Horizon));
/// let out = rectifier.process(&points, &img)?;
/// println!("{}x{}", out.image.width(), out.image.height());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageU8, RgbaBuffer};
    pub use crate::{
        HomogeneousPoint, RectificationMethod, Rectifier, RectifyError, RectifyParams,
        WarpOptions,
    };
}
