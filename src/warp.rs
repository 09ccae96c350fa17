//! Backward-mapping homography warper.
//!
//! 1. The four source corners are pushed through `H`; finite results give the
//!    bounding box of the warped image ([`transformed_bounds`]).
//! 2. `H` is translated so the box starts at the origin
//!    ([`translate_to_origin`]) and scaled to the chosen [`OutputSize`].
//! 3. Every destination pixel is mapped back through the inverse, stepping
//!    incrementally along each row, and takes the nearest source pixel.
//!    Destination pixels that fall outside the source are opaque white.
//!
//! Rows are independent; with the `parallel` feature they are filled by
//! rayon.
use crate::error::{RectifyError, Result};
use crate::geometry::transform_point;
use crate::homography::scale_homography;
use crate::image::{ImageView, RgbaBuffer};
use crate::params::Tolerances;
use crate::types::Homography;
use log::debug;
use nalgebra::Matrix3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const FILL: [u8; 4] = [255, 255, 255, 255];

/// Axis-aligned box in the target plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Pixel extent along x, counting both end pixels.
    pub fn extent_x(&self) -> f64 {
        self.max_x - self.min_x + 1.0
    }

    pub fn extent_y(&self) -> f64 {
        self.max_y - self.min_y + 1.0
    }
}

/// Destination raster size policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputSize {
    /// One target-plane unit per pixel.
    #[default]
    Native,
    /// Fixed canvas. Without `stretch` the box is scaled uniformly by the
    /// larger of the two axis factors.
    Fixed {
        width: usize,
        height: usize,
        #[serde(default)]
        stretch: bool,
    },
    /// Uniform scale `min(max_width / w, max_height / h)`, rounded.
    FitWithin { max_width: usize, max_height: usize },
}

/// Warper options.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct WarpOptions {
    pub output: OutputSize,
    /// Rotate the result 90° clockwise.
    pub rotate: bool,
    /// Upper bound on `width · height` of the destination raster.
    pub max_output_pixels: usize,
    /// Corners with `|w| <= eps · |(x, y, w)|` after mapping are treated as
    /// sent to infinity.
    pub eps: f64,
}

impl Default for WarpOptions {
    fn default() -> Self {
        Self {
            output: OutputSize::Native,
            rotate: false,
            max_output_pixels: 64 * 1024 * 1024,
            eps: Tolerances::default().eps,
        }
    }
}

/// Warped raster together with the geometry that produced it.
#[derive(Clone, Debug)]
pub struct WarpOutput {
    pub image: RgbaBuffer,
    /// Source pixel → destination pixel.
    pub homography: Homography,
    pub bounds: Bounds,
}

/// Exact min/max of the transformed corners `(0, 0)`, `(w-1, 0)`, `(0, h-1)`
/// and `(w-1, h-1)`; corners mapped to infinity (relative to `eps`) are ignored. When none is
/// finite the source rectangle `[0, w] × [0, h]` is returned.
pub fn transformed_bounds(h: &Homography, width: usize, height: usize, eps: f64) -> Bounds {
    let (xm, ym) = (width.saturating_sub(1) as f64, height.saturating_sub(1) as f64);
    let corners = [[0.0, 0.0], [xm, 0.0], [0.0, ym], [xm, ym]];
    let mut bounds: Option<Bounds> = None;
    for p in corners.iter().filter_map(|c| transform_point(h, *c, eps)) {
        bounds = Some(match bounds {
            None => Bounds {
                min_x: p[0],
                min_y: p[1],
                max_x: p[0],
                max_y: p[1],
            },
            Some(b) => Bounds {
                min_x: b.min_x.min(p[0]),
                min_y: b.min_y.min(p[1]),
                max_x: b.max_x.max(p[0]),
                max_y: b.max_y.max(p[1]),
            },
        });
    }
    bounds.unwrap_or(Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: width as f64,
        max_y: height as f64,
    })
}

/// `H' = H − [min_x; min_y; 0] · H[2]`, applied to rows 0 and 1.
pub fn translate_to_origin(h: &Homography, bounds: &Bounds) -> Homography {
    let mut out = *h;
    for c in 0..3 {
        out[(0, c)] -= bounds.min_x * h[(2, c)];
        out[(1, c)] -= bounds.min_y * h[(2, c)];
    }
    out
}

/// Destination size and the target-plane units per destination pixel.
fn output_geometry(bounds: &Bounds, output: OutputSize) -> (usize, usize, f64, f64) {
    let (ex, ey) = (bounds.extent_x(), bounds.extent_y());
    match output {
        OutputSize::Native => (ex.ceil() as usize, ey.ceil() as usize, 1.0, 1.0),
        OutputSize::Fixed {
            width,
            height,
            stretch,
        } => {
            let (sx, sy) = (ex / width.max(1) as f64, ey / height.max(1) as f64);
            if stretch {
                (width, height, sx, sy)
            } else {
                let s = sx.max(sy);
                (width, height, s, s)
            }
        }
        OutputSize::FitWithin {
            max_width,
            max_height,
        } => {
            let ratio = (max_width as f64 / ex).min(max_height as f64 / ey);
            let w = (ex * ratio).round() as usize;
            let h = (ey * ratio).round() as usize;
            (w, h, 1.0 / ratio, 1.0 / ratio)
        }
    }
}

/// Quarter turn clockwise about the origin: `(x, y) ↦ (−y, x)`.
fn quarter_turn() -> Homography {
    Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)
}

/// Resample `src` (RGBA) through `h` (source → target plane).
pub fn warp_image<I>(src: &I, h: &Homography, opts: &WarpOptions) -> Result<WarpOutput>
where
    I: ImageView<Pixel = u8> + Sync,
{
    if src.channels() != RgbaBuffer::CHANNELS {
        return Err(RectifyError::UnsupportedChannels(src.channels()));
    }
    let (src_w, src_h) = (src.width(), src.height());
    if src_w == 0 || src_h == 0 {
        return Err(RectifyError::EmptyImage);
    }
    let h = if opts.rotate { quarter_turn() * h } else { *h };

    let bounds = transformed_bounds(&h, src_w, src_h, opts.eps);
    let (out_w, out_h, sx, sy) = output_geometry(&bounds, opts.output);
    if out_w == 0 || out_h == 0 {
        return Err(RectifyError::EmptyImage);
    }
    if out_w.saturating_mul(out_h) > opts.max_output_pixels {
        return Err(RectifyError::OutputTooLarge {
            width: out_w,
            height: out_h,
        });
    }
    let to_output = scale_homography(&translate_to_origin(&h, &bounds), 1.0 / sx, 1.0 / sy);
    let inv = to_output.try_inverse().ok_or(RectifyError::SingularSystem {
        det: to_output.determinant(),
    })?;
    debug!(
        "warp: {src_w}x{src_h} -> {out_w}x{out_h}, bounds=({:.2}, {:.2})..({:.2}, {:.2})",
        bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y
    );

    let mut data = vec![0u8; out_w * out_h * RgbaBuffer::CHANNELS];
    let row_len = out_w * RgbaBuffer::CHANNELS;
    #[cfg(feature = "parallel")]
    {
        data.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(j, row)| fill_row(src, &inv, j, row));
    }
    #[cfg(not(feature = "parallel"))]
    {
        data.chunks_mut(row_len)
            .enumerate()
            .for_each(|(j, row)| fill_row(src, &inv, j, row));
    }
    let image = RgbaBuffer::from_raw(out_w, out_h, data).ok_or(RectifyError::EmptyImage)?;
    Ok(WarpOutput {
        image,
        homography: to_output,
        bounds,
    })
}

/// Fill destination row `j`. The source position of `(i, j)` is
/// `inv · (i, j, 1)`; moving one column to the right adds `inv[:, 0]`.
fn fill_row<I: ImageView<Pixel = u8>>(src: &I, inv: &Homography, j: usize, row: &mut [u8]) {
    let (src_w, src_h) = (src.width() as f64, src.height() as f64);
    let jf = j as f64;
    let mut x = inv[(0, 1)] * jf + inv[(0, 2)];
    let mut y = inv[(1, 1)] * jf + inv[(1, 2)];
    let mut z = inv[(2, 1)] * jf + inv[(2, 2)];
    let (dx, dy, dz) = (inv[(0, 0)], inv[(1, 0)], inv[(2, 0)]);
    for px in row.chunks_exact_mut(RgbaBuffer::CHANNELS) {
        let mut color = FILL;
        if z != 0.0 && z.is_finite() {
            let u = (x / z + 0.5).floor();
            let v = (y / z + 0.5).floor();
            if u >= 0.0 && u < src_w && v >= 0.0 && v < src_h {
                let s = src.row(v as usize);
                let k = u as usize * RgbaBuffer::CHANNELS;
                color.copy_from_slice(&s[k..k + RgbaBuffer::CHANNELS]);
            }
        }
        px.copy_from_slice(&color);
        x += dx;
        y += dy;
        z += dz;
    }
}
