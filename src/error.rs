//! Error taxonomy for the rectification engine.
//!
//! Every failure is detected locally by comparing a magnitude against a
//! tolerance from [`crate::params::Tolerances`] and surfaced as a typed
//! variant. Nothing is retried internally: a point configuration is either
//! solvable or it is not.
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RectifyError {
    /// Near-zero normalization divisor, coincident points, or an undefined
    /// intermediate intersection.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
    /// A solver coefficient fell below the tolerance.
    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),
    #[error("collinear input: {0}")]
    CollinearInput(&'static str),
    #[error("singular linear system (det = {det:e})")]
    SingularSystem { det: f64 },
    /// The conic design matrix has more than one (near) null direction.
    #[error("ill-conditioned conic fit (separation ratio = {ratio:e})")]
    IllConditionedFit { ratio: f64 },
    /// The metric or circle-based builder cannot produce an invertible result.
    #[error("degenerate rectification: {0}")]
    DegenerateRectification(String),
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("method `{method}` expects {expected} points, got {got}")]
    WrongPointCount {
        method: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("ratio must be finite and positive, got {0}")]
    InvalidRatio(f64),
    #[error("image has zero area")]
    EmptyImage,
    #[error("expected an RGBA raster, got {0} channel(s)")]
    UnsupportedChannels(usize),
    #[error("output raster {width}x{height} exceeds the configured pixel limit")]
    OutputTooLarge { width: usize, height: usize },
    #[error("svd failed")]
    SvdFailed,
}

pub type Result<T> = std::result::Result<T, RectifyError>;
