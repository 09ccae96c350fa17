use crate::params::{default_ratios, RectifyParams, Tolerances};
use crate::rectify::RectificationMethod;
use crate::types::HomogeneousPoint;
use crate::warp::WarpOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct RectifyDemoConfig {
    #[serde(rename = "input")]
    pub input: PathBuf,
    pub method: RectificationMethod,
    /// Marked points in pixel coordinates, in the order the method expects.
    pub points: Vec<[f64; 2]>,
    #[serde(default = "default_ratios")]
    pub ratios: [f64; 2],
    #[serde(default)]
    pub tolerances: Tolerances,
    #[serde(default)]
    pub warp: WarpOptions,
    pub output: RectifyDemoOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct RectifyDemoOutputConfig {
    #[serde(rename = "image")]
    pub image: PathBuf,
    #[serde(rename = "report_json")]
    pub report_json: PathBuf,
}

impl RectifyDemoConfig {
    pub fn params(&self) -> RectifyParams {
        RectifyParams::new(self.method)
            .with_ratios(self.ratios)
            .with_tolerances(self.tolerances)
    }

    pub fn homogeneous_points(&self) -> Vec<HomogeneousPoint> {
        self.points.iter().copied().map(HomogeneousPoint::from).collect()
    }
}

pub fn load_config(path: &Path) -> Result<RectifyDemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&data).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

pub fn parse_config(data: &str) -> Result<RectifyDemoConfig, serde_json::Error> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::OutputSize;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let cfg = parse_config(
            r#"{
                "input": "photo.png",
                "method": "cross-ratio-3",
                "points": [[0, 0], [1, 0], [3, 0], [0, 0], [0, 1], [0, 3]],
                "output": { "image": "out/rect.png", "report_json": "out/report.json" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.method, RectificationMethod::CrossRatio3);
        assert_eq!(cfg.ratios, [1.0, 1.0]);
        assert_eq!(cfg.tolerances.eps, 1e-12);
        assert_eq!(cfg.warp.output, OutputSize::Native);
        assert_eq!(cfg.homogeneous_points().len(), 6);
    }

    #[test]
    fn parses_output_policy_and_tolerances() {
        let cfg = parse_config(
            r#"{
                "input": "photo.png",
                "method": "metric",
                "points": [],
                "ratios": [2.0, 0.5],
                "tolerances": { "fit_separation": 1e-7 },
                "warp": {
                    "output": { "mode": "fixed", "width": 900, "height": 600, "stretch": true },
                    "rotate": true
                },
                "output": { "image": "rect.png", "report_json": "report.json" }
            }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.warp.output,
            OutputSize::Fixed {
                width: 900,
                height: 600,
                stretch: true
            }
        );
        assert!(cfg.warp.rotate);
        assert_eq!(cfg.tolerances.fit_separation, 1e-7);
        assert_eq!(cfg.tolerances.singular_det, 1e-12);
        assert_eq!(cfg.params().ratios, [2.0, 0.5]);
    }
}
