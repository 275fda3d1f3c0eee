//! Analysis configuration
//!
//! Loaded from JSON; every field has a default so `{}` is a valid config.
//!
//! ```json
//! {
//!   "permanent_water": { "strategy": "accumulation", "threshold": 1000 },
//!   "fill_method": { "method": "priority_flood", "epsilon": 1e-5 },
//!   "min_polygon_pixels": 100,
//!   "area_projection": "auto",
//!   "render": { "max_dimension": 1024, "opacity": 180 }
//! }
//! ```

use std::path::{Path, PathBuf};

use floodscope_algorithms::hydrology::{
    ConditioningParams, FillMethod, FillSinksParams, PriorityFloodParams,
};
use floodscope_algorithms::vector::AreaProjection;
use floodscope_render::RenderParams;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

fn default_threshold() -> u64 {
    1000
}
fn default_epsilon() -> f64 {
    1e-5
}
fn default_min_slope() -> f64 {
    0.01
}
fn default_max_iterations() -> usize {
    1000
}
fn default_min_polygon_pixels() -> usize {
    100
}
fn default_max_dimension() -> u32 {
    1024
}
fn default_opacity() -> u8 {
    180
}

/// Where permanent (non-flood) water comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PermanentWaterSource {
    /// Polygons from a GeoJSON file, rasterized onto the DEM grid
    Vector { path: PathBuf },
    /// Cells whose flow accumulation reaches `threshold`
    Accumulation {
        #[serde(default = "default_threshold")]
        threshold: u64,
    },
    /// Cells lower than `height`, on the DEM cropped to the imagery
    DemThreshold {
        #[serde(default)]
        height: f64,
        /// Threshold the conditioned DEM instead of the raw one
        #[serde(default)]
        use_filled: bool,
    },
}

impl Default for PermanentWaterSource {
    fn default() -> Self {
        Self::Accumulation {
            threshold: default_threshold(),
        }
    }
}

/// Depression filling method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FillMethodConfig {
    PriorityFlood {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    PlanchonDarboux {
        #[serde(default = "default_min_slope")]
        min_slope: f64,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
}

impl Default for FillMethodConfig {
    fn default() -> Self {
        Self::PriorityFlood {
            epsilon: default_epsilon(),
        }
    }
}

impl FillMethodConfig {
    /// Planchon-Darboux with default slope and iteration bound
    pub fn planchon_darboux() -> Self {
        Self::PlanchonDarboux {
            min_slope: default_min_slope(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl From<&FillMethodConfig> for FillMethod {
    fn from(cfg: &FillMethodConfig) -> Self {
        match *cfg {
            FillMethodConfig::PriorityFlood { epsilon } => {
                FillMethod::PriorityFlood(PriorityFloodParams { epsilon })
            }
            FillMethodConfig::PlanchonDarboux {
                min_slope,
                max_iterations,
            } => FillMethod::PlanchonDarboux(FillSinksParams {
                min_slope,
                max_iterations,
            }),
        }
    }
}

/// Projected CRS used to measure polygon areas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaProjectionConfig {
    /// Native CRS when projected, Web Mercator otherwise
    #[default]
    Auto,
    WebMercator,
    /// UTM zone of the polygons' centre
    Utm,
}

impl From<AreaProjectionConfig> for AreaProjection {
    fn from(cfg: AreaProjectionConfig) -> Self {
        match cfg {
            AreaProjectionConfig::Auto => AreaProjection::Auto,
            AreaProjectionConfig::WebMercator => AreaProjection::WebMercator,
            AreaProjectionConfig::Utm => AreaProjection::Utm,
        }
    }
}

/// PNG composite settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            opacity: default_opacity(),
        }
    }
}

impl From<RenderConfig> for RenderParams {
    fn from(cfg: RenderConfig) -> Self {
        RenderParams {
            max_dimension: cfg.max_dimension,
            opacity: cfg.opacity,
        }
    }
}

/// Everything that tunes one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub permanent_water: PermanentWaterSource,
    /// Skip depression filling
    #[serde(default)]
    pub dem_already_filled: bool,
    #[serde(default)]
    pub fill_method: FillMethodConfig,
    /// Polygons with fewer pixels are discarded
    #[serde(default = "default_min_polygon_pixels")]
    pub min_polygon_pixels: usize,
    #[serde(default)]
    pub area_projection: AreaProjectionConfig,
    #[serde(default)]
    pub render: RenderConfig,
    /// Also write the conditioned DEM
    #[serde(default)]
    pub write_filled_dem: bool,
    /// Also write a permanent-vs-spectral difference raster
    #[serde(default)]
    pub write_difference_map: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            permanent_water: PermanentWaterSource::default(),
            dem_already_filled: false,
            fill_method: FillMethodConfig::default(),
            min_polygon_pixels: default_min_polygon_pixels(),
            area_projection: AreaProjectionConfig::default(),
            render: RenderConfig::default(),
            write_filled_dem: false,
            write_difference_map: false,
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Reject values no stage could run with.
    pub fn validate(&self) -> Result<()> {
        match &self.permanent_water {
            PermanentWaterSource::Accumulation { threshold: 0 } => {
                return Err(PipelineError::Config(
                    "accumulation threshold must be a positive integer".into(),
                ));
            }
            PermanentWaterSource::DemThreshold { height, .. } if !height.is_finite() => {
                return Err(PipelineError::Config("DEM height threshold must be finite".into()));
            }
            _ => {}
        }

        match self.fill_method {
            FillMethodConfig::PriorityFlood { epsilon } if !(epsilon >= 0.0 && epsilon.is_finite()) => {
                return Err(PipelineError::Config(format!(
                    "priority_flood epsilon must be finite and >= 0, got {}",
                    epsilon
                )));
            }
            FillMethodConfig::PlanchonDarboux { max_iterations: 0, .. } => {
                return Err(PipelineError::Config(
                    "planchon_darboux max_iterations must be at least 1".into(),
                ));
            }
            _ => {}
        }

        if self.render.max_dimension == 0 {
            return Err(PipelineError::Config("render max_dimension must be at least 1".into()));
        }
        Ok(())
    }

    /// Hydrology parameters derived from this config
    pub fn conditioning(&self) -> ConditioningParams {
        ConditioningParams {
            already_filled: self.dem_already_filled,
            fill_method: FillMethod::from(&self.fill_method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = AnalysisConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.permanent_water, PermanentWaterSource::Accumulation { threshold: 1000 });
        assert_eq!(cfg.min_polygon_pixels, 100);
        assert_eq!(cfg.render.max_dimension, 1024);
        assert_eq!(cfg.render.opacity, 180);
        assert_eq!(cfg.area_projection, AreaProjectionConfig::Auto);
    }

    #[test]
    fn strategies_parse_by_tag() {
        let cfg = AnalysisConfig::from_json_str(
            r#"{"permanent_water": {"strategy": "vector", "path": "rivers.geojson"}}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.permanent_water,
            PermanentWaterSource::Vector { path: PathBuf::from("rivers.geojson") }
        );

        let cfg = AnalysisConfig::from_json_str(
            r#"{"permanent_water": {"strategy": "dem_threshold", "height": 2.5}}"#,
        )
        .unwrap();
        assert_eq!(
            cfg.permanent_water,
            PermanentWaterSource::DemThreshold { height: 2.5, use_filled: false }
        );

        let cfg = AnalysisConfig::from_json_str(
            r#"{"permanent_water": {"strategy": "accumulation"}, "area_projection": "utm"}"#,
        )
        .unwrap();
        assert_eq!(cfg.permanent_water, PermanentWaterSource::Accumulation { threshold: 1000 });
        assert_eq!(cfg.area_projection, AreaProjectionConfig::Utm);
    }

    #[test]
    fn fill_method_parameters() {
        let cfg = AnalysisConfig::from_json_str(
            r#"{"fill_method": {"method": "planchon_darboux", "max_iterations": 50}}"#,
        )
        .unwrap();
        match cfg.conditioning().fill_method {
            FillMethod::PlanchonDarboux(p) => {
                assert_eq!(p.max_iterations, 50);
                assert_eq!(p.min_slope, 0.01);
            }
            other => panic!("expected Planchon-Darboux, got {:?}", other),
        }
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = AnalysisConfig::from_json_str(r#"{"permanent_water": {"strategy": "rgb"}}"#);
        assert!(matches!(err, Err(PipelineError::Config(_))));
    }

    #[test]
    fn validation() {
        let mut cfg = AnalysisConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.permanent_water = PermanentWaterSource::Accumulation { threshold: 0 };
        assert!(cfg.validate().is_err());

        cfg = AnalysisConfig {
            fill_method: FillMethodConfig::PlanchonDarboux { min_slope: 0.01, max_iterations: 0 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        cfg = AnalysisConfig {
            render: RenderConfig { max_dimension: 0, opacity: 10 },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
