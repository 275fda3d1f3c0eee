//! FloodScope analysis pipeline
//!
//! Ties the numerical crates into one run:
//!
//! 1. Spectral water mask from the green and SWIR bands (fixes the grid)
//! 2. DEM conditioning and flow accumulation
//! 3. Permanent water from a vector layer, accumulation or DEM height
//! 4. Alignment onto the spectral grid and lost/gained/persistent split
//! 5. Polygons and km² per class, stored as WGS84 GeoJSON
//! 6. PNG composite with a bounds sidecar
//!
//! ```no_run
//! use floodscope_pipeline::{run_analysis, AnalysisConfig, AnalysisInputs};
//!
//! let inputs = AnalysisInputs {
//!     id: "42".into(),
//!     name: "spring flood".into(),
//!     dem: "dem.tif".into(),
//!     green: "b03.tif".into(),
//!     swir: "b11.tif".into(),
//!     output_dir: "out".into(),
//! };
//! let result = run_analysis(&inputs, &AnalysisConfig::default());
//! println!("{} km² flooded", result.flooded_area_sqkm);
//! ```

pub mod config;
mod diagnostics;
pub mod error;
pub mod paths;
pub mod result;
mod run;
mod stages;

pub use config::{
    AnalysisConfig, AreaProjectionConfig, FillMethodConfig, PermanentWaterSource, RenderConfig,
};
pub use error::{error_chain, PipelineError, Result};
pub use paths::{artifact_stem, ArtifactPaths};
pub use result::{
    Agreement, AnalysisInputs, AnalysisResult, AnalysisStatus, DiagnosticEvent, Severity, Stage,
    VectorizeSummary,
};
pub use run::{run_analysis, run_analysis_with};
pub use stages::vectorize::{vectorize_mask, ClassVectors};
