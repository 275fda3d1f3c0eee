//! Analysis status, totals and diagnostic trace

use std::fmt;
use std::path::PathBuf;

use floodscope_algorithms::imagery::AgreementStats;
use floodscope_render::MapBounds;
use serde::{Deserialize, Serialize};

use crate::paths::ArtifactPaths;

/// What a run needs from the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInputs {
    pub id: String,
    pub name: String,
    pub dem: PathBuf,
    pub green: PathBuf,
    /// Short-wave infrared band
    pub swir: PathBuf,
    pub output_dir: PathBuf,
}

/// Lifecycle of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Pipeline stage a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    Spectral,
    Hydrology,
    PermanentWater,
    Alignment,
    Comparison,
    Vectorize,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Setup => "setup",
            Self::Spectral => "spectral",
            Self::Hydrology => "hydrology",
            Self::PermanentWater => "permanent_water",
            Self::Alignment => "alignment",
            Self::Comparison => "comparison",
            Self::Vectorize => "vectorize",
            Self::Render => "render",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One entry of the run's diagnostic trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

/// Agreement between the permanent and spectral masks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub intersection: usize,
    pub union: usize,
    pub iou: f64,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl From<AgreementStats> for Agreement {
    fn from(s: AgreementStats) -> Self {
        Self {
            intersection: s.intersection,
            union: s.union,
            iou: s.iou,
            false_positives: s.false_positives,
            false_negatives: s.false_negatives,
        }
    }
}

/// Polygon count and area of one water class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorizeSummary {
    pub total_area_sqkm: f64,
    pub num_polygons: usize,
}

/// Outcome of [`run_analysis`](crate::run_analysis)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub inputs: AnalysisInputs,
    pub status: AnalysisStatus,
    pub artifacts: ArtifactPaths,
    /// Permanent water the imagery no longer sees
    pub lost: VectorizeSummary,
    /// Water outside permanent water
    pub gained: VectorizeSummary,
    /// Water in both
    pub persistent: VectorizeSummary,
    /// `gained + persistent`
    pub flooded_area_sqkm: f64,
    pub agreement: Option<Agreement>,
    pub map_bounds: Option<MapBounds>,
    /// Error chain when `status` is `error`
    pub error_message: Option<String>,
    pub trace: Vec<DiagnosticEvent>,
}

impl AnalysisResult {
    /// A fresh result in `pending` state
    pub fn pending(inputs: AnalysisInputs) -> Self {
        let artifacts = ArtifactPaths::new(&inputs.output_dir, &inputs.id, &inputs.name);
        Self {
            inputs,
            status: AnalysisStatus::Pending,
            artifacts,
            lost: VectorizeSummary::default(),
            gained: VectorizeSummary::default(),
            persistent: VectorizeSummary::default(),
            flooded_area_sqkm: 0.0,
            agreement: None,
            map_bounds: None,
            error_message: None,
            trace: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    /// Events recorded at `severity`
    pub fn events(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticEvent> {
        self.trace.iter().filter(move |e| e.severity == severity)
    }
}
