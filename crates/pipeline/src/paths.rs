//! Deterministic artifact locations
//!
//! Every artifact of a run is `{output_dir}/{stem}{suffix}` where the stem is
//! `{id}_{name}` with spaces in the name replaced by underscores. Re-running
//! an analysis overwrites the same files and removes optional ones the new
//! configuration does not write.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{AnalysisConfig, PermanentWaterSource};

/// File stem shared by all artifacts of one analysis
pub fn artifact_stem(id: &str, name: &str) -> String {
    format!("{}_{}", id, name.replace(' ', "_"))
}

/// Paths of every artifact a run may write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub accumulation: PathBuf,
    pub filled_dem: PathBuf,
    pub mndwi_mask: PathBuf,
    pub permanent_water_vector: PathBuf,
    pub permanent_water_acc: PathBuf,
    pub permanent_water_dem: PathBuf,
    pub difference_map: PathBuf,
    /// Lost water polygons (permanent only)
    pub only_pw: PathBuf,
    /// Gained water polygons (spectral only)
    pub only_mndwi: PathBuf,
    /// Persistent water polygons
    pub both: PathBuf,
    pub map_png: PathBuf,
    pub map_bounds: PathBuf,
}

impl ArtifactPaths {
    pub fn new(output_dir: &Path, id: &str, name: &str) -> Self {
        let stem = artifact_stem(id, name);
        let at = |suffix: &str| output_dir.join(format!("{}{}", stem, suffix));
        Self {
            accumulation: at("_accumulation.tif"),
            filled_dem: at("_filled_dem.tif"),
            mndwi_mask: at("_mndwi_mask.tif"),
            permanent_water_vector: at("_permanent_water_vector.tif"),
            permanent_water_acc: at("_permanent_water_acc.tif"),
            permanent_water_dem: at("_permanent_water_dem.tif"),
            difference_map: at("_difference.tif"),
            only_pw: at("_only_pw.geojson"),
            only_mndwi: at("_only_mndwi.geojson"),
            both: at("_both.geojson"),
            map_png: at("_map.png"),
            map_bounds: at("_map_bounds.json"),
        }
    }

    /// Where the permanent-water mask of `source` is written
    pub fn permanent_water(&self, source: &PermanentWaterSource) -> &Path {
        match source {
            PermanentWaterSource::Vector { .. } => &self.permanent_water_vector,
            PermanentWaterSource::Accumulation { .. } => &self.permanent_water_acc,
            PermanentWaterSource::DemThreshold { .. } => &self.permanent_water_dem,
        }
    }

    /// Optional artifacts a run with `config` does not write.
    ///
    /// Left over from an earlier run, they would no longer match the result.
    pub fn unproduced(&self, config: &AnalysisConfig) -> Vec<&Path> {
        let mut stale = Vec::new();
        if !config.write_filled_dem {
            stale.push(self.filled_dem.as_path());
        }
        if !config.write_difference_map {
            stale.push(self.difference_map.as_path());
        }
        let current = self.permanent_water(&config.permanent_water);
        stale.extend(
            [&self.permanent_water_vector, &self.permanent_water_acc, &self.permanent_water_dem]
                .into_iter()
                .map(PathBuf::as_path)
                .filter(|p| *p != current),
        );
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_replaces_spaces() {
        assert_eq!(artifact_stem("42", "Spring flood 2024"), "42_Spring_flood_2024");
    }

    #[test]
    fn fixed_suffixes() {
        let p = ArtifactPaths::new(Path::new("/out"), "7", "river delta");
        assert_eq!(p.accumulation, PathBuf::from("/out/7_river_delta_accumulation.tif"));
        assert_eq!(p.mndwi_mask, PathBuf::from("/out/7_river_delta_mndwi_mask.tif"));
        assert_eq!(p.only_pw, PathBuf::from("/out/7_river_delta_only_pw.geojson"));
        assert_eq!(p.only_mndwi, PathBuf::from("/out/7_river_delta_only_mndwi.geojson"));
        assert_eq!(p.both, PathBuf::from("/out/7_river_delta_both.geojson"));
        assert_eq!(p.map_png, PathBuf::from("/out/7_river_delta_map.png"));
        assert_eq!(p.map_bounds, PathBuf::from("/out/7_river_delta_map_bounds.json"));
        assert_eq!(
            p.permanent_water(&PermanentWaterSource::default()),
            Path::new("/out/7_river_delta_permanent_water_acc.tif")
        );
    }

    #[test]
    fn unproduced_follows_config() {
        let p = ArtifactPaths::new(Path::new("/out"), "7", "delta");
        let defaults = AnalysisConfig::default();
        assert_eq!(
            p.unproduced(&defaults),
            [
                p.filled_dem.as_path(),
                p.difference_map.as_path(),
                p.permanent_water_vector.as_path(),
                p.permanent_water_dem.as_path(),
            ]
        );

        let all = AnalysisConfig {
            write_filled_dem: true,
            write_difference_map: true,
            permanent_water: PermanentWaterSource::DemThreshold { height: 3.0, use_filled: false },
            ..Default::default()
        };
        assert_eq!(
            p.unproduced(&all),
            [p.permanent_water_vector.as_path(), p.permanent_water_acc.as_path()]
        );
    }
}
