//! Permanent water mask, one of three strategies

use floodscope_algorithms::imagery::{accumulation_mask, height_mask};
use floodscope_algorithms::vector::{clip_to_rect, rasterize, reproject_features, ClipRect};
use floodscope_core::crs::Transformer;
use floodscope_core::io::{read_geojson, write_geotiff};
use floodscope_core::raster::{Grid, Mask, Raster};
use floodscope_core::Error;
use geo_types::Geometry;

use super::hydrology::HydrologyOutput;
use crate::config::PermanentWaterSource;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::Stage;

/// Densification used when carrying the imagery extent into the DEM CRS
const BOUNDS_DENSIFY: usize = 21;

/// Build the permanent-water mask on its native grid and write it.
///
/// The vector and accumulation strategies use the DEM grid. The DEM
/// threshold strategy uses the DEM cropped to `spectral_grid`; when that
/// crop is empty the mask is all zero on `spectral_grid`.
pub(crate) fn run(
    source: &PermanentWaterSource,
    hydrology: &HydrologyOutput,
    spectral_grid: &Grid,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<Mask> {
    let mask = match source {
        PermanentWaterSource::Vector { path } => {
            let features = read_geojson(path).map_err(PipelineError::input(format!(
                "cannot open permanent water vector {}",
                path.display()
            )))?;
            let grid = hydrology.conditioned.accumulation.grid();
            let features = match &grid.crs {
                Some(crs) => reproject_features(&features, crs)
                    .map_err(PipelineError::processing("reprojecting permanent water"))?,
                None => features,
            };
            let extent = ClipRect::from_bounds(grid.bounds());
            let clipped: Vec<Geometry<f64>> = features
                .geometries()
                .filter_map(|g| clip_to_rect(g, &extent))
                .map(Geometry::MultiPolygon)
                .collect();
            diag.info(
                Stage::PermanentWater,
                format!(
                    "{} of {} features from {} intersect the DEM",
                    clipped.len(),
                    features.len(),
                    path.display()
                ),
            );
            rasterize(&clipped, &grid)
                .map_err(PipelineError::processing("rasterizing permanent water"))?
        }
        PermanentWaterSource::Accumulation { threshold } => {
            accumulation_mask(&hydrology.conditioned.accumulation, *threshold as f64)
                .map_err(PipelineError::processing("thresholding accumulation"))?
        }
        PermanentWaterSource::DemThreshold { height, use_filled } => {
            let dem = if *use_filled {
                &hydrology.conditioned.filled
            } else {
                &hydrology.dem
            };
            match crop_to_grid(dem, spectral_grid) {
                Ok(cropped) => height_mask(&cropped, *height)
                    .map_err(PipelineError::processing("thresholding DEM"))?,
                Err(e) => {
                    diag.warn(
                        Stage::PermanentWater,
                        format!("DEM does not cover the imagery ({}); no permanent water", e),
                    );
                    Mask::zeros_on(spectral_grid)
                }
            }
        }
    };

    let out = paths.permanent_water(source);
    write_geotiff(&mask, out)
        .map_err(PipelineError::output(format!("writing {}", out.display())))?;

    let count = mask.count_ones();
    if count == 0 {
        diag.warn(Stage::PermanentWater, "permanent water mask is empty");
    } else {
        diag.info(Stage::PermanentWater, format!("{} permanent water pixels", count));
    }
    Ok(mask)
}

/// Crop `dem` to the extent of `grid`, expressed in the DEM's CRS
fn crop_to_grid(dem: &Raster<f64>, grid: &Grid) -> floodscope_core::Result<Raster<f64>> {
    let bounds = match (dem.crs(), grid.crs.as_ref()) {
        (Some(dem_crs), Some(grid_crs)) => {
            Transformer::new(grid_crs, dem_crs)?.transform_bounds(grid.bounds(), BOUNDS_DENSIFY)
        }
        (None, _) => return Err(Error::MissingCrs("DEM".into())),
        (_, None) => grid.bounds(),
    };
    dem.crop_to_bounds(bounds)
}
