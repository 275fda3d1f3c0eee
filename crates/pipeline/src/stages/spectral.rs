//! Spectral water mask; fixes the canonical grid

use floodscope_algorithms::imagery::mndwi_water_mask;
use floodscope_core::io::{read_geotiff, write_geotiff};
use floodscope_core::raster::{Grid, Mask, Raster};
use floodscope_core::Error;

use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::{AnalysisInputs, Stage};

pub(crate) struct SpectralOutput {
    pub mask: Mask,
    pub grid: Grid,
}

pub(crate) fn run(
    inputs: &AnalysisInputs,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<SpectralOutput> {
    let green: Raster<f64> = read_geotiff(&inputs.green).map_err(PipelineError::input(format!(
        "cannot open green band {}",
        inputs.green.display()
    )))?;
    if green.crs().is_none() {
        return Err(PipelineError::input("green band defines the analysis grid")(
            Error::MissingCrs(inputs.green.display().to_string()),
        ));
    }
    let swir: Raster<f64> = read_geotiff(&inputs.swir).map_err(PipelineError::input(format!(
        "cannot open SWIR band {}",
        inputs.swir.display()
    )))?;

    let water = mndwi_water_mask(&green, &swir).map_err(|e| match e {
        Error::EmptyInput(_) => PipelineError::input("spectral bands")(e),
        other => PipelineError::processing("computing MNDWI")(other),
    })?;

    write_geotiff(&water.mask, &paths.mndwi_mask).map_err(PipelineError::output(format!(
        "writing {}",
        paths.mndwi_mask.display()
    )))?;

    let grid = water.mask.grid();
    diag.info(
        Stage::Spectral,
        format!(
            "water mask {}x{}: {} water pixels",
            grid.cols,
            grid.rows,
            water.mask.count_ones()
        ),
    );

    Ok(SpectralOutput {
        mask: water.mask,
        grid,
    })
}
