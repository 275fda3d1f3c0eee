//! DEM conditioning and accumulation artifact

use floodscope_algorithms::hydrology::{condition_dem, ConditionedDem};
use floodscope_core::io::{read_geotiff, write_geotiff};
use floodscope_core::raster::Raster;

use crate::config::AnalysisConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::{AnalysisInputs, Stage};

pub(crate) struct HydrologyOutput {
    /// The DEM as read
    pub dem: Raster<f64>,
    pub conditioned: ConditionedDem,
}

pub(crate) fn run(
    inputs: &AnalysisInputs,
    config: &AnalysisConfig,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<HydrologyOutput> {
    let dem: Raster<f64> = read_geotiff(&inputs.dem).map_err(PipelineError::processing(
        format!("cannot open DEM {}", inputs.dem.display()),
    ))?;

    let params = config.conditioning();
    let conditioned =
        condition_dem(&dem, &params).map_err(PipelineError::processing("conditioning DEM"))?;

    write_geotiff(&conditioned.accumulation, &paths.accumulation).map_err(
        PipelineError::output(format!("writing {}", paths.accumulation.display())),
    )?;
    if config.write_filled_dem {
        write_geotiff(&conditioned.filled, &paths.filled_dem).map_err(PipelineError::output(
            format!("writing {}", paths.filled_dem.display()),
        ))?;
    }

    let max_acc = conditioned
        .accumulation
        .data()
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(0.0, f64::max);
    diag.info(
        Stage::Hydrology,
        format!(
            "DEM {}x{} conditioned ({}), max accumulation {}",
            dem.cols(),
            dem.rows(),
            if params.already_filled { "already filled" } else { "filled" },
            max_acc
        ),
    );

    Ok(HydrologyOutput { dem, conditioned })
}
