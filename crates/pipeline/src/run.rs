//! Stage orchestration

use floodscope_algorithms::vector::AreaProjection;
use floodscope_render::RenderParams;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{error_chain, PipelineError, Result};
use crate::result::{AnalysisInputs, AnalysisResult, AnalysisStatus, Stage};
use crate::stages::{alignment, comparison, hydrology, permanent_water, render, spectral, vectorize};

/// Run one analysis end to end.
///
/// Never panics on bad input: any fatal failure is reported through
/// `status == Error` and `error_message`. Artifacts written before the
/// failure are left in place.
pub fn run_analysis(inputs: &AnalysisInputs, config: &AnalysisConfig) -> AnalysisResult {
    run_analysis_with(inputs, config, |_| {})
}

/// [`run_analysis`], reporting each status transition to `on_status`.
pub fn run_analysis_with<F>(
    inputs: &AnalysisInputs,
    config: &AnalysisConfig,
    mut on_status: F,
) -> AnalysisResult
where
    F: FnMut(AnalysisStatus),
{
    let mut result = AnalysisResult::pending(inputs.clone());
    on_status(result.status);

    let mut diag = Diagnostics::new(&inputs.id);
    result.status = AnalysisStatus::Processing;
    on_status(result.status);
    info!(analysis = %inputs.id, name = %inputs.name, "analysis started");

    let outcome = execute(config, &mut result, &mut diag);
    match outcome {
        Ok(()) => {
            result.status = AnalysisStatus::Completed;
            info!(
                analysis = %inputs.id,
                flooded_area_sqkm = result.flooded_area_sqkm,
                "analysis completed"
            );
        }
        Err(e) => {
            let message = error_chain(&e);
            diag.error(diag.stage(), message.clone());
            result.status = AnalysisStatus::Error;
            result.error_message = Some(message);
        }
    }
    result.trace = diag.into_events();
    on_status(result.status);
    result
}

fn execute(config: &AnalysisConfig, result: &mut AnalysisResult, diag: &mut Diagnostics) -> Result<()> {
    config.validate()?;
    let inputs = &result.inputs;
    let paths = result.artifacts.clone();

    std::fs::create_dir_all(&inputs.output_dir).map_err(PipelineError::output(format!(
        "creating output directory {}",
        inputs.output_dir.display()
    )))?;
    debug!(output_dir = %inputs.output_dir.display(), "artifact directory ready");

    for stale in paths.unproduced(config) {
        match std::fs::remove_file(stale) {
            Ok(()) => debug!(path = %stale.display(), "removed artifact of an earlier run"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => diag.warn(
                Stage::Setup,
                format!("cannot remove stale artifact {}: {}", stale.display(), e),
            ),
        }
    }

    diag.enter(Stage::Spectral);
    let spectral = spectral::run(inputs, &paths, diag)?;
    diag.enter(Stage::Hydrology);
    let hydrology = hydrology::run(inputs, config, &paths, diag)?;
    diag.enter(Stage::PermanentWater);
    let permanent = permanent_water::run(
        &config.permanent_water,
        &hydrology,
        &spectral.grid,
        &paths,
        diag,
    )?;
    drop(hydrology);

    diag.enter(Stage::Alignment);
    let permanent = alignment::run(&permanent, &spectral.grid, diag);
    diag.enter(Stage::Comparison);
    let compared = comparison::run(
        &permanent,
        &spectral.mask,
        config.write_difference_map,
        &paths,
        diag,
    )?;
    result.agreement = Some(compared.agreement.into());

    diag.enter(Stage::Vectorize);
    let vectors = vectorize::run(
        &compared.regions,
        config.min_polygon_pixels,
        AreaProjection::from(config.area_projection),
        &paths,
        diag,
    )?;
    result.lost = vectors.lost.summary;
    result.gained = vectors.gained.summary;
    result.persistent = vectors.persistent.summary;
    result.flooded_area_sqkm = result.gained.total_area_sqkm + result.persistent.total_area_sqkm;

    diag.enter(Stage::Render);
    result.map_bounds = render::run(&vectors, &RenderParams::from(config.render), &paths, diag)?;
    Ok(())
}
