//! Lost / gained / persistent classification

use floodscope_algorithms::imagery::{
    agreement_stats, classify_regions, difference_map, AgreementStats, ClassifiedRegions,
};
use floodscope_core::io::write_geotiff;
use floodscope_core::raster::Mask;

use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::Stage;

pub(crate) struct ComparisonOutput {
    pub regions: ClassifiedRegions,
    pub agreement: AgreementStats,
}

pub(crate) fn run(
    permanent: &Mask,
    spectral: &Mask,
    write_difference: bool,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<ComparisonOutput> {
    let regions = classify_regions(permanent, spectral)
        .map_err(PipelineError::processing("classifying water regions"))?;
    let agreement = agreement_stats(permanent, spectral)
        .map_err(PipelineError::processing("computing agreement"))?;

    if write_difference {
        let diff = difference_map(permanent, spectral)
            .map_err(PipelineError::processing("building difference map"))?;
        write_geotiff(&diff, &paths.difference_map).map_err(PipelineError::output(format!(
            "writing {}",
            paths.difference_map.display()
        )))?;
    }

    diag.info(
        Stage::Comparison,
        format!(
            "lost {} / gained {} / persistent {} pixels, IoU {:.3}",
            regions.lost.count_ones(),
            regions.gained.count_ones(),
            regions.persistent.count_ones(),
            agreement.iou
        ),
    );

    Ok(ComparisonOutput { regions, agreement })
}
