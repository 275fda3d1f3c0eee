//! PNG composite of the three classes

use floodscope_render::{render_composite, ClassLayers, MapBounds, RenderParams};

use super::vectorize::VectorizeOutput;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::Stage;

pub(crate) fn run(
    vectors: &VectorizeOutput,
    params: &RenderParams,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<Option<MapBounds>> {
    let layers = ClassLayers {
        lost: &vectors.lost.features,
        gained: &vectors.gained.features,
        persistent: &vectors.persistent.features,
    };
    let bounds = render_composite(&layers, params, &paths.map_png, &paths.map_bounds).map_err(
        PipelineError::output(format!("rendering {}", paths.map_png.display())),
    )?;

    match bounds {
        Some(b) => diag.info(
            Stage::Render,
            format!("map covers [{}, {}] - [{}, {}]", b.west, b.south, b.east, b.north),
        ),
        None => diag.info(Stage::Render, "no water polygons; wrote an empty map"),
    }
    Ok(bounds)
}
