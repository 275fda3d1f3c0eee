//! Class masks to stored polygons and area totals

use std::path::Path;

use floodscope_algorithms::imagery::ClassifiedRegions;
use floodscope_algorithms::vector::{
    polygonize, reproject_features, total_area_sqkm, AreaProjection, PolygonizeParams,
    VectorFeatureSet,
};
use floodscope_core::io::write_geojson;
use floodscope_core::raster::Mask;
use floodscope_core::CRS;

use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::paths::ArtifactPaths;
use crate::result::{Stage, VectorizeSummary};

/// Polygons of one class, in WGS84, with their totals
#[derive(Debug, Clone)]
pub struct ClassVectors {
    pub features: VectorFeatureSet,
    pub summary: VectorizeSummary,
}

/// Polygonize `mask`, drop regions under `min_pixels` and measure the rest.
///
/// Areas are measured on the polygons in the CRS `projection` selects; the
/// returned features are reprojected to EPSG:4326 for storage. An all-zero
/// mask gives an empty set and a zero summary.
pub fn vectorize_mask(
    mask: &Mask,
    min_pixels: usize,
    projection: AreaProjection,
) -> floodscope_core::Result<ClassVectors> {
    let wgs84 = CRS::wgs84();
    if mask.is_all_zero() {
        return Ok(ClassVectors {
            features: VectorFeatureSet::with_crs(wgs84),
            summary: VectorizeSummary::default(),
        });
    }

    let native = polygonize(mask, &PolygonizeParams { min_pixels })?;
    let total_area_sqkm = total_area_sqkm(&native, projection)?;
    let features = reproject_features(&native, &wgs84)?;

    Ok(ClassVectors {
        summary: VectorizeSummary {
            total_area_sqkm,
            num_polygons: features.len(),
        },
        features,
    })
}

pub(crate) struct VectorizeOutput {
    pub lost: ClassVectors,
    pub gained: ClassVectors,
    pub persistent: ClassVectors,
}

fn vectorize_class(
    class: &str,
    mask: &Mask,
    path: &Path,
    min_pixels: usize,
    projection: AreaProjection,
    diag: &mut Diagnostics,
) -> Result<ClassVectors> {
    let vectors = vectorize_mask(mask, min_pixels, projection)
        .map_err(PipelineError::processing(format!("vectorizing {} water", class)))?;
    write_geojson(&vectors.features, path)
        .map_err(PipelineError::output(format!("writing {}", path.display())))?;
    diag.info(
        Stage::Vectorize,
        format!(
            "{}: {} polygons, {:.4} km²",
            class, vectors.summary.num_polygons, vectors.summary.total_area_sqkm
        ),
    );
    Ok(vectors)
}

pub(crate) fn run(
    regions: &ClassifiedRegions,
    min_pixels: usize,
    projection: AreaProjection,
    paths: &ArtifactPaths,
    diag: &mut Diagnostics,
) -> Result<VectorizeOutput> {
    Ok(VectorizeOutput {
        lost: vectorize_class("lost", &regions.lost, &paths.only_pw, min_pixels, projection, diag)?,
        gained: vectorize_class(
            "gained",
            &regions.gained,
            &paths.only_mndwi,
            min_pixels,
            projection,
            diag,
        )?,
        persistent: vectorize_class(
            "persistent",
            &regions.persistent,
            &paths.both,
            min_pixels,
            projection,
            diag,
        )?,
    })
}
