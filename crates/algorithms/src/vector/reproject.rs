//! Reprojecting vector features between supported CRSs

use floodscope_core::crs::Transformer;
use floodscope_core::vector::FeatureCollection;
use floodscope_core::{Result, CRS};
use geo::{Coord, Geometry, MapCoords};

/// Transform every coordinate of a geometry.
pub fn reproject_geometry(geom: &Geometry<f64>, transformer: &Transformer) -> Geometry<f64> {
    if transformer.is_identity() {
        return geom.clone();
    }
    geom.map_coords(|c| {
        let (x, y) = transformer.transform(c.x, c.y);
        Coord { x, y }
    })
}

/// Copy of `fc` with coordinates expressed in `to`.
///
/// A collection without a CRS is taken to be WGS84. Attributes and ids are
/// kept; the input is not modified.
///
/// # Errors
/// [`floodscope_core::Error::UnsupportedCrs`] if either CRS is unsupported
/// and the two are not already equivalent.
pub fn reproject_features(fc: &FeatureCollection, to: &CRS) -> Result<FeatureCollection> {
    let from = fc.crs_or_wgs84();
    if from.is_equivalent(to) {
        let mut out = fc.clone();
        out.crs = Some(to.clone());
        return Ok(out);
    }

    let transformer = Transformer::new(&from, to)?;
    let mut out = FeatureCollection::with_crs(to.clone());
    for feature in fc.iter() {
        let mut f = feature.clone();
        f.geometry = feature
            .geometry
            .as_ref()
            .map(|g| reproject_geometry(g, &transformer));
        out.push(f);
    }
    Ok(out)
}
