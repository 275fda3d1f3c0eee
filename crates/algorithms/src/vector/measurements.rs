//! Area measurements for vectorized water polygons

use floodscope_core::crs::{utm_epsg_for_lonlat, Transformer};
use floodscope_core::vector::FeatureCollection;
use floodscope_core::{Result, CRS};
use geo::{Area as GeoArea, BoundingRect, Geometry};

use super::reproject::reproject_features;

/// Square metres per square kilometre
const M2_PER_KM2: f64 = 1e6;

/// Calculate the area of a geometry.
///
/// Returns unsigned area in CRS units squared (square degrees for a
/// geographic CRS, so project to a metric CRS for square metres).
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Envelope `(min_x, min_y, max_x, max_y)` of every geometry in a collection
pub fn collection_bounds(fc: &FeatureCollection) -> Option<(f64, f64, f64, f64)> {
    fc.geometries()
        .filter_map(|g| g.bounding_rect())
        .fold(None, |acc, r| {
            let (min, max) = (r.min(), r.max());
            Some(match acc {
                None => (min.x, min.y, max.x, max.y),
                Some((x0, y0, x1, y1)) => (x0.min(min.x), y0.min(min.y), x1.max(max.x), y1.max(max.y)),
            })
        })
}

/// Which projected CRS polygon areas are measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaProjection {
    /// The collection's own CRS if it is projected, Web Mercator otherwise
    #[default]
    Auto,
    /// Always EPSG:3857
    WebMercator,
    /// WGS84 UTM zone of the collection's centre
    Utm,
}

/// CRS a collection's areas will be measured in.
///
/// # Errors
/// [`floodscope_core::Error::UnsupportedCrs`] when the collection has to be
/// reprojected to find its centre and its CRS is not supported.
pub fn area_crs(fc: &FeatureCollection, projection: AreaProjection) -> Result<CRS> {
    let source = fc.crs_or_wgs84();
    match projection {
        AreaProjection::Auto => {
            if source.is_geographic() == Some(false) {
                Ok(source)
            } else {
                Ok(CRS::web_mercator())
            }
        }
        AreaProjection::WebMercator => Ok(CRS::web_mercator()),
        AreaProjection::Utm => {
            let Some((x0, y0, x1, y1)) = collection_bounds(fc) else {
                return Ok(CRS::web_mercator());
            };
            let to_lonlat = Transformer::new(&source, &CRS::wgs84())?;
            let (lon, lat) = to_lonlat.transform((x0 + x1) / 2.0, (y0 + y1) / 2.0);
            Ok(CRS::from_epsg(utm_epsg_for_lonlat(lon, lat)))
        }
    }
}

/// Total polygon area in km², measured on a projected copy of `fc`.
///
/// The input collection is left untouched. An empty collection is 0.
pub fn total_area_sqkm(fc: &FeatureCollection, projection: AreaProjection) -> Result<f64> {
    if fc.is_empty() {
        return Ok(0.0);
    }

    let target = area_crs(fc, projection)?;
    let projected;
    let measured = if fc.crs_or_wgs84().is_equivalent(&target) {
        fc
    } else {
        projected = reproject_features(fc, &target)?;
        &projected
    };

    let m2: f64 = measured.geometries().map(area).sum();
    Ok(m2 / M2_PER_KM2)
}
