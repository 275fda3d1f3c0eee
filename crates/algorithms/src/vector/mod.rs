//! Vector operations on water polygons
//!
//! - Clip: cut polygons to a raster extent
//! - Rasterize: burn polygons into a binary mask
//! - Polygonize: trace mask regions into polygons with holes
//! - Reproject: move features between supported CRSs
//! - Measurements: areas in a projected CRS

mod clip;
mod measurements;
mod polygonize;
mod rasterize;
mod reproject;

pub use clip::{clip_polygon, clip_to_rect, ClipRect};
pub use measurements::{area, area_crs, collection_bounds, total_area_sqkm, AreaProjection};
pub use polygonize::{polygonize, Polygonize, PolygonizeParams};
pub use rasterize::rasterize;
pub use reproject::{reproject_features, reproject_geometry};

use floodscope_core::vector::FeatureCollection;

/// Polygons produced by vectorizing a mask, with their CRS
pub type VectorFeatureSet = FeatureCollection;
