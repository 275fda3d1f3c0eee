//! # FloodScope Algorithms
//!
//! Raster and vector algorithms behind the flood extent pipeline.
//!
//! ## Modules
//!
//! - **hydrology**: depression filling, D8 flow direction, flow accumulation
//! - **imagery**: MNDWI water mask, thresholds, mask set comparison
//! - **interpolation**: IDW surfaces and flood extent from gauge readings
//! - **warp**: nearest-neighbour resampling and reprojection onto a grid
//! - **vector**: clipping, rasterization, polygonization, areas

pub mod hydrology;
pub mod imagery;
pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod vector;
pub mod warp;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        condition_dem, fill_sinks, flow_accumulation, flow_direction, priority_flood,
        ConditionDem, ConditionedDem, ConditioningParams, FillMethod, FillSinksParams,
        PriorityFloodParams,
    };
    pub use crate::imagery::{
        accumulation_mask, agreement_stats, classify_regions, height_mask, mndwi_water_mask,
        AgreementStats, ClassifiedRegions, WaterIndex,
    };
    pub use crate::interpolation::{
        flood_extent_from_gauges, gauge_points, idw, GaugeExtentParams, IdwParams, SamplePoint,
    };
    pub use crate::vector::{
        clip_to_rect, polygonize, rasterize, reproject_features, total_area_sqkm,
        AreaProjection, ClipRect, PolygonizeParams, VectorFeatureSet,
    };
    pub use crate::warp::{align_to_grid, reproject_nearest, resample_to_shape};
    pub use floodscope_core::prelude::*;
}
