//! Imagery analysis algorithms
//!
//! Water detection from multispectral bands and binary mask algebra:
//! - MNDWI water index with per-band max normalization
//! - Thresholds turning continuous rasters into {0,1} masks
//! - Set comparison of permanent and spectral water masks

mod compare;
mod threshold;
mod water_index;

pub use compare::{
    agreement_stats, classify_regions, difference_map, AgreementStats, ClassifiedRegions,
    DIFF_AGREE, DIFF_FALSE_NEGATIVE, DIFF_FALSE_POSITIVE,
};
pub use threshold::{accumulation_mask, height_mask, threshold_mask, Comparison};
pub use water_index::{mndwi, mndwi_water_mask, normalize_by_max, WaterIndex, MNDWI_EPSILON};
