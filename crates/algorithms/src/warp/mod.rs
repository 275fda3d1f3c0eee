//! Grid alignment
//!
//! Nearest-neighbour resampling and reprojection used to bring every layer
//! onto one canonical pixel grid.

mod reproject;
mod resample;

pub use reproject::{align_to_grid, reproject_nearest};
pub use resample::resample_to_shape;
