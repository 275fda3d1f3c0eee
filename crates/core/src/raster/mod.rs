//! Raster data structures and operations

pub mod d8;
mod element;
mod geotransform;
mod grid;
mod mask;

pub use element::{RasterElement, StorageType};
pub use geotransform::GeoTransform;
pub use grid::{Grid, Raster};
pub use mask::Mask;
