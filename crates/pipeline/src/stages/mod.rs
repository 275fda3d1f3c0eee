//! Pipeline stages
//!
//! Each stage reads what it needs, writes its artifacts and returns the
//! in-memory result the next stage consumes.

pub(crate) mod alignment;
pub(crate) mod comparison;
pub(crate) mod hydrology;
pub(crate) mod permanent_water;
pub(crate) mod render;
pub(crate) mod spectral;
pub mod vectorize;
