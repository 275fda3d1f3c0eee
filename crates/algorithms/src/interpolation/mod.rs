//! Spatial interpolation of gauge readings
//!
//! - IDW: Inverse Distance Weighting onto a raster grid
//! - Gauge extent: IDW water-level surface from gauge points, thresholded and
//!   vectorized into flood polygons

mod gauge_extent;
mod idw;

pub use gauge_extent::{flood_extent_from_gauges, gauge_points, GaugeExtentParams};
pub use idw::{idw, IdwParams};

/// A sample point with x, y coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other_x: f64, other_y: f64) -> f64 {
        let dx = self.x - other_x;
        let dy = self.y - other_y;
        dx * dx + dy * dy
    }
}
