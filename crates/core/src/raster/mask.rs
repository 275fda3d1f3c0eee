//! Binary masks

use super::{Grid, Raster};

/// A binary raster: 1 marks membership, 0 everything else.
///
/// Masks never carry a nodata value; absence is always 0.
pub type Mask = Raster<u8>;

impl Raster<u8> {
    /// All-zero mask on `grid`
    pub fn zeros_on(grid: &Grid) -> Self {
        Raster::on_grid(grid, 0u8)
    }

    /// Number of cells set to 1
    pub fn count_ones(&self) -> usize {
        self.data().iter().filter(|&&v| v == 1).count()
    }

    /// Whether every cell is 0 or 1
    pub fn is_binary(&self) -> bool {
        self.data().iter().all(|&v| v <= 1)
    }

    /// Whether no cell is set
    pub fn is_all_zero(&self) -> bool {
        self.data().iter().all(|&v| v == 0)
    }
}
