//! Bring the permanent-water mask onto the spectral grid

use floodscope_algorithms::warp::align_to_grid;
use floodscope_core::raster::{Grid, Mask};

use crate::diagnostics::Diagnostics;
use crate::error::{error_chain, PipelineError};
use crate::result::Stage;

/// Align `mask` to `grid`, falling back to an all-zero mask.
///
/// A failed alignment is recorded as an error diagnostic but does not stop
/// the run.
pub(crate) fn run(mask: &Mask, grid: &Grid, diag: &mut Diagnostics) -> Mask {
    match align_to_grid(mask, grid, 0u8) {
        Ok(aligned) => {
            if !mask.grid().is_aligned_with(grid) {
                diag.info(
                    Stage::Alignment,
                    format!(
                        "resampled permanent water {}x{} -> {}x{}",
                        mask.cols(),
                        mask.rows(),
                        grid.cols,
                        grid.rows
                    ),
                );
            }
            aligned
        }
        Err(e) => {
            let err = PipelineError::alignment("permanent water onto the spectral grid")(e);
            diag.error(Stage::Alignment, error_chain(&err));
            Mask::zeros_on(grid)
        }
    }
}
