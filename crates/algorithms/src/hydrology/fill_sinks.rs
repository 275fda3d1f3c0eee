//! Sink filling for hydrological analysis
//!
//! Implements the Planchon-Darboux (2001) algorithm for filling
//! depressions in a DEM to ensure continuous flow paths.
//!
//! Reference:
//! Planchon, O., Darboux, F. (2001). A fast, simple and versatile algorithm
//! to fill the depressions of digital elevation models.
//! Catena, 46(2-3), 159-176.

use floodscope_core::raster::Raster;
use floodscope_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// Parameters for sink filling
#[derive(Debug, Clone)]
pub struct FillSinksParams {
    /// Minimum slope to enforce between cells (prevents flat areas).
    /// Set to 0.0 to allow flat areas after filling.
    pub min_slope: f64,
    /// Upper bound on forward/backward sweep pairs before giving up
    pub max_iterations: usize,
}

impl Default for FillSinksParams {
    fn default() -> Self {
        Self {
            min_slope: 0.01,
            max_iterations: 1000,
        }
    }
}

/// Fill sinks algorithm
#[derive(Debug, Clone, Default)]
pub struct FillSinks;

impl Algorithm for FillSinks {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = FillSinksParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fill Sinks"
    }

    fn description(&self) -> &'static str {
        "Fill depressions in a DEM using Planchon-Darboux (2001) method"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        fill_sinks(&input, params)
    }
}

/// D8 neighbor offsets: (row_offset, col_offset)
const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// D8 distances: cardinal = cell_size, diagonal = cell_size * sqrt(2)
const D8_DISTANCES: [f64; 8] = [
    std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
    1.0,                           1.0,
    std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
];

/// One relaxation step for an interior cell. Returns true if `w` changed.
///
/// Nodata neighbours act as outlets: a cell next to one keeps its DEM value.
#[inline]
fn relax(
    dem: &Raster<f64>,
    w: &mut Array2<f64>,
    row: usize,
    col: usize,
    epsilon: f64,
    big_value: f64,
) -> bool {
    let dem_val = unsafe { dem.get_unchecked(row, col) };
    if dem.is_nodata(dem_val) || w[(row, col)] <= dem_val {
        return false;
    }

    let mut changed = false;
    for (idx, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
        let nr = (row as isize + dr) as usize;
        let nc = (col as isize + dc) as usize;

        if dem.is_nodata(unsafe { dem.get_unchecked(nr, nc) }) {
            w[(row, col)] = dem_val;
            return true;
        }

        let wn = w[(nr, nc)];
        if wn >= big_value {
            continue;
        }

        let new_val = wn + epsilon * D8_DISTANCES[idx];
        if dem_val >= new_val {
            w[(row, col)] = dem_val;
            return true;
        }
        if w[(row, col)] > new_val {
            w[(row, col)] = new_val;
            changed = true;
        }
    }
    changed
}

/// Fill depressions in a DEM using the Planchon-Darboux (2001) algorithm.
///
/// The surface starts at +∞ everywhere except the border and is lowered by
/// alternating forward and backward sweeps until nothing changes.
///
/// # Errors
/// - [`Error::EmptyInput`] when the DEM has no valid cells
/// - [`Error::Algorithm`] when the surface is still changing after
///   `max_iterations` sweep pairs
pub fn fill_sinks(dem: &Raster<f64>, params: FillSinksParams) -> Result<Raster<f64>> {
    if params.max_iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "max_iterations",
            value: "0".into(),
            reason: "at least one sweep is required".into(),
        });
    }
    if dem.valid_count() == 0 {
        return Err(Error::EmptyInput("DEM contains no valid cells".into()));
    }

    let (rows, cols) = dem.shape();
    let epsilon = params.min_slope * dem.cell_size();

    // W(c) = DEM(c) on the border and for nodata, a huge value elsewhere
    let big_value = f64::MAX / 2.0;
    let mut w = Array2::from_elem((rows, cols), big_value);

    for row in 0..rows {
        for col in 0..cols {
            let val = unsafe { dem.get_unchecked(row, col) };
            let border = row == 0 || row == rows - 1 || col == 0 || col == cols - 1;
            if border || dem.is_nodata(val) {
                w[(row, col)] = val;
            }
        }
    }

    let mut iterations = 0usize;
    loop {
        if iterations == params.max_iterations {
            return Err(Error::Algorithm(format!(
                "Planchon-Darboux did not converge within {} iterations",
                params.max_iterations
            )));
        }
        iterations += 1;

        let mut changed = false;

        // Forward pass: top-left to bottom-right
        for row in 1..rows.saturating_sub(1) {
            for col in 1..cols.saturating_sub(1) {
                changed |= relax(dem, &mut w, row, col, epsilon, big_value);
            }
        }

        // Backward pass: bottom-right to top-left
        for row in (1..rows.saturating_sub(1)).rev() {
            for col in (1..cols.saturating_sub(1)).rev() {
                changed |= relax(dem, &mut w, row, col, epsilon, big_value);
            }
        }

        if !changed {
            break;
        }
    }

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(dem.nodata());
    *output.data_mut() = w;

    Ok(output)
}
