//! D8 flow direction algorithm
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = pit/flat (no outflow), 1-8 = direction to steepest neighbor,
//! 255 = nodata.

use ndarray::Array2;
use crate::maybe_rayon::*;
use floodscope_core::raster::{d8, Raster};
use floodscope_core::{Algorithm, Error, Result};

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Horizontal distance to each neighbour, honouring non-square pixels
fn neighbor_distances(dem: &Raster<f64>) -> [f64; 9] {
    let gt = dem.transform();
    let dx = gt.pixel_width.abs();
    let dy = gt.pixel_height.abs();
    let diag = dx.hypot(dy);

    let mut dist = [0.0; 9];
    for (dir, d) in dist.iter_mut().enumerate().skip(1) {
        let (dr, dc) = d8::OFFSETS[dir];
        *d = match (dr != 0, dc != 0) {
            (true, true) => diag,
            (true, false) => dy,
            _ => dx,
        };
    }
    dist
}

/// Calculate D8 flow direction from a DEM.
///
/// Each valid cell points to the neighbour with the greatest drop per unit
/// distance. Ties keep the first direction in E, NE, N, NW, W, SW, S, SE
/// order, since only a strictly steeper drop replaces the current best.
///
/// - `0` = no lower neighbour (pit, or flat that was not conditioned)
/// - `1`-`8` = direction to the steepest downslope neighbour
/// - `255` = nodata cell
///
/// The input should be hydrologically conditioned for meaningful routing.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let dist = neighbor_distances(dem);

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![d8::PIT; cols];

            for col in 0..cols {
                let center = unsafe { dem.get_unchecked(row, col) };

                if dem.is_nodata(center) {
                    row_data[col] = d8::NODATA;
                    continue;
                }

                let mut max_drop = 0.0_f64;
                let mut best_dir = d8::PIT;

                for dir in 1..=8u8 {
                    let Some((nr, nc)) = d8::downstream(row, col, dir, rows, cols) else {
                        continue;
                    };

                    let neighbor = unsafe { dem.get_unchecked(nr, nc) };
                    if dem.is_nodata(neighbor) {
                        continue;
                    }

                    let drop = (center - neighbor) / dist[dir as usize];

                    if drop > max_drop {
                        max_drop = drop;
                        best_dir = dir;
                    }
                }

                row_data[col] = best_dir;
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(d8::NODATA));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
