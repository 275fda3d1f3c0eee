//! Spectral water index (MNDWI) and water mask
//!
//! `MNDWI = (Green - SWIR) / (Green + SWIR)` (Xu, 2006). Each band is first
//! scaled by its own maximum, so sensors with different reflectance scaling
//! compare on the same footing, and a small constant keeps the ratio finite
//! where both bands are zero.

use ndarray::Array2;
use crate::maybe_rayon::*;
use crate::warp::resample_to_shape;
use floodscope_core::raster::{Mask, Raster};
use floodscope_core::{Error, Result};

use super::threshold::{threshold_mask, Comparison};

/// Added to the denominator of the normalized difference
pub const MNDWI_EPSILON: f64 = 1e-6;

/// Output of [`mndwi_water_mask`]
#[derive(Debug, Clone)]
pub struct WaterIndex {
    /// Index values, NaN where either band is nodata
    pub index: Raster<f64>,
    /// 1 where index > 0
    pub mask: Mask,
}

/// Largest valid value of a band, if any
fn band_max(band: &Raster<f64>) -> Option<f64> {
    band.data()
        .iter()
        .copied()
        .filter(|&v| !band.is_nodata(v))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
}

/// Scale a band by its maximum valid value; a zero maximum divides by 1.
///
/// Nodata cells become NaN.
pub fn normalize_by_max(band: &Raster<f64>) -> Raster<f64> {
    let divisor = match band_max(band) {
        Some(m) if m != 0.0 => m,
        _ => 1.0,
    };
    let mut out = band.map(|v| if band.is_nodata(v) { f64::NAN } else { v / divisor });
    out.set_nodata(Some(f64::NAN));
    out
}

/// MNDWI of two pixel-aligned bands, each normalized by its own maximum.
///
/// `(g - s) / (g + s + 1e-6)`; NaN where either input is nodata.
pub fn mndwi(green: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    if green.shape() != swir.shape() {
        return Err(Error::SizeMismatch {
            er: green.rows(),
            ec: green.cols(),
            ar: swir.rows(),
            ac: swir.cols(),
        });
    }

    let g = normalize_by_max(green);
    let s = normalize_by_max(swir);
    let (rows, cols) = g.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let gv = unsafe { g.get_unchecked(row, col) };
                let sv = unsafe { s.get_unchecked(row, col) };
                if gv.is_nan() || sv.is_nan() {
                    continue;
                }
                row_data[col] = (gv - sv) / (gv + sv + MNDWI_EPSILON);
            }
            row_data
        })
        .collect();

    let mut output = green.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Water mask from a green and a SWIR band.
///
/// The SWIR band is resampled onto the green band's shape with nearest
/// neighbour first, so the result lives on the green band's grid. A pixel
/// is water when its index is strictly positive; an index of exactly 0 and
/// nodata pixels are not water.
///
/// # Errors
/// [`Error::EmptyInput`] when either band has no cells.
pub fn mndwi_water_mask(green: &Raster<f64>, swir: &Raster<f64>) -> Result<WaterIndex> {
    if green.is_empty() {
        return Err(Error::EmptyInput("green band has no pixels".into()));
    }
    if swir.is_empty() {
        return Err(Error::EmptyInput("SWIR band has no pixels".into()));
    }

    let (rows, cols) = green.shape();
    let swir = resample_to_shape(swir, rows, cols)?;

    let index = mndwi(green, &swir)?;
    let mask = threshold_mask(&index, Comparison::GreaterThan(0.0))?;

    Ok(WaterIndex { index, mask })
}
