//! Binary thresholding
//!
//! Turns a continuous raster into a {0,1} mask. Nodata never passes a
//! threshold.

use ndarray::Array2;
use crate::maybe_rayon::*;
use floodscope_core::raster::{Mask, Raster, RasterElement};
use floodscope_core::{Error, Result};

/// Comparison applied to every valid cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    /// `value > t`
    GreaterThan(f64),
    /// `value >= t`
    AtLeast(f64),
    /// `value < t`
    LessThan(f64),
}

impl Comparison {
    #[inline]
    pub fn test(&self, value: f64) -> bool {
        match *self {
            Comparison::GreaterThan(t) => value > t,
            Comparison::AtLeast(t) => value >= t,
            Comparison::LessThan(t) => value < t,
        }
    }
}

/// 1 where the comparison holds, 0 elsewhere (including nodata and NaN).
///
/// The mask keeps the input's transform and CRS and carries no nodata.
pub fn threshold_mask<T: RasterElement>(raster: &Raster<T>, cmp: Comparison) -> Result<Mask> {
    let (rows, cols) = raster.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(v) {
                    continue;
                }
                if let Some(f) = v.to_f64() {
                    *out = u8::from(cmp.test(f));
                }
            }
            row_data
        })
        .collect();

    let mut mask = raster.with_same_meta::<u8>(rows, cols);
    *mask.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(mask)
}

/// Permanent water from flow accumulation: `acc >= threshold`.
///
/// # Errors
/// [`Error::InvalidParameter`] unless `threshold` is a positive integer.
pub fn accumulation_mask(accumulation: &Raster<f64>, threshold: f64) -> Result<Mask> {
    if !(threshold.is_finite() && threshold >= 1.0 && threshold.fract() == 0.0) {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: threshold.to_string(),
            reason: "must be a positive integer".into(),
        });
    }
    threshold_mask(accumulation, Comparison::AtLeast(threshold))
}

/// Permanent water from elevation: `dem < height`.
pub fn height_mask(dem: &Raster<f64>, height: f64) -> Result<Mask> {
    if !height.is_finite() {
        return Err(Error::InvalidParameter {
            name: "height",
            value: height.to_string(),
            reason: "must be finite".into(),
        });
    }
    threshold_mask(dem, Comparison::LessThan(height))
}
