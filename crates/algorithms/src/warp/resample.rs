//! Nearest-neighbour resampling to a target shape

use ndarray::Array2;
use crate::maybe_rayon::*;
use floodscope_core::raster::{Raster, RasterElement};
use floodscope_core::{Error, Result};

/// Source index sampled by destination index `i` when `src_n` cells are
/// stretched over `dst_n` cells (pixel-centre mapping).
#[inline]
fn nearest_index(i: usize, src_n: usize, dst_n: usize) -> usize {
    let pos = ((i as f64 + 0.5) * src_n as f64 / dst_n as f64).floor() as usize;
    pos.min(src_n - 1)
}

/// Resample `src` to exactly `rows` × `cols` cells with nearest neighbour.
///
/// The footprint is unchanged: the transform is rescaled so the output
/// covers the same bounds. Nodata is carried over.
pub fn resample_to_shape<T: RasterElement>(src: &Raster<T>, rows: usize, cols: usize) -> Result<Raster<T>> {
    if src.is_empty() {
        return Err(Error::EmptyInput("cannot resample an empty raster".into()));
    }
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions { width: cols, height: rows });
    }
    if src.shape() == (rows, cols) {
        return Ok(src.clone());
    }

    let (src_rows, src_cols) = src.shape();
    let col_map: Vec<usize> = (0..cols).map(|c| nearest_index(c, src_cols, cols)).collect();

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let sr = nearest_index(row, src_rows, rows);
            col_map
                .iter()
                .map(|&sc| unsafe { src.get_unchecked(sr, sc) })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut output = src.with_same_meta::<T>(rows, cols);
    output.set_transform(src.transform().scaled(
        src_cols as f64 / cols as f64,
        src_rows as f64 / rows as f64,
    ));
    output.set_nodata(src.nodata());
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}
