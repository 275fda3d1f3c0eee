//! Nearest-neighbour reprojection onto a target grid

use crate::maybe_rayon::*;
use floodscope_core::crs::Transformer;
use floodscope_core::raster::{Grid, Raster, RasterElement};
use floodscope_core::{Error, Result};
use ndarray::Array2;

/// Warp `src` onto `dst` with nearest-neighbour sampling.
///
/// Each destination pixel centre is transformed into the source CRS and
/// takes the value of the source cell it falls in. When both sides share a
/// CRS the centre is mapped through the two geotransforms only. Pixels outside the
/// source, or landing on source nodata, get `dst_nodata`. The output has
/// no nodata value set, so a fill of 0 reads as plain absence.
///
/// # Errors
/// - [`Error::MissingCrs`] when either side has no CRS
/// - [`Error::UnsupportedCrs`] when the CRSs differ and one of them has no
///   projection support
pub fn reproject_nearest<T: RasterElement>(src: &Raster<T>, dst: &Grid, dst_nodata: T) -> Result<Raster<T>> {
    let src_crs = src
        .crs()
        .ok_or_else(|| Error::MissingCrs("source raster".into()))?;
    let dst_crs = dst
        .crs
        .as_ref()
        .ok_or_else(|| Error::MissingCrs("target grid".into()))?;
    if src.is_empty() {
        return Err(Error::EmptyInput("cannot reproject an empty raster".into()));
    }

    let to_src = if src_crs.is_equivalent(dst_crs) {
        None
    } else {
        Some(Transformer::new(dst_crs, src_crs)?)
    };
    let (src_rows, src_cols) = src.shape();
    let src_gt = *src.transform();
    let dst_gt = dst.transform;
    let (rows, cols) = dst.shape();

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![dst_nodata; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = dst_gt.pixel_to_geo(col, row);
                let (sx, sy) = match &to_src {
                    Some(t) => t.transform(x, y),
                    None => (x, y),
                };
                let (fc, fr) = src_gt.geo_to_pixel(sx, sy);
                if !(fc.is_finite() && fr.is_finite()) || fc < 0.0 || fr < 0.0 {
                    continue;
                }
                let (sc, sr) = (fc.floor() as usize, fr.floor() as usize);
                if sr >= src_rows || sc >= src_cols {
                    continue;
                }
                let v = unsafe { src.get_unchecked(sr, sc) };
                if !src.is_nodata(v) {
                    *out = v;
                }
            }
            row_data
        })
        .collect();

    let mut output = Raster::on_grid(dst, dst_nodata);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Bring `src` onto `grid`.
///
/// An already aligned raster is returned as is. A raster with the same CRS
/// but different pixels is resampled, and one in another CRS is reprojected.
/// Both go through [`reproject_nearest`] with `fill` as destination nodata.
pub fn align_to_grid<T: RasterElement>(src: &Raster<T>, grid: &Grid, fill: T) -> Result<Raster<T>> {
    if src.grid().is_aligned_with(grid) {
        return Ok(src.clone());
    }
    reproject_nearest(src, grid, fill)
}
