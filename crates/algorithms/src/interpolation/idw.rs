//! Inverse Distance Weighting (IDW) interpolation
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use crate::maybe_rayon::*;
use floodscope_core::raster::{Grid, Raster};
use floodscope_core::{Error, Result};

use super::SamplePoint;

/// Parameters for IDW interpolation
#[derive(Debug, Clone)]
pub struct IdwParams {
    /// Distance exponent (default: 2.0)
    pub power: f64,
    /// Points farther than this from a cell centre are ignored.
    /// `None` uses every point.
    pub max_radius: Option<f64>,
    /// A point closer than this to a cell centre gives the cell its value
    pub snap_distance: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            max_radius: None,
            snap_distance: 1e-10,
        }
    }
}

/// Interpolate scattered points onto `grid`.
///
/// ```text
/// z(x,y) = Σ(wi * zi) / Σ(wi),  wi = 1 / d(x,y, xi,yi)^p
/// ```
///
/// Cells with no point inside `max_radius` are NaN, which is also the
/// output's nodata value.
pub fn idw(points: &[SamplePoint], grid: &Grid, params: &IdwParams) -> Result<Raster<f64>> {
    if points.is_empty() {
        return Err(Error::EmptyInput("no sample points provided".into()));
    }
    if !(params.power.is_finite() && params.power > 0.0) {
        return Err(Error::InvalidParameter {
            name: "power",
            value: params.power.to_string(),
            reason: "must be a positive number".into(),
        });
    }

    let (rows, cols) = grid.shape();
    let snap_sq = params.snap_distance * params.snap_distance;
    let max_radius_sq = params.max_radius.map(|r| r * r);
    let half_power = params.power / 2.0;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let (cx, cy) = grid.transform.pixel_to_geo(col, row);
                let mut sum_w = 0.0;
                let mut sum_wz = 0.0;
                let mut snapped = None;

                for pt in points {
                    let dsq = pt.dist_sq(cx, cy);
                    if dsq < snap_sq {
                        snapped = Some(pt.value);
                        break;
                    }
                    if max_radius_sq.is_some_and(|max_sq| dsq > max_sq) {
                        continue;
                    }
                    let w = 1.0 / dsq.powf(half_power);
                    sum_w += w;
                    sum_wz += w * pt.value;
                }

                if let Some(v) = snapped {
                    *out = v;
                } else if sum_w > 0.0 {
                    *out = sum_wz / sum_w;
                }
            }

            row_data
        })
        .collect();

    let mut output = Raster::from_vec(data, rows, cols)?;
    output.set_transform(grid.transform);
    output.set_crs(grid.crs.clone());
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}
