//! DEM hydrological correction
//!
//! Chains depression filling, D8 flow direction and flow accumulation into
//! one conditioning step.

use floodscope_core::raster::Raster;
use floodscope_core::{Algorithm, Error, Result};

use super::fill_sinks::{fill_sinks, FillSinksParams};
use super::flow_accumulation::flow_accumulation;
use super::flow_direction::flow_direction;
use super::priority_flood::{priority_flood, PriorityFloodParams};

/// Depression filling method
#[derive(Debug, Clone)]
pub enum FillMethod {
    /// Priority-Flood with an epsilon gradient (Barnes 2014)
    PriorityFlood(PriorityFloodParams),
    /// Iterative Planchon-Darboux (2001)
    PlanchonDarboux(FillSinksParams),
}

impl Default for FillMethod {
    fn default() -> Self {
        FillMethod::PriorityFlood(PriorityFloodParams::default())
    }
}

/// Parameters for [`condition_dem`]
#[derive(Debug, Clone, Default)]
pub struct ConditioningParams {
    /// Skip filling when the DEM is already hydrologically conditioned
    pub already_filled: bool,
    pub fill_method: FillMethod,
}

/// Result of conditioning a DEM
#[derive(Debug, Clone)]
pub struct ConditionedDem {
    /// Depression-free DEM (the input itself when `already_filled`)
    pub filled: Raster<f64>,
    /// D8 codes, 255 on nodata
    pub flow_direction: Raster<u8>,
    /// Upstream cell counts, NaN on nodata
    pub accumulation: Raster<f64>,
}

/// DEM conditioning algorithm
#[derive(Debug, Clone, Default)]
pub struct ConditionDem;

impl Algorithm for ConditionDem {
    type Input = Raster<f64>;
    type Output = ConditionedDem;
    type Params = ConditioningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Condition DEM"
    }

    fn description(&self) -> &'static str {
        "Fill depressions, then derive D8 flow direction and flow accumulation"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        condition_dem(&input, &params)
    }
}

/// Fill (unless `already_filled`), then compute flow direction and accumulation.
///
/// # Errors
/// - [`Error::EmptyInput`] if the DEM has no valid cells
/// - [`Error::Algorithm`] if filling does not converge within its bound
pub fn condition_dem(dem: &Raster<f64>, params: &ConditioningParams) -> Result<ConditionedDem> {
    if dem.is_empty() || dem.valid_count() == 0 {
        return Err(Error::EmptyInput("DEM contains no valid cells".into()));
    }

    let filled = if params.already_filled {
        dem.clone()
    } else {
        match &params.fill_method {
            FillMethod::PriorityFlood(p) => priority_flood(dem, p.clone())?,
            FillMethod::PlanchonDarboux(p) => fill_sinks(dem, p.clone())?,
        }
    };

    let flow_direction = flow_direction(&filled)?;
    let accumulation = flow_accumulation(&flow_direction)?;

    Ok(ConditionedDem {
        filled,
        flow_direction,
        accumulation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodscope_core::raster::d8;
    use floodscope_core::GeoTransform;

    /// Tilted plane with a pit carved into the middle
    fn pitted_plane() -> Raster<f64> {
        let (rows, cols) = (9, 9);
        let mut values = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                values.push(10.0 + row as f64 * 0.5 + col as f64 * 0.25);
            }
        }
        values[4 * cols + 4] = 2.0;
        let mut dem = Raster::from_vec(values, rows, cols).unwrap();
        dem.set_transform(GeoTransform::new(0.0, 9.0, 1.0, -1.0));
        dem
    }

    fn interior_minima(dem: &Raster<f64>) -> usize {
        let (rows, cols) = dem.shape();
        let mut count = 0;
        for row in 1..rows - 1 {
            for col in 1..cols - 1 {
                let z = dem.get(row, col).unwrap();
                let lowest = (1..=8u8)
                    .filter_map(|dir| d8::downstream(row, col, dir, rows, cols))
                    .all(|(r, c)| dem.get(r, c).unwrap() >= z);
                if lowest {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn conditioning_removes_interior_minima() {
        let dem = pitted_plane();
        assert_eq!(interior_minima(&dem), 1);

        for method in [
            FillMethod::default(),
            FillMethod::PlanchonDarboux(FillSinksParams::default()),
        ] {
            let out = condition_dem(&dem, &ConditioningParams { already_filled: false, fill_method: method }).unwrap();
            assert_eq!(interior_minima(&out.filled), 0);
        }
    }

    #[test]
    fn every_cell_drains_to_the_edge() {
        let dem = pitted_plane();
        let out = condition_dem(&dem, &ConditioningParams::default()).unwrap();
        let (rows, cols) = dem.shape();

        for row in 0..rows {
            for col in 0..cols {
                let (mut r, mut c) = (row, col);
                let mut z = out.filled.get(r, c).unwrap();
                let mut steps = 0;
                while let Some((nr, nc)) =
                    d8::downstream(r, c, out.flow_direction.get(r, c).unwrap(), rows, cols)
                {
                    let nz = out.filled.get(nr, nc).unwrap();
                    assert!(nz < z, "path from ({row},{col}) must descend strictly");
                    (r, c, z) = (nr, nc, nz);
                    steps += 1;
                    assert!(steps <= rows * cols);
                }
                assert!(
                    r == 0 || c == 0 || r == rows - 1 || c == cols - 1,
                    "path from ({row},{col}) ended inside the grid at ({r},{c})"
                );
            }
        }

        // The outlet corner collects the whole grid
        let max_acc = out.accumulation.data().iter().cloned().fold(0.0, f64::max);
        assert_eq!(max_acc, (rows * cols - 1) as f64);
    }

    #[test]
    fn already_filled_skips_filling() {
        let dem = pitted_plane();
        let out = condition_dem(
            &dem,
            &ConditioningParams { already_filled: true, ..Default::default() },
        )
        .unwrap();
        assert_eq!(out.filled.get(4, 4).unwrap(), 2.0);
        assert_eq!(out.flow_direction.get(4, 4).unwrap(), d8::PIT);
    }

    #[test]
    fn empty_dem_is_rejected() {
        let dem = Raster::filled(3, 3, f64::NAN);
        assert!(condition_dem(&dem, &ConditioningParams::default()).is_err());
    }
}
