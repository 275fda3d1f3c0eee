//! Priority-Flood depression filling
//!
//! O(n log n) depression filling. Cells are processed in elevation order
//! from the edge of the valid data inwards with a min-heap, so each cell is
//! raised at most to the spill level of the basin it drains through.
//!
//! With a positive epsilon every filled cell ends up strictly above the cell
//! it was reached from. Flats and filled depressions therefore slope toward
//! their spill point and D8 can route across them.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use floodscope_core::raster::Raster;
use floodscope_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// A cell in the priority queue.
///
/// Ordered by elevation, then by insertion sequence, so equal-elevation
/// cells leave the queue in the order they entered it.
#[derive(Debug, Clone)]
struct Cell {
    elevation: f64,
    seq: u64,
    row: usize,
    col: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so BinaryHeap (max-heap) pops the lowest, oldest cell first
impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// D8 neighbor offsets
const D8_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

/// Parameters for Priority-Flood filling
#[derive(Debug, Clone)]
pub struct PriorityFloodParams {
    /// Minimum elevation increment enforced along every filled flow path.
    /// 0.0 leaves filled depressions perfectly flat.
    pub epsilon: f64,
}

impl Default for PriorityFloodParams {
    fn default() -> Self {
        Self { epsilon: 1e-5 }
    }
}

/// Priority-Flood fill algorithm
#[derive(Debug, Clone, Default)]
pub struct PriorityFlood;

impl Algorithm for PriorityFlood {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = PriorityFloodParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Priority-Flood"
    }

    fn description(&self) -> &'static str {
        "Fill depressions using Priority-Flood (Barnes 2014)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        priority_flood(&input, params)
    }
}

/// Fill depressions in a DEM using Priority-Flood (Barnes 2014).
///
/// 1. Seed a min-heap with every valid cell on the grid border or next to
///    a nodata cell.
/// 2. Pop the lowest cell; each unvisited neighbour becomes
///    `max(own elevation, popped + epsilon)` and is pushed.
/// 3. Repeat until the heap is empty.
///
/// Every valid cell is pushed and popped exactly once; a run that pops more
/// cells than the grid holds is reported as non-convergence.
///
/// # Errors
/// - [`Error::InvalidParameter`] for a negative or non-finite epsilon
/// - [`Error::EmptyInput`] when the DEM has no valid cells
/// - [`Error::Algorithm`] if the pop bound is exceeded
pub fn priority_flood(dem: &Raster<f64>, params: PriorityFloodParams) -> Result<Raster<f64>> {
    let epsilon = params.epsilon;
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(Error::InvalidParameter {
            name: "epsilon",
            value: epsilon.to_string(),
            reason: "must be a finite, non-negative number".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let is_nd = |v: f64| dem.is_nodata(v);

    let mut output = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    let mut visited = Array2::<bool>::from_elem((rows, cols), false);
    let mut heap = BinaryHeap::new();
    let mut seq: u64 = 0;
    let mut valid_cells = 0usize;

    // Mark nodata first so seeding can look at any neighbour
    for row in 0..rows {
        for col in 0..cols {
            let val = unsafe { dem.get_unchecked(row, col) };
            if is_nd(val) {
                visited[(row, col)] = true;
                output[(row, col)] = val;
            } else {
                valid_cells += 1;
            }
        }
    }

    if valid_cells == 0 {
        return Err(Error::EmptyInput("DEM contains no valid cells".into()));
    }

    // Seed with cells on the edge of the valid data
    for row in 0..rows {
        for col in 0..cols {
            if visited[(row, col)] {
                continue;
            }
            let on_border = row == 0 || row == rows - 1 || col == 0 || col == cols - 1;
            let touches_nodata = !on_border
                && D8_OFFSETS.iter().any(|&(dr, dc)| {
                    let nr = (row as isize + dr) as usize;
                    let nc = (col as isize + dc) as usize;
                    is_nd(unsafe { dem.get_unchecked(nr, nc) })
                });

            if on_border || touches_nodata {
                let val = unsafe { dem.get_unchecked(row, col) };
                heap.push(Cell { elevation: val, seq, row, col });
                seq += 1;
                visited[(row, col)] = true;
                output[(row, col)] = val;
            }
        }
    }

    let mut pops = 0usize;
    while let Some(cell) = heap.pop() {
        pops += 1;
        if pops > valid_cells {
            return Err(Error::Algorithm(format!(
                "Priority-Flood did not converge: {} pops for {} valid cells",
                pops, valid_cells
            )));
        }

        for &(dr, dc) in &D8_OFFSETS {
            let nr = cell.row as isize + dr;
            let nc = cell.col as isize + dc;

            if nr < 0 || nc < 0 || (nr as usize) >= rows || (nc as usize) >= cols {
                continue;
            }

            let nr = nr as usize;
            let nc = nc as usize;

            if visited[(nr, nc)] {
                continue;
            }
            visited[(nr, nc)] = true;

            let neighbor_elev = unsafe { dem.get_unchecked(nr, nc) };

            // Raise anything not strictly above the spill path
            let filled_elev = if neighbor_elev < cell.elevation + epsilon {
                cell.elevation + epsilon
            } else {
                neighbor_elev
            };

            output[(nr, nc)] = filled_elev;
            heap.push(Cell {
                elevation: filled_elev,
                seq,
                row: nr,
                col: nc,
            });
            seq += 1;
        }
    }

    let mut result = dem.with_same_meta::<f64>(rows, cols);
    result.set_nodata(dem.nodata());
    *result.data_mut() = output;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodscope_core::GeoTransform;

    fn create_dem_with_sink() -> Raster<f64> {
        // 7x7 DEM with a depression in the center
        let values = vec![
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 3.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let mut dem = Raster::from_vec(values, 7, 7).unwrap();
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        dem
    }

    #[test]
    fn test_priority_flood_fills_sink() {
        let dem = create_dem_with_sink();
        let filled = priority_flood(&dem, PriorityFloodParams { epsilon: 0.0 }).unwrap();

        // The whole bowl drains over the 9.0 rim
        let center = filled.get(3, 3).unwrap();
        assert_eq!(center, 9.0, "Sink at (3,3) should fill to the rim, got {}", center);
    }

    #[test]
    fn test_priority_flood_preserves_border() {
        let dem = create_dem_with_sink();
        let filled = priority_flood(&dem, PriorityFloodParams::default()).unwrap();

        assert_eq!(filled.get(0, 0).unwrap(), 9.0);
        assert_eq!(filled.get(0, 3).unwrap(), 9.0);
        assert_eq!(filled.get(6, 6).unwrap(), 9.0);
    }

    #[test]
    fn test_priority_flood_no_change_on_clean_dem() {
        // Sloped plane: no sinks
        let values: Vec<f64> = (0..100).map(|i| ((i / 10) + (i % 10)) as f64).collect();
        let dem = Raster::from_vec(values, 10, 10).unwrap();

        let filled = priority_flood(&dem, PriorityFloodParams::default()).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                let orig = dem.get(row, col).unwrap();
                let fill = filled.get(row, col).unwrap();
                assert!(
                    (fill - orig).abs() < 1e-4,
                    "Clean DEM should be unchanged at ({}, {}): orig={}, fill={}",
                    row, col, orig, fill
                );
            }
        }
    }

    #[test]
    fn test_priority_flood_epsilon_creates_gradient() {
        let dem = create_dem_with_sink();
        let filled = priority_flood(&dem, PriorityFloodParams { epsilon: 0.01 }).unwrap();

        // Cells further from the rim are reached later and sit higher
        let ring = filled.get(1, 3).unwrap();
        let center = filled.get(3, 3).unwrap();
        assert!(ring > 9.0, "First ring should be above the rim: {}", ring);
        assert!(center > ring, "Center should be above the ring: center={}, ring={}", center, ring);
    }

    #[test]
    fn test_priority_flood_never_lowers_elevation() {
        let dem = create_dem_with_sink();
        let filled = priority_flood(&dem, PriorityFloodParams::default()).unwrap();

        for (orig, fill) in dem.data().iter().zip(filled.data().iter()) {
            assert!(
                *fill >= orig - 1e-10,
                "Priority-Flood must never lower elevation: orig={}, fill={}",
                orig, fill
            );
        }
    }

    #[test]
    fn test_priority_flood_outlet_respects_low_border() {
        // 5x5 DEM: border=10 except outlet at (4,2)=2, center sink at (2,2)=1
        let mut dem = Raster::filled(5, 5, 5.0);
        for i in 0..5 {
            dem.set(0, i, 10.0).unwrap();
            dem.set(4, i, 10.0).unwrap();
            dem.set(i, 0, 10.0).unwrap();
            dem.set(i, 4, 10.0).unwrap();
        }
        dem.set(2, 2, 1.0).unwrap();
        dem.set(4, 2, 2.0).unwrap();

        let filled = priority_flood(&dem, PriorityFloodParams { epsilon: 0.0 }).unwrap();

        // Sink only has to reach the interior level that spills to the outlet
        let center = filled.get(2, 2).unwrap();
        assert!(
            (2.0..=5.0).contains(&center),
            "Sink should fill to outlet level (2.0-5.0), got {}",
            center
        );
    }

    #[test]
    fn test_priority_flood_keeps_nodata_and_seeds_around_it() {
        let mut dem = create_dem_with_sink();
        dem.set_nodata(Some(-9999.0));
        dem.set(3, 3, -9999.0).unwrap();

        let filled = priority_flood(&dem, PriorityFloodParams { epsilon: 0.0 }).unwrap();

        assert!(filled.is_nodata(filled.get(3, 3).unwrap()));
        // Cells around the hole drain into it and keep their elevation
        assert_eq!(filled.get(2, 3).unwrap(), 7.0);
    }

    #[test]
    fn test_priority_flood_rejects_empty_dem() {
        let dem = Raster::filled(3, 3, f64::NAN);
        let err = priority_flood(&dem, PriorityFloodParams::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[test]
    fn test_priority_flood_rejects_negative_epsilon() {
        let dem = create_dem_with_sink();
        assert!(priority_flood(&dem, PriorityFloodParams { epsilon: -1.0 }).is_err());
    }

    #[test]
    fn test_heap_breaks_ties_by_insertion_order() {
        let mut heap = BinaryHeap::new();
        heap.push(Cell { elevation: 1.0, seq: 2, row: 0, col: 2 });
        heap.push(Cell { elevation: 1.0, seq: 0, row: 0, col: 0 });
        heap.push(Cell { elevation: 0.5, seq: 3, row: 0, col: 3 });
        heap.push(Cell { elevation: 1.0, seq: 1, row: 0, col: 1 });

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|c| c.col)).collect();
        assert_eq!(order, vec![3, 0, 1, 2]);
    }
}
