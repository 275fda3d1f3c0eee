//! Flow accumulation algorithm
//!
//! Counts the upstream cells draining into each cell over a D8 flow
//! direction graph, in topological (Kahn) order.

use std::collections::VecDeque;
use floodscope_core::raster::{d8, Raster};
use floodscope_core::{Algorithm, Error, Result};
use ndarray::Array2;

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Calculate upstream contributing area from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Headwater cells get 0; every other cell gets the number of cells whose
/// flow path passes through it. Cells coded [`d8::NODATA`] get NaN and
/// contribute nothing downstream.
///
/// # Algorithm
/// 1. Count incoming flows for each cell (in-degree)
/// 2. Queue every cell with in-degree 0
/// 3. Pop a cell, pass `acc + 1` downstream, enqueue the receiver once all
///    of its donors are done
///
/// # Errors
/// [`Error::Algorithm`] if the direction graph contains a cycle, which
/// leaves cells that never reach in-degree 0.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();
    let dir_at = |row: usize, col: usize| unsafe { flow_dir.get_unchecked(row, col) };

    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    let mut valid = 0usize;

    for row in 0..rows {
        for col in 0..cols {
            let dir = dir_at(row, col);
            if dir == d8::NODATA {
                continue;
            }
            valid += 1;
            if let Some((nr, nc)) = d8::downstream(row, col, dir, rows, cols) {
                if dir_at(nr, nc) != d8::NODATA {
                    in_degree[(nr, nc)] += 1;
                }
            }
        }
    }

    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut accumulation = Array2::<f64>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            if dir_at(row, col) == d8::NODATA {
                accumulation[(row, col)] = f64::NAN;
            } else if in_degree[(row, col)] == 0 {
                queue.push_back((row, col));
            }
        }
    }

    let mut processed = 0usize;
    while let Some((row, col)) = queue.pop_front() {
        processed += 1;

        let Some((nr, nc)) = d8::downstream(row, col, dir_at(row, col), rows, cols) else {
            continue;
        };
        if dir_at(nr, nc) == d8::NODATA {
            continue;
        }

        accumulation[(nr, nc)] += accumulation[(row, col)] + 1.0;

        in_degree[(nr, nc)] -= 1;
        if in_degree[(nr, nc)] == 0 {
            queue.push_back((nr, nc));
        }
    }

    if processed != valid {
        return Err(Error::Algorithm(format!(
            "flow direction graph has a cycle: {} of {} cells ordered",
            processed, valid
        )));
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = accumulation;

    Ok(output)
}
