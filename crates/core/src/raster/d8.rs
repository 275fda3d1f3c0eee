//! D8 flow direction encoding
//!
//! Codes 1-8 walk counter-clockwise from east. Code 0 marks a pit or a flat
//! with no lower neighbour, [`NODATA`] marks cells outside the valid DEM.

/// Direction offsets: (row_offset, col_offset), indexed by direction code
pub const OFFSETS: [(isize, isize); 9] = [
    (0, 0),   // 0: no flow / pit
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Distance multipliers for each direction (cardinal 1, diagonal sqrt(2))
pub const DISTANCES: [f64; 9] = [
    0.0,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
    1.0,
    std::f64::consts::SQRT_2,
];

/// Code written for cells whose elevation is nodata
pub const NODATA: u8 = 255;

/// Code for cells with no downslope neighbour
pub const PIT: u8 = 0;

/// The opposite direction (E ↔ W, NE ↔ SW, ...)
pub fn opposite(dir: u8) -> u8 {
    match dir {
        1..=8 => ((dir - 1 + 4) % 8) + 1,
        other => other,
    }
}

/// Cell reached by following `dir` from (`row`, `col`), if it is inside the grid
pub fn downstream(row: usize, col: usize, dir: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    if !(1..=8).contains(&dir) {
        return None;
    }
    let (dr, dc) = OFFSETS[dir as usize];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        return None;
    }
    Some((nr as usize, nc as usize))
}
