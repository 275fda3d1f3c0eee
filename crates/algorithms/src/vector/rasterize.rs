//! Burning polygons into a binary mask
//!
//! A pixel is set when its centre falls inside a polygon, using the
//! even-odd rule across a polygon's exterior and holes. Overlapping
//! polygons are unioned.

use floodscope_core::raster::{Grid, Mask};
use floodscope_core::Result;
use geo::{Geometry, LineString, Polygon};

/// Polygon edge in fractional pixel coordinates
#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Edge {
    /// X where the edge crosses the horizontal line `y`, half-open in y so
    /// shared vertices are counted once
    #[inline]
    fn crossing(&self, y: f64) -> Option<f64> {
        let (lo, hi) = if self.y0 < self.y1 { (self.y0, self.y1) } else { (self.y1, self.y0) };
        if y < lo || y >= hi {
            return None;
        }
        let t = (y - self.y0) / (self.y1 - self.y0);
        Some(self.x0 + t * (self.x1 - self.x0))
    }
}

fn ring_edges(ring: &LineString<f64>, grid: &Grid, out: &mut Vec<Edge>) {
    let pts: Vec<(f64, f64)> = ring
        .0
        .iter()
        .map(|c| grid.transform.geo_to_pixel(c.x, c.y))
        .collect();
    for w in pts.windows(2) {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            continue;
        }
        if y0 != y1 {
            out.push(Edge { x0, y0, x1, y1 });
        }
    }
}

fn burn_polygon(poly: &Polygon<f64>, grid: &Grid, mask: &mut Mask) {
    let mut edges = Vec::new();
    ring_edges(poly.exterior(), grid, &mut edges);
    for hole in poly.interiors() {
        ring_edges(hole, grid, &mut edges);
    }
    if edges.is_empty() {
        return;
    }

    let min_y = edges.iter().map(|e| e.y0.min(e.y1)).fold(f64::INFINITY, f64::min);
    let max_y = edges.iter().map(|e| e.y0.max(e.y1)).fold(f64::NEG_INFINITY, f64::max);

    // Rows whose centre lies in [min_y, max_y)
    let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
    let last_row = ((max_y - 0.5).ceil().min(grid.rows as f64)).max(0.0) as usize;

    let data = mask.data_mut();
    let mut xs: Vec<f64> = Vec::new();

    for row in first_row..last_row {
        let yc = row as f64 + 0.5;
        xs.clear();
        xs.extend(edges.iter().filter_map(|e| e.crossing(yc)));
        xs.sort_by(|a, b| a.total_cmp(b));

        for pair in xs.chunks_exact(2) {
            // Columns whose centre lies in [x_a, x_b)
            let start = (pair[0] - 0.5).ceil().max(0.0);
            let end = (pair[1] - 0.5).ceil().min(grid.cols as f64);
            if end <= start {
                continue;
            }
            for col in start as usize..end as usize {
                data[(row, col)] = 1;
            }
        }
    }
}

fn burn_geometry(geom: &Geometry<f64>, grid: &Grid, mask: &mut Mask) {
    match geom {
        Geometry::Polygon(p) => burn_polygon(p, grid, mask),
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                burn_polygon(p, grid, mask);
            }
        }
        Geometry::Rect(r) => burn_polygon(&r.to_polygon(), grid, mask),
        Geometry::Triangle(t) => burn_polygon(&t.to_polygon(), grid, mask),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                burn_geometry(g, grid, mask);
            }
        }
        _ => {}
    }
}

/// Rasterize geometries onto `grid`: 1 where a pixel centre is covered.
///
/// Geometries must already be in the grid's CRS. Non-areal geometries are
/// ignored; an empty iterator yields an all-zero mask.
pub fn rasterize<'a, I>(geometries: I, grid: &Grid) -> Result<Mask>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut mask = Mask::zeros_on(grid);
    for geom in geometries {
        burn_geometry(geom, grid, &mut mask);
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodscope_core::{GeoTransform, CRS};
    use geo::polygon;

    fn grid() -> Grid {
        // 10 × 10 pixels of 1 unit, upper-left at (0, 10)
        Grid::new(10, 10, GeoTransform::new(0.0, 10.0, 1.0, -1.0), Some(CRS::from_epsg(32630)))
    }

    #[test]
    fn burns_pixels_whose_centres_are_inside() {
        let square: Geometry<f64> =
            polygon![(x: 2.0, y: 2.0), (x: 5.0, y: 2.0), (x: 5.0, y: 6.0), (x: 2.0, y: 6.0)].into();

        let mask = rasterize([&square], &grid()).unwrap();
        assert_eq!(mask.count_ones(), 12, "3 × 4 pixel centres inside");
        // y in (2, 6) → rows 4..8; x in (2, 5) → cols 2..5
        assert_eq!(mask.get(4, 2).unwrap(), 1);
        assert_eq!(mask.get(7, 4).unwrap(), 1);
        assert_eq!(mask.get(3, 2).unwrap(), 0);
        assert_eq!(mask.get(4, 5).unwrap(), 0);
        assert_eq!(mask.crs(), grid().crs.as_ref());
    }

    #[test]
    fn holes_are_left_empty() {
        let donut: Geometry<f64> = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)])],
        )
        .into();

        let mask = rasterize([&donut], &grid()).unwrap();
        assert_eq!(mask.count_ones(), 36 - 4);
        assert_eq!(mask.get(6, 3).unwrap(), 0, "hole centre (3.5, 3.5)");
    }

    #[test]
    fn partially_outside_polygon_is_clipped_to_grid() {
        let big: Geometry<f64> =
            polygon![(x: -5.0, y: -5.0), (x: 3.0, y: -5.0), (x: 3.0, y: 20.0), (x: -5.0, y: 20.0)].into();

        let mask = rasterize([&big], &grid()).unwrap();
        assert_eq!(mask.count_ones(), 30);
        assert!(mask.is_binary());
    }

    #[test]
    fn overlapping_polygons_union() {
        let a: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)].into();
        let b: Geometry<f64> =
            polygon![(x: 2.0, y: 0.0), (x: 6.0, y: 0.0), (x: 6.0, y: 4.0), (x: 2.0, y: 4.0)].into();

        let mask = rasterize([&a, &b], &grid()).unwrap();
        assert_eq!(mask.count_ones(), 24);
    }

    #[test]
    fn nothing_to_burn_gives_zeros() {
        let mask = rasterize(std::iter::empty(), &grid()).unwrap();
        assert_eq!(mask.shape(), (10, 10));
        assert!(mask.is_all_zero());
    }
}
