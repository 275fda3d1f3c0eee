//! Mask vectorization
//!
//! Labels 8-connected regions of 1-pixels and traces each region's
//! boundary along pixel edges into a polygon with holes.
//!
//! Boundary edges are directed so the region lies on the right (in
//! row-down pixel space). At a vertex where two diagonal pixels of the
//! same region meet, the walk turns left, which keeps the diagonal pair
//! inside one ring. Outer rings then have positive shoelace area in pixel
//! space and holes negative, so no point-in-polygon tests are needed to
//! tell them apart.

use std::collections::{HashMap, VecDeque};

use floodscope_core::raster::Mask;
use floodscope_core::vector::{AttributeValue, Feature, FeatureCollection};
use floodscope_core::{Algorithm, Error, Result};
use geo::{Coord, LineString, Orient, Polygon};
use geo::orient::Direction;

/// Parameters for [`polygonize`]
#[derive(Debug, Clone)]
pub struct PolygonizeParams {
    /// Regions with fewer pixels are dropped
    pub min_pixels: usize,
}

impl Default for PolygonizeParams {
    fn default() -> Self {
        Self { min_pixels: 100 }
    }
}

/// Mask to polygon conversion
#[derive(Debug, Clone, Default)]
pub struct Polygonize;

impl Algorithm for Polygonize {
    type Input = Mask;
    type Output = FeatureCollection;
    type Params = PolygonizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Polygonize"
    }

    fn description(&self) -> &'static str {
        "Trace 8-connected regions of a binary mask into polygons with holes"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        polygonize(&input, &params)
    }
}

/// Unit step between pixel corners
type Dir = (i8, i8);

const EAST: Dir = (1, 0);
const SOUTH: Dir = (0, 1);
const WEST: Dir = (-1, 0);
const NORTH: Dir = (0, -1);

#[inline]
fn left_of(d: Dir) -> Dir {
    (d.1, -d.0)
}

/// Pixel corner (x = col, y = row)
type Vertex = (usize, usize);

#[inline]
fn step(v: Vertex, d: Dir) -> Vertex {
    ((v.0 as isize + d.0 as isize) as usize, (v.1 as isize + d.1 as isize) as usize)
}

/// Label 8-connected components of set pixels in raster scan order.
///
/// Returns the label grid (0 = background, labels start at 1) and the
/// pixel list of each component.
fn label_components(mask: &Mask) -> (Vec<u32>, Vec<Vec<(usize, usize)>>) {
    let (rows, cols) = mask.shape();
    let data = mask.data();
    let mut labels = vec![0u32; rows * cols];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for r in 0..rows {
        for c in 0..cols {
            if data[(r, c)] == 0 || labels[r * cols + c] != 0 {
                continue;
            }
            let label = components.len() as u32 + 1;
            let mut pixels = Vec::new();
            labels[r * cols + c] = label;
            queue.push_back((r, c));

            while let Some((pr, pc)) = queue.pop_front() {
                pixels.push((pr, pc));
                for dr in -1isize..=1 {
                    for dc in -1isize..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = pr as isize + dr;
                        let nc = pc as isize + dc;
                        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if data[(nr, nc)] != 0 && labels[nr * cols + nc] == 0 {
                            labels[nr * cols + nc] = label;
                            queue.push_back((nr, nc));
                        }
                    }
                }
            }
            components.push(pixels);
        }
    }

    (labels, components)
}

/// Trace the closed boundary rings of one component, in pixel corners
fn trace_rings(
    pixels: &[(usize, usize)],
    label: u32,
    labels: &[u32],
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<Vertex>>> {
    let same = |r: isize, c: isize| {
        r >= 0
            && c >= 0
            && (r as usize) < rows
            && (c as usize) < cols
            && labels[r as usize * cols + c as usize] == label
    };

    // Outgoing boundary edges per start vertex, with a used flag
    let mut edges: HashMap<Vertex, Vec<(Dir, bool)>> = HashMap::new();
    let mut total = 0usize;
    for &(r, c) in pixels {
        let (ri, ci) = (r as isize, c as isize);
        if !same(ri - 1, ci) {
            edges.entry((c, r)).or_default().push((EAST, false));
            total += 1;
        }
        if !same(ri, ci + 1) {
            edges.entry((c + 1, r)).or_default().push((SOUTH, false));
            total += 1;
        }
        if !same(ri + 1, ci) {
            edges.entry((c + 1, r + 1)).or_default().push((WEST, false));
            total += 1;
        }
        if !same(ri, ci - 1) {
            edges.entry((c, r + 1)).or_default().push((NORTH, false));
            total += 1;
        }
    }

    // Deterministic start order
    let mut starts: Vec<Vertex> = edges.keys().copied().collect();
    starts.sort_by_key(|&(x, y)| (y, x));

    let mut rings = Vec::new();
    let mut consumed = 0usize;

    for start in starts {
        loop {
            let Some(first) = edges
                .get_mut(&start)
                .and_then(|out| out.iter_mut().find(|e| !e.1))
            else {
                break;
            };
            first.1 = true;
            let first_dir = first.0;
            let mut dir = first_dir;
            consumed += 1;

            let mut ring = vec![start];
            let mut at = step(start, dir);

            loop {
                let out = edges.get_mut(&at).ok_or_else(|| {
                    Error::Algorithm(format!("open boundary at pixel corner {:?}", at))
                })?;
                let idx = if out.len() == 1 {
                    0
                } else {
                    let want = left_of(dir);
                    out.iter().position(|(d, _)| *d == want).ok_or_else(|| {
                        Error::Algorithm(format!("ambiguous boundary at pixel corner {:?}", at))
                    })?
                };
                if out[idx].1 {
                    break;
                }
                out[idx].1 = true;
                consumed += 1;
                if consumed > total {
                    return Err(Error::Algorithm("boundary tracing did not terminate".into()));
                }

                let next = out[idx].0;
                if next != dir {
                    ring.push(at);
                }
                dir = next;
                at = step(at, dir);
            }

            // Start vertex is collinear when the ring enters and leaves it straight
            if dir == first_dir {
                ring.remove(0);
            }
            if ring.len() >= 3 {
                rings.push(ring);
            }
        }
    }

    Ok(rings)
}

/// Twice the signed area of a ring in pixel space (positive = outer)
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    let mut sum = 0i64;
    for i in 0..n {
        let (x0, y0) = (ring[i].0 as i64, ring[i].1 as i64);
        let (x1, y1) = (ring[(i + 1) % n].0 as i64, ring[(i + 1) % n].1 as i64);
        sum += x0 * y1 - x1 * y0;
    }
    sum
}

fn to_world(ring: &[Vertex], mask: &Mask) -> LineString<f64> {
    let t = mask.transform();
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| {
            let (wx, wy) = t.apply(x as f64, y as f64);
            Coord { x: wx, y: wy }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Vectorize the 8-connected regions of a binary mask.
///
/// Every region with at least `min_pixels` pixels becomes one polygon
/// feature, in the mask's CRS, with attributes `pixel_count` (pixels in
/// the region) and `area_px` (polygon area in pixel units, holes
/// excluded). Exterior rings are counter-clockwise and holes clockwise.
/// Features are ordered by the raster-scan position of each region's
/// first pixel. An all-zero mask returns an empty collection without
/// tracing.
pub fn polygonize(mask: &Mask, params: &PolygonizeParams) -> Result<FeatureCollection> {
    let mut out = FeatureCollection::new();
    out.crs = mask.crs().cloned();

    if mask.is_all_zero() {
        return Ok(out);
    }

    let (rows, cols) = mask.shape();
    let (labels, components) = label_components(mask);

    for (i, pixels) in components.iter().enumerate() {
        if pixels.len() < params.min_pixels {
            continue;
        }
        let label = i as u32 + 1;
        let rings = trace_rings(pixels, label, &labels, rows, cols)?;

        let mut exterior: Option<(i64, Vec<Vertex>)> = None;
        let mut holes = Vec::new();
        for ring in rings {
            let a2 = signed_area2(&ring);
            if a2 > 0 {
                if exterior.as_ref().map_or(true, |(best, _)| a2 > *best) {
                    exterior = Some((a2, ring));
                }
            } else {
                holes.push((a2, ring));
            }
        }

        let Some((ext_a2, ext)) = exterior else {
            return Err(Error::Algorithm(format!("region {} has no outer boundary", label)));
        };
        let area_px = (ext_a2 + holes.iter().map(|(a, _)| a).sum::<i64>()) as f64 / 2.0;

        let polygon = Polygon::new(
            to_world(&ext, mask),
            holes.iter().map(|(_, h)| to_world(h, mask)).collect(),
        )
        .orient(Direction::Default);

        out.push(
            Feature::new(polygon)
                .with_property("pixel_count", AttributeValue::Int(pixels.len() as i64))
                .with_property("area_px", AttributeValue::Float(area_px)),
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodscope_core::{GeoTransform, CRS};
    use geo::{Area, Geometry, Winding};

    fn mask_from(rows: usize, cols: usize, ones: &[(usize, usize)]) -> Mask {
        let mut m = Mask::new(rows, cols);
        m.set_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));
        m.set_crs(Some(CRS::from_epsg(32630)));
        for &(r, c) in ones {
            m.set(r, c, 1).unwrap();
        }
        m
    }

    fn all() -> PolygonizeParams {
        PolygonizeParams { min_pixels: 1 }
    }

    fn polygon_of(f: &Feature) -> &Polygon<f64> {
        match f.geometry.as_ref() {
            Some(Geometry::Polygon(p)) => p,
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn all_zero_mask_is_empty() {
        let fc = polygonize(&mask_from(5, 5, &[]), &all()).unwrap();
        assert!(fc.is_empty());
        assert_eq!(fc.crs, Some(CRS::from_epsg(32630)));
    }

    #[test]
    fn single_block_becomes_rectangle() {
        let ones: Vec<_> = (1..3).flat_map(|r| (1..4).map(move |c| (r, c))).collect();
        let fc = polygonize(&mask_from(5, 5, &ones), &all()).unwrap();
        assert_eq!(fc.len(), 1);

        let poly = polygon_of(&fc.features[0]);
        // Collinear vertices removed: 4 corners + closing point
        assert_eq!(poly.exterior().0.len(), 5);
        assert!((poly.unsigned_area() - 6.0 * 100.0).abs() < 1e-9);
        assert!(poly.exterior().is_ccw(), "exterior must be counter-clockwise");

        let xs: Vec<f64> = poly.exterior().0.iter().map(|c| c.x).collect();
        let ys: Vec<f64> = poly.exterior().0.iter().map(|c| c.y).collect();
        assert_eq!(xs.iter().cloned().fold(f64::INFINITY, f64::min), 110.0);
        assert_eq!(xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 140.0);
        assert_eq!(ys.iter().cloned().fold(f64::INFINITY, f64::min), 170.0);
        assert_eq!(ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 190.0);

        assert_eq!(fc.features[0].get_property("pixel_count"), Some(&AttributeValue::Int(6)));
        assert_eq!(fc.features[0].get_property("area_px"), Some(&AttributeValue::Float(6.0)));
    }

    #[test]
    fn ring_with_hole() {
        let mut ones = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                if (r, c) != (1, 1) {
                    ones.push((r, c));
                }
            }
        }
        let fc = polygonize(&mask_from(3, 3, &ones), &all()).unwrap();
        assert_eq!(fc.len(), 1);

        let poly = polygon_of(&fc.features[0]);
        assert_eq!(poly.interiors().len(), 1);
        assert!(!poly.interiors()[0].is_ccw(), "holes must be clockwise");
        assert!((poly.unsigned_area() - 800.0).abs() < 1e-9);
        assert_eq!(fc.features[0].get_property("area_px"), Some(&AttributeValue::Float(8.0)));
    }

    #[test]
    fn diagonal_pixels_form_one_region() {
        let fc = polygonize(&mask_from(4, 4, &[(0, 0), (1, 1), (2, 2)]), &all()).unwrap();
        assert_eq!(fc.len(), 1, "8-connected diagonal chain is one polygon");
        let poly = polygon_of(&fc.features[0]);
        assert!((poly.unsigned_area() - 300.0).abs() < 1e-9);
        assert!(poly.interiors().is_empty());
    }

    #[test]
    fn separate_regions_in_scan_order() {
        let fc = polygonize(&mask_from(5, 5, &[(0, 4), (4, 0), (4, 1)]), &all()).unwrap();
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].get_property("pixel_count"), Some(&AttributeValue::Int(1)));
        assert_eq!(fc.features[1].get_property("pixel_count"), Some(&AttributeValue::Int(2)));
    }

    #[test]
    fn small_regions_are_dropped() {
        let mut ones: Vec<_> = (0..3).flat_map(|r| (0..3).map(move |c| (r, c))).collect();
        ones.push((6, 6));
        let fc = polygonize(&mask_from(8, 8, &ones), &PolygonizeParams { min_pixels: 5 }).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].get_property("pixel_count"), Some(&AttributeValue::Int(9)));
    }

    #[test]
    fn area_matches_pixel_count_on_irregular_shape() {
        let ones = [(0, 0), (0, 1), (1, 1), (2, 1), (2, 2), (3, 0), (3, 3), (1, 3)];
        let fc = polygonize(&mask_from(4, 4, &ones), &all()).unwrap();
        let total_px: i64 = fc
            .iter()
            .filter_map(|f| match f.get_property("pixel_count") {
                Some(AttributeValue::Int(n)) => Some(*n),
                _ => None,
            })
            .sum();
        let total_area: f64 = fc.iter().map(|f| polygon_of(f).unsigned_area()).sum();
        assert_eq!(total_px, ones.len() as i64);
        assert!((total_area - ones.len() as f64 * 100.0).abs() < 1e-9);
    }
}
