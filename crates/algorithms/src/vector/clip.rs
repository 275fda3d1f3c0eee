//! Clipping polygons to a raster extent
//!
//! Sutherland-Hodgman against an axis-aligned rectangle, applied to the
//! exterior and every interior ring. Only areal geometries survive: points
//! and lines cannot cover a pixel centre and are dropped.

use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};

/// A clipping rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ClipRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// From a `(min_x, min_y, max_x, max_y)` bounds tuple
    pub fn from_bounds(bounds: (f64, f64, f64, f64)) -> Self {
        Self::new(bounds.0, bounds.1, bounds.2, bounds.3)
    }

    fn intersects_ring(&self, ring: &[Coord<f64>]) -> bool {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in ring {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        min_x <= self.max_x && max_x >= self.min_x && min_y <= self.max_y && max_y >= self.min_y
    }
}

/// Edge of the clipping rectangle
#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn is_inside(&self, p: &Coord<f64>, rect: &ClipRect) -> bool {
        match self {
            Edge::Left => p.x >= rect.min_x,
            Edge::Right => p.x <= rect.max_x,
            Edge::Bottom => p.y >= rect.min_y,
            Edge::Top => p.y <= rect.max_y,
        }
    }

    fn intersect(&self, p: &Coord<f64>, q: &Coord<f64>, rect: &ClipRect) -> Coord<f64> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;

        match self {
            Edge::Left => {
                let t = (rect.min_x - p.x) / dx;
                Coord { x: rect.min_x, y: p.y + t * dy }
            }
            Edge::Right => {
                let t = (rect.max_x - p.x) / dx;
                Coord { x: rect.max_x, y: p.y + t * dy }
            }
            Edge::Bottom => {
                let t = (rect.min_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.min_y }
            }
            Edge::Top => {
                let t = (rect.max_y - p.y) / dy;
                Coord { x: p.x + t * dx, y: rect.max_y }
            }
        }
    }
}

/// Clip a ring against one edge (Sutherland-Hodgman step)
fn clip_ring_edge(vertices: &[Coord<f64>], edge: Edge, rect: &ClipRect) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let mut output = Vec::with_capacity(n + 4);

    for i in 0..n {
        let current = &vertices[i];
        let next = &vertices[(i + 1) % n];

        match (edge.is_inside(current, rect), edge.is_inside(next, rect)) {
            (true, true) => output.push(*next),
            (true, false) => output.push(edge.intersect(current, next, rect)),
            (false, true) => {
                output.push(edge.intersect(current, next, rect));
                output.push(*next);
            }
            (false, false) => {}
        }
    }

    output
}

/// Clip a closed ring; `None` when nothing with area is left
fn clip_ring(ring: &LineString<f64>, rect: &ClipRect) -> Option<LineString<f64>> {
    let mut vertices: Vec<Coord<f64>> = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    if vertices.len() < 3 || !rect.intersects_ring(&vertices) {
        return None;
    }

    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        vertices = clip_ring_edge(&vertices, edge, rect);
        if vertices.len() < 3 {
            return None;
        }
    }

    vertices.push(vertices[0]);
    Some(LineString::new(vertices))
}

/// Clip a polygon and its holes; `None` if it lies completely outside
pub fn clip_polygon(poly: &Polygon<f64>, rect: &ClipRect) -> Option<Polygon<f64>> {
    let exterior = clip_ring(poly.exterior(), rect)?;
    let interiors = poly
        .interiors()
        .iter()
        .filter_map(|hole| clip_ring(hole, rect))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

/// Clip the areal parts of a geometry to a rectangle.
///
/// Polygons, multipolygons and collections of them are clipped part by
/// part. Returns `None` when no area remains inside `rect`.
pub fn clip_to_rect(geom: &Geometry<f64>, rect: &ClipRect) -> Option<MultiPolygon<f64>> {
    let mut parts = Vec::new();
    collect_clipped(geom, rect, &mut parts);
    if parts.is_empty() {
        None
    } else {
        Some(MultiPolygon::new(parts))
    }
}

fn collect_clipped(geom: &Geometry<f64>, rect: &ClipRect, out: &mut Vec<Polygon<f64>>) {
    match geom {
        Geometry::Polygon(p) => out.extend(clip_polygon(p, rect)),
        Geometry::MultiPolygon(mp) => {
            out.extend(mp.0.iter().filter_map(|p| clip_polygon(p, rect)))
        }
        Geometry::Rect(r) => out.extend(clip_polygon(&r.to_polygon(), rect)),
        Geometry::Triangle(t) => out.extend(clip_polygon(&t.to_polygon(), rect)),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_clipped(g, rect, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Point};

    fn unit_rect() -> ClipRect {
        ClipRect::new(0.0, 0.0, 10.0, 10.0)
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]
    }

    #[test]
    fn test_clip_polygon_fully_inside() {
        let poly = Geometry::Polygon(square(2.0, 2.0, 8.0, 8.0));
        let clipped = clip_to_rect(&poly, &unit_rect()).unwrap();
        assert!((clipped.unsigned_area() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_polygon_partial() {
        let poly = Geometry::Polygon(square(-5.0, -5.0, 5.0, 5.0));
        let clipped = clip_to_rect(&poly, &unit_rect()).unwrap();

        assert!((clipped.unsigned_area() - 25.0).abs() < 1e-9);
        for coord in clipped.0[0].exterior().0.iter() {
            assert!(
                coord.x >= -0.001 && coord.x <= 10.001 && coord.y >= -0.001 && coord.y <= 10.001,
                "Clipped coord ({}, {}) outside rect",
                coord.x,
                coord.y
            );
        }
    }

    #[test]
    fn test_clip_polygon_fully_outside() {
        let poly = Geometry::Polygon(square(20.0, 20.0, 30.0, 30.0));
        assert!(clip_to_rect(&poly, &unit_rect()).is_none());
    }

    #[test]
    fn test_clip_keeps_holes() {
        let poly = Polygon::new(
            square(-5.0, -5.0, 15.0, 15.0).exterior().clone(),
            vec![square(4.0, 4.0, 6.0, 6.0).exterior().clone()],
        );
        let clipped = clip_polygon(&poly, &unit_rect()).unwrap();
        assert_eq!(clipped.interiors().len(), 1);
        assert!((clipped.unsigned_area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_multipolygon_drops_outside_parts() {
        let mp = Geometry::MultiPolygon(MultiPolygon::new(vec![
            square(1.0, 1.0, 2.0, 2.0),
            square(50.0, 50.0, 60.0, 60.0),
        ]));
        let clipped = clip_to_rect(&mp, &unit_rect()).unwrap();
        assert_eq!(clipped.0.len(), 1);
    }

    #[test]
    fn test_points_have_no_area() {
        let point = Geometry::Point(Point::new(5.0, 5.0));
        assert!(clip_to_rect(&point, &unit_rect()).is_none());
    }
}
