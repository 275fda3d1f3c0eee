//! GeoJSON reading and writing
//!
//! Serde models for the subset of GeoJSON the pipeline exchanges, plus the
//! legacy named `crs` member so projected layers survive a round trip.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// `[x, y]` or `[x, y, z]`; extra ordinates are ignored
type Position = Vec<f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Point {
        coordinates: Position,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonFeature {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<serde_json::Value>,
    geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    properties: Option<BTreeMap<String, AttributeValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedCrsProperties {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedCrs {
    #[serde(rename = "type")]
    type_: String,
    properties: NamedCrsProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonFeatureCollection {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<NamedCrs>,
    features: Vec<GeoJsonFeature>,
}

/// Top-level documents accepted by the reader
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum GeoJsonDocument {
    Collection(GeoJsonFeatureCollection),
    Geometry(GeoJsonGeometry),
    Feature(GeoJsonFeature),
}

/// Read a GeoJSON file (FeatureCollection, Feature or bare geometry).
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_geojson(&text)
}

/// Parse GeoJSON text into a [`FeatureCollection`].
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let doc: GeoJsonDocument = serde_json::from_str(text)?;

    match doc {
        GeoJsonDocument::Collection(fc) => {
            if fc.type_ != "FeatureCollection" {
                return Err(Error::GeoJson(format!("unexpected type '{}'", fc.type_)));
            }
            let crs = fc.crs.map(|c| CRS::from_identifier(&c.properties.name));
            let features = fc
                .features
                .into_iter()
                .map(feature_from_json)
                .collect::<Result<Vec<_>>>()?;
            Ok(FeatureCollection { features, crs })
        }
        GeoJsonDocument::Feature(f) => {
            if f.type_ != "Feature" {
                return Err(Error::GeoJson(format!("unexpected type '{}'", f.type_)));
            }
            Ok(FeatureCollection {
                features: vec![feature_from_json(f)?],
                crs: None,
            })
        }
        GeoJsonDocument::Geometry(g) => Ok(FeatureCollection {
            features: vec![Feature::new(geometry_from_json(g)?)],
            crs: None,
        }),
    }
}

/// Write a [`FeatureCollection`] as GeoJSON.
///
/// A named `crs` member is written for any CRS other than WGS84.
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let text = to_geojson_string(collection)?;
    fs::write(path.as_ref(), text)?;
    Ok(())
}

/// Serialize a [`FeatureCollection`] to a GeoJSON string.
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    let crs = match &collection.crs {
        Some(crs) if crs.epsg() != Some(4326) => Some(NamedCrs {
            type_: "name".to_string(),
            properties: NamedCrsProperties {
                name: crs.urn().unwrap_or_else(|| crs.identifier()),
            },
        }),
        _ => None,
    };

    let doc = GeoJsonFeatureCollection {
        type_: "FeatureCollection".to_string(),
        crs,
        features: collection.features.iter().map(feature_to_json).collect(),
    };

    Ok(serde_json::to_string(&doc)?)
}

fn feature_from_json(f: GeoJsonFeature) -> Result<Feature> {
    let geometry = f.geometry.map(geometry_from_json).transpose()?;
    let id = f.id.map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });
    Ok(Feature {
        geometry,
        properties: f.properties.unwrap_or_default(),
        id,
    })
}

fn feature_to_json(f: &Feature) -> GeoJsonFeature {
    GeoJsonFeature {
        type_: "Feature".to_string(),
        id: f.id.clone().map(serde_json::Value::String),
        geometry: f.geometry.as_ref().and_then(geometry_to_json),
        properties: Some(f.properties.clone()),
    }
}

fn coord(p: &Position) -> Result<Coord<f64>> {
    match p.as_slice() {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::GeoJson(format!(
            "position needs at least 2 ordinates, got {}",
            p.len()
        ))),
    }
}

fn line(ps: &[Position]) -> Result<LineString<f64>> {
    Ok(LineString::new(ps.iter().map(coord).collect::<Result<_>>()?))
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter();
    let exterior = match rings.next() {
        Some(r) => line(r)?,
        None => LineString::new(vec![]),
    };
    let interiors = rings.map(|r| line(r)).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn geometry_from_json(g: GeoJsonGeometry) -> Result<Geometry<f64>> {
    Ok(match g {
        GeoJsonGeometry::Point { coordinates } => Geometry::Point(Point(coord(&coordinates)?)),
        GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
            coordinates
                .iter()
                .map(|p| coord(p).map(Point))
                .collect::<Result<_>>()?,
        )),
        GeoJsonGeometry::LineString { coordinates } => Geometry::LineString(line(&coordinates)?),
        GeoJsonGeometry::MultiLineString { coordinates } => {
            Geometry::MultiLineString(MultiLineString::new(
                coordinates.iter().map(|l| line(l)).collect::<Result<_>>()?,
            ))
        }
        GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(polygon(&coordinates)?),
        GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon::new(
            coordinates.iter().map(|p| polygon(p)).collect::<Result<_>>()?,
        )),
        GeoJsonGeometry::GeometryCollection { geometries } => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                geometries
                    .into_iter()
                    .map(geometry_from_json)
                    .collect::<Result<_>>()?,
            ))
        }
    })
}

fn pos(c: &Coord<f64>) -> Position {
    vec![c.x, c.y]
}

fn ring(l: &LineString<f64>) -> Vec<Position> {
    l.0.iter().map(pos).collect()
}

fn polygon_rings(p: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(ring)
        .collect()
}

fn geometry_to_json(g: &Geometry<f64>) -> Option<GeoJsonGeometry> {
    Some(match g {
        Geometry::Point(p) => GeoJsonGeometry::Point {
            coordinates: pos(&p.0),
        },
        Geometry::MultiPoint(mp) => GeoJsonGeometry::MultiPoint {
            coordinates: mp.0.iter().map(|p| pos(&p.0)).collect(),
        },
        Geometry::Line(l) => GeoJsonGeometry::LineString {
            coordinates: vec![pos(&l.start), pos(&l.end)],
        },
        Geometry::LineString(l) => GeoJsonGeometry::LineString {
            coordinates: ring(l),
        },
        Geometry::MultiLineString(ml) => GeoJsonGeometry::MultiLineString {
            coordinates: ml.0.iter().map(ring).collect(),
        },
        Geometry::Polygon(p) => GeoJsonGeometry::Polygon {
            coordinates: polygon_rings(p),
        },
        Geometry::MultiPolygon(mp) => GeoJsonGeometry::MultiPolygon {
            coordinates: mp.0.iter().map(polygon_rings).collect(),
        },
        Geometry::Rect(r) => GeoJsonGeometry::Polygon {
            coordinates: polygon_rings(&r.to_polygon()),
        },
        Geometry::Triangle(t) => GeoJsonGeometry::Polygon {
            coordinates: polygon_rings(&t.to_polygon()),
        },
        Geometry::GeometryCollection(gc) => GeoJsonGeometry::GeometryCollection {
            geometries: gc.0.iter().filter_map(geometry_to_json).collect(),
        },
    })
}
