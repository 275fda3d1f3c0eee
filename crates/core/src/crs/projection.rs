//! Pure-Rust coordinate transforms.
//!
//! WGS84, Web Mercator and UTM are evaluated in closed form. UTM uses the
//! Snyder (1987) series (USGS Prof. Paper 1395, pp. 61-64), accurate to well
//! under a metre inside a zone. Every other EPSG code or PROJ string goes
//! through `proj4rs`, with EPSG definitions from `crs-definitions`.
//! Coordinates are always handled in x/y order (longitude before latitude for
//! geographic CRSs).

use std::sync::Arc;

use proj4rs::proj::Proj;

use super::CRS;
use crate::error::{Error, Result};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude limit of the Web Mercator square
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

const WGS84_LONGLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// A CRS evaluated by `proj4rs`, paired with WGS84 lon/lat as the pivot.
pub struct Proj4 {
    definition: String,
    proj: Proj,
    lonlat: Proj,
    geographic: bool,
}

impl Proj4 {
    fn new(crs: &CRS, definition: &str) -> Result<Self> {
        // `+type=crs` is a PROJ 6 marker the PROJ.4 grammar does not know
        let definition = definition.replace("+type=crs", "");
        let definition = definition.trim();
        let parse = |def: &str| {
            Proj::from_proj_string(def)
                .map_err(|e| Error::UnsupportedCrs(format!("{}: {}", crs.identifier(), e)))
        };
        Ok(Self {
            definition: definition.to_string(),
            proj: parse(definition)?,
            lonlat: parse(WGS84_LONGLAT)?,
            geographic: definition.contains("+proj=longlat") || definition.contains("+proj=latlong"),
        })
    }

    fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        let mut pt = if self.geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        match proj4rs::transform::transform(&self.proj, &self.lonlat, &mut pt) {
            Ok(()) => (pt.0.to_degrees(), pt.1.to_degrees()),
            Err(_) => (f64::NAN, f64::NAN),
        }
    }

    fn from_lonlat(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut pt = (lon.to_radians(), lat.to_radians(), 0.0);
        match proj4rs::transform::transform(&self.lonlat, &self.proj, &mut pt) {
            Ok(()) if self.geographic => (pt.0.to_degrees(), pt.1.to_degrees()),
            Ok(()) => (pt.0, pt.1),
            Err(_) => (f64::NAN, f64::NAN),
        }
    }
}

impl std::fmt::Debug for Proj4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proj4").field("definition", &self.definition).finish()
    }
}

/// A projection the engine can evaluate.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Longitude/latitude degrees on WGS84 (EPSG:4326)
    Geographic,
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM on WGS84 (EPSG:326xx north, 327xx south)
    Utm { zone: u32, north: bool },
    /// Any other CRS with a PROJ.4 definition
    Proj4(Arc<Proj4>),
}

impl Projection {
    /// Resolve a CRS into a projection.
    ///
    /// # Errors
    /// [`Error::UnsupportedCrs`] when the CRS has neither a known EPSG code
    /// nor a PROJ string that `proj4rs` can parse.
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        match crs.epsg() {
            Some(4326) => Ok(Projection::Geographic),
            Some(3857 | 900913) => Ok(Projection::WebMercator),
            Some(epsg @ 32601..=32660) => Ok(Projection::Utm {
                zone: epsg - 32600,
                north: true,
            }),
            Some(epsg @ 32701..=32760) => Ok(Projection::Utm {
                zone: epsg - 32700,
                north: false,
            }),
            Some(epsg) => {
                let def = u16::try_from(epsg)
                    .ok()
                    .and_then(crs_definitions::from_code)
                    .ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))?;
                Ok(Projection::Proj4(Arc::new(Proj4::new(crs, def.proj4)?)))
            }
            None => {
                let def = crs
                    .proj()
                    .filter(|p| p.contains("+proj="))
                    .ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))?;
                Ok(Projection::Proj4(Arc::new(Proj4::new(crs, def)?)))
            }
        }
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            Projection::Geographic => true,
            Projection::Proj4(p) => p.geographic,
            _ => false,
        }
    }

    /// Projected (x, y) → (lon, lat) in degrees.
    ///
    /// Non-finite when the point is outside the projection's domain.
    pub fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Proj4(p) => p.to_lonlat(x, y),
            Projection::Geographic => (x, y),
            Projection::WebMercator => {
                let lon = (x / A).to_degrees();
                let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
                (lon, lat)
            }
            Projection::Utm { zone, north } => utm_to_wgs84(x, y, *zone, *north),
        }
    }

    /// (lon, lat) in degrees → projected (x, y)
    pub fn from_lonlat(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Proj4(p) => p.from_lonlat(lon, lat),
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => {
                let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
                let x = A * lon.to_radians();
                let y = A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
            Projection::Utm { zone, north } => wgs84_to_utm(lon, lat, *zone, *north),
        }
    }
}

/// Point transformer between two CRSs.
#[derive(Debug, Clone)]
pub struct Transformer {
    from: Projection,
    to: Projection,
    identity: bool,
}

impl Transformer {
    /// Build a transformer.
    ///
    /// Equivalent CRSs give an identity transformer without resolving either
    /// side, so any pair of matching CRSs is accepted.
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        if from.is_equivalent(to) {
            return Ok(Self {
                from: Projection::Geographic,
                to: Projection::Geographic,
                identity: true,
            });
        }
        Ok(Self {
            from: Projection::from_crs(from)?,
            to: Projection::from_crs(to)?,
            identity: false,
        })
    }

    /// Whether source and target are the same CRS
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform a single coordinate pair
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        if self.is_identity() {
            return (x, y);
        }
        let (lon, lat) = self.from.to_lonlat(x, y);
        self.to.from_lonlat(lon, lat)
    }

    /// Transform a bounding box `(min_x, min_y, max_x, max_y)`.
    ///
    /// Each edge is densified with `densify` intermediate points before
    /// taking the envelope, so curved edges in the target CRS are covered.
    pub fn transform_bounds(
        &self,
        bounds: (f64, f64, f64, f64),
        densify: usize,
    ) -> (f64, f64, f64, f64) {
        if self.is_identity() {
            return bounds;
        }

        let (x0, y0, x1, y1) = bounds;
        let steps = densify + 1;
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            for (px, py) in [(x, y0), (x, y1), (x0, y), (x1, y)] {
                let (tx, ty) = self.transform(px, py);
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
        }

        (min_x, min_y, max_x, max_y)
    }
}

/// EPSG code of the UTM zone containing a WGS84 point
pub fn utm_epsg_for_lonlat(lon: f64, lat: f64) -> u32 {
    let zone = (((lon + 180.0) / 6.0).floor() as i64).clamp(0, 59) as u32 + 1;
    if lat >= 0.0 {
        32600 + zone
    } else {
        32700 + zone
    }
}

// ── Core projection (Snyder 1987) ────────────────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// WGS84 (lon, lat) degrees → UTM (easting, northing) metres.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// UTM (easting, northing) metres → WGS84 (lon, lat) degrees.
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    // Footpoint latitude (Snyder eq. 3-26)
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    // Snyder eq. 8-17
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    // Snyder eq. 8-18
    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians), Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
