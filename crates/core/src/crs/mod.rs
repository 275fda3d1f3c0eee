//! Coordinate Reference System handling

mod projection;

pub use projection::{utm_epsg_for_lonlat, Proj4, Projection, Transformer};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Parse an authority identifier.
    ///
    /// Accepts `EPSG:32637`, `epsg:4326`, the GeoJSON 2008 URNs
    /// `urn:ogc:def:crs:EPSG::32637` / `urn:ogc:def:crs:OGC:1.3:CRS84`,
    /// and bare integer codes. Anything else is kept as a PROJ string.
    pub fn from_identifier(id: &str) -> Self {
        let trimmed = id.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Self::wgs84();
        }
        if let Some(code) = upper
            .rsplit(':')
            .next()
            .filter(|_| upper.contains("EPSG"))
            .and_then(|c| c.parse::<u32>().ok())
        {
            return Self::from_epsg(code);
        }
        if let Ok(code) = trimmed.parse::<u32>() {
            return Self::from_epsg(code);
        }
        Self::from_proj(trimmed)
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Whether coordinates are longitude/latitude degrees.
    ///
    /// `None` when the CRS is not one the projection engine understands.
    pub fn is_geographic(&self) -> Option<bool> {
        Projection::from_crs(self).ok().map(|p| p.is_geographic())
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // WKT comparison is textual and therefore conservative
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }

    /// GeoJSON 2008 named-CRS URN (`urn:ogc:def:crs:EPSG::<code>`)
    pub fn urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32637);
        assert_eq!(crs.epsg(), Some(32637));
        assert_eq!(crs.identifier(), "EPSG:32637");
        assert_eq!(crs.urn().as_deref(), Some("urn:ogc:def:crs:EPSG::32637"));
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::web_mercator()));
    }

    #[test]
    fn test_from_identifier_variants() {
        assert_eq!(CRS::from_identifier("EPSG:3857").epsg(), Some(3857));
        assert_eq!(CRS::from_identifier("epsg:32637").epsg(), Some(32637));
        assert_eq!(
            CRS::from_identifier("urn:ogc:def:crs:EPSG::32721").epsg(),
            Some(32721)
        );
        assert_eq!(
            CRS::from_identifier("urn:ogc:def:crs:OGC:1.3:CRS84").epsg(),
            Some(4326)
        );
        assert_eq!(CRS::from_identifier("4326").epsg(), Some(4326));
        assert_eq!(CRS::from_identifier("+proj=longlat").epsg(), None);
    }

    #[test]
    fn test_is_geographic() {
        assert_eq!(CRS::wgs84().is_geographic(), Some(true));
        assert_eq!(CRS::from_epsg(32637).is_geographic(), Some(false));
        assert_eq!(CRS::web_mercator().is_geographic(), Some(false));
        assert_eq!(CRS::from_epsg(2154).is_geographic(), Some(false));
        assert_eq!(CRS::from_epsg(4258).is_geographic(), Some(true));
        assert_eq!(CRS::from_wkt("LOCAL_CS[]").is_geographic(), None);
    }
}
