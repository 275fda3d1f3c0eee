//! Class layers to RGBA composite, PNG and bounds sidecar.

use std::path::Path;

use floodscope_algorithms::vector::{collection_bounds, rasterize, reproject_features};
use floodscope_core::io::read_geojson;
use floodscope_core::vector::FeatureCollection;
use floodscope_core::{GeoTransform, Grid, CRS};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::scheme::{FloodClass, TRANSPARENT};

/// Parameters for composite rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// Longest side of the PNG in pixels.
    pub max_dimension: u32,
    /// Alpha of class pixels; the background is always transparent.
    pub opacity: u8,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            opacity: 180,
        }
    }
}

/// Geographic extent of a composite, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl MapBounds {
    /// Leaflet `[[south, west], [north, east]]` pair
    pub fn leaflet(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }
}

/// JSON written next to the PNG. Every field is `null` for an empty map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsSidecar {
    pub west: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub north: Option<f64>,
    pub bounds: Option<[[f64; 2]; 2]>,
}

impl From<Option<MapBounds>> for BoundsSidecar {
    fn from(b: Option<MapBounds>) -> Self {
        Self {
            west: b.map(|b| b.west),
            south: b.map(|b| b.south),
            east: b.map(|b| b.east),
            north: b.map(|b| b.north),
            bounds: b.map(|b| b.leaflet()),
        }
    }
}

/// The three class layers of one analysis
#[derive(Debug, Clone, Copy)]
pub struct ClassLayers<'a> {
    pub lost: &'a FeatureCollection,
    pub gained: &'a FeatureCollection,
    pub persistent: &'a FeatureCollection,
}

impl<'a> ClassLayers<'a> {
    fn layer(&self, class: FloodClass) -> &'a FeatureCollection {
        match class {
            FloodClass::Lost => self.lost,
            FloodClass::Gained => self.gained,
            FloodClass::Persistent => self.persistent,
        }
    }
}

/// An RGBA composite in row-major order
#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub bounds: Option<MapBounds>,
}

impl RenderedMap {
    fn empty() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: TRANSPARENT.to_vec(),
            bounds: None,
        }
    }

    /// RGBA of the pixel at (`row`, `col`)
    pub fn pixel(&self, row: u32, col: u32) -> Option<[u8; 4]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let i = ((row * self.width + col) * 4) as usize;
        Some([self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]])
    }
}

/// Pixel size of a composite covering `bounds`, longest side `max_dimension`
fn image_size(bounds: &MapBounds, max_dimension: u32) -> (u32, u32) {
    let w = bounds.east - bounds.west;
    let h = bounds.north - bounds.south;
    let max_dim = max_dimension.max(1) as f64;
    let scale = max_dim / w.max(h);
    let width = ((w * scale).round() as u32).clamp(1, max_dimension.max(1));
    let height = ((h * scale).round() as u32).clamp(1, max_dimension.max(1));
    (width, height)
}

/// Draw the three layers onto one transparent RGBA image.
///
/// Layers are brought to WGS84 first. The image covers the union of their
/// extents; when every layer is empty the result is a single transparent
/// pixel with no bounds.
pub fn render_layers(layers: &ClassLayers<'_>, params: &RenderParams) -> Result<RenderedMap> {
    let wgs84 = CRS::wgs84();
    let mut geographic = Vec::with_capacity(FloodClass::ALL.len());
    for &class in FloodClass::ALL {
        geographic.push((class, reproject_features(layers.layer(class), &wgs84)?));
    }

    let extent = geographic
        .iter()
        .filter_map(|(_, fc)| collection_bounds(fc))
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)));

    let Some((west, south, east, north)) = extent else {
        return Ok(RenderedMap::empty());
    };
    if !(east > west && north > south) {
        return Ok(RenderedMap::empty());
    }
    let bounds = MapBounds { west, south, east, north };

    let (width, height) = image_size(&bounds, params.max_dimension);
    let transform = GeoTransform::new(
        west,
        north,
        (east - west) / width as f64,
        -(north - south) / height as f64,
    );
    let grid = Grid::new(height as usize, width as usize, transform, Some(wgs84));

    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    for (class, fc) in &geographic {
        let mask = rasterize(fc.geometries(), &grid)?;
        let color = class.color().with_alpha(params.opacity);
        for (i, &v) in mask.data().iter().enumerate() {
            if v != 0 {
                rgba[i * 4..i * 4 + 4].copy_from_slice(&color);
            }
        }
    }

    Ok(RenderedMap {
        width,
        height,
        rgba,
        bounds: Some(bounds),
    })
}

/// Write the bounds sidecar JSON.
pub fn write_bounds_sidecar<P: AsRef<Path>>(bounds: Option<MapBounds>, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(&BoundsSidecar::from(bounds))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Render the layers to a PNG and write its bounds sidecar.
///
/// Returns the geographic bounds of the image, `None` for an empty map.
pub fn render_composite<P: AsRef<Path>, Q: AsRef<Path>>(
    layers: &ClassLayers<'_>,
    params: &RenderParams,
    png_path: P,
    bounds_path: Q,
) -> Result<Option<MapBounds>> {
    let map = render_layers(layers, params)?;
    let (width, height) = (map.width, map.height);
    let img = RgbaImage::from_raw(width, height, map.rgba)
        .ok_or(RenderError::Buffer { width, height })?;
    img.save_with_format(png_path, ImageFormat::Png)?;
    write_bounds_sidecar(map.bounds, bounds_path)?;
    Ok(map.bounds)
}

/// [`render_composite`] reading the three layers from GeoJSON files.
pub fn render_geojson_files(
    lost: &Path,
    gained: &Path,
    persistent: &Path,
    params: &RenderParams,
    png_path: &Path,
    bounds_path: &Path,
) -> Result<Option<MapBounds>> {
    let lost = read_geojson(lost)?;
    let gained = read_geojson(gained)?;
    let persistent = read_geojson(persistent)?;
    let layers = ClassLayers {
        lost: &lost,
        gained: &gained,
        persistent: &persistent,
    };
    render_composite(&layers, params, png_path, bounds_path)
}
