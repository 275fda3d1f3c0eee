//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for pixel I/O and handles the GeoTIFF tags
//! directly: ModelPixelScale (33550), ModelTiepoint (33922),
//! ModelTransformation (34264), GeoKeyDirectory (34735) and GDAL_NODATA (42113).

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement, StorageType};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, Gray64Float, Gray8};
use tiff::encoder::{ImageEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Tag for a GeoTIFF code.
///
/// The `tiff` crate names the GeoTIFF and GDAL tags, so `Tag::Unknown(code)`
/// never matches a decoded directory entry.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Read the first band of a GeoTIFF file into a Raster.
///
/// Samples are cast to `T`; values that do not fit become `T::default_nodata()`.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>, samples: usize) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    // Interleaved buffers keep only the first sample of each pixel
    buf.into_iter()
        .step_by(samples.max(1))
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    if rows == 0 || cols == 0 {
        return Err(Error::EmptyInput("GeoTIFF has no pixels".into()));
    }

    let samples = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|v| v as usize)
        .unwrap_or(1);

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(buf, samples),
        DecodingResult::F64(buf) => cast_all(buf, samples),
        DecodingResult::U8(buf) => cast_all(buf, samples),
        DecodingResult::U16(buf) => cast_all(buf, samples),
        DecodingResult::U32(buf) => cast_all(buf, samples),
        DecodingResult::I8(buf) => cast_all(buf, samples),
        DecodingResult::I16(buf) => cast_all(buf, samples),
        DecodingResult::I32(buf) => cast_all(buf, samples),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));

    if let Some(nd) = read_nodata(&mut decoder) {
        raster.set_nodata(num_traits::cast::<f64, T>(nd));
    }

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, or ModelTransformation
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok();

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    // Row-major 4x4 matrix
    let t = decoder
        .get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION))
        .ok()?;
    if t.len() >= 16 {
        return Some(GeoTransform {
            origin_x: t[3],
            origin_y: t[7],
            pixel_width: t[0],
            pixel_height: t[5],
            row_rotation: t[1],
            col_rotation: t[4],
        });
    }

    None
}

/// EPSG code from ProjectedCSTypeGeoKey, falling back to GeographicTypeGeoKey
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u32_vec(geo_tag(GEO_KEY_DIRECTORY))
        .ok()?;
    parse_geokeys(&keys)
}

fn parse_geokeys(keys: &[u32]) -> Option<CRS> {
    // Header: [version, revision, minor, count], then 4 values per key
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut projected = None;
    let mut geographic = None;

    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key_id, location, value) = (entry[0] as u16, entry[1], entry[3]);
        // Only inline SHORT values carry EPSG codes
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match key_id {
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    projected.or(geographic).map(CRS::from_epsg)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .ok()?;
    let text = text.trim_end_matches('\0').trim();
    if text.eq_ignore_ascii_case("nan") {
        Some(f64::NAN)
    } else {
        text.parse::<f64>().ok()
    }
}

/// Write a Raster to a GeoTIFF file.
///
/// `u8` rasters are written as 8-bit samples, `f64` rasters as 64-bit float
/// so that epsilon gradients in a filled DEM survive, and everything else as
/// 32-bit float.
/// The CRS is recorded in the GeoKeyDirectory when it has an EPSG code.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, file)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    match T::storage() {
        StorageType::U8 => {
            let data: Vec<u8> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(0))
                .collect();
            let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
            write_geo_tags(&mut image, raster)?;
            image.write_data(&data)?;
        }
        StorageType::F32 => {
            let data: Vec<f32> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
                .collect();
            let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
            write_geo_tags(&mut image, raster)?;
            image.write_data(&data)?;
        }
        StorageType::F64 => {
            let data: Vec<f64> = raster
                .data()
                .iter()
                .map(|&v| v.to_f64().unwrap_or(f64::NAN))
                .collect();
            let mut image = encoder.new_image::<Gray64Float>(cols as u32, rows as u32)?;
            write_geo_tags(&mut image, raster)?;
            image.write_data(&data)?;
        }
    }

    Ok(())
}

fn write_geo_tags<W, C, K, T>(image: &mut ImageEncoder<'_, W, C, K>, raster: &Raster<T>) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
    C: tiff::encoder::colortype::ColorType,
    K: TiffKind,
    T: RasterElement,
{
    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = build_geokeys(raster.crs());
    image
        .encoder()
        .write_tag(geo_tag(GEO_KEY_DIRECTORY), geokeys.as_slice())?;

    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image
            .encoder()
            .write_tag(geo_tag(GDAL_NODATA), text.as_str())?;
    }

    Ok(())
}

/// GeoKeyDirectory: model type, PixelIsArea, and the EPSG code when known
fn build_geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).filter(|&code| code <= u16::MAX as u32);
    let geographic = crs.and_then(|c| c.is_geographic()).unwrap_or(false);

    let mut keys: Vec<[u16; 4]> = vec![
        [KEY_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }],
        [KEY_RASTER_TYPE, 0, 1, 1],
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            KEY_GEOGRAPHIC_TYPE
        } else {
            KEY_PROJECTED_CS_TYPE
        };
        keys.push([key, 0, 1, code as u16]);
    }

    let mut out = vec![1, 1, 0, keys.len() as u16];
    for k in keys {
        out.extend_from_slice(&k);
    }
    out
}
