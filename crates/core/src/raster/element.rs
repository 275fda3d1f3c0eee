//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// On-disk sample layout used when a raster of this type is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// 8-bit unsigned integer (binary masks, direction codes)
    U8,
    /// 32-bit IEEE float (small integer rasters, `f32` indices)
    F32,
    /// 64-bit IEEE float (elevation, accumulation)
    F64,
}

/// Trait for types that can be stored in a raster cell.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Sample layout used by the GeoTIFF writer
    fn storage() -> StorageType;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $storage:expr) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn is_float() -> bool {
                false
            }

            fn storage() -> StorageType {
                $storage
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $storage:expr) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }

            fn storage() -> StorageType {
                $storage
            }
        }
    };
}

impl_raster_element_int!(u8, StorageType::U8);
impl_raster_element_int!(i16, StorageType::F32);
impl_raster_element_int!(u16, StorageType::F32);
impl_raster_element_int!(i32, StorageType::F64);
impl_raster_element_int!(u32, StorageType::F64);
impl_raster_element_float!(f32, StorageType::F32);
impl_raster_element_float!(f64, StorageType::F64);
