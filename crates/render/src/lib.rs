//! # FloodScope Render
//!
//! Static PNG composites of the three water classes (lost, gained,
//! persistent) plus a JSON sidecar with the image's geographic bounds, so
//! a web map can place the PNG as an image overlay.
//!
//! ## Usage
//!
//! ```ignore
//! use floodscope_render::{render_composite, ClassLayers, RenderParams};
//!
//! let layers = ClassLayers { lost: &lost, gained: &gained, persistent: &persistent };
//! let bounds = render_composite(&layers, &RenderParams::default(), "map.png", "map_bounds.json")?;
//! ```

mod error;
mod render;
mod scheme;

pub use error::{RenderError, Result};
pub use render::{
    render_composite, render_geojson_files, render_layers, write_bounds_sidecar, BoundsSidecar,
    ClassLayers, MapBounds, RenderParams, RenderedMap,
};
pub use scheme::{FloodClass, Rgb, AMBER, BLUE, PURPLE, TRANSPARENT};
