//! Error types for rendering

use thiserror::Error;

/// Errors raised while drawing or writing a composite
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] floodscope_core::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("bounds sidecar: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid image buffer for {width}x{height}")]
    Buffer { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, RenderError>;
