//! Pipeline error taxonomy

use floodscope_render::RenderError;
use thiserror::Error;

/// Fatal and recoverable failures of an analysis run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An input file could not be opened or holds no usable pixels
    #[error("input error: {context}")]
    Input {
        context: String,
        #[source]
        source: floodscope_core::Error,
    },

    /// A layer could not be brought onto the canonical grid.
    ///
    /// Recovered locally by substituting an all-zero mask.
    #[error("alignment error: {context}")]
    Alignment {
        context: String,
        #[source]
        source: floodscope_core::Error,
    },

    /// A numerical stage failed
    #[error("processing error: {context}")]
    Processing {
        context: String,
        #[source]
        source: floodscope_core::Error,
    },

    /// An artifact could not be written
    #[error("output error: {context}")]
    Output {
        context: String,
        #[source]
        source: RenderError,
    },

    /// Configuration rejected before any work started
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn input(context: impl Into<String>) -> impl FnOnce(floodscope_core::Error) -> Self {
        let context = context.into();
        move |source| Self::Input { context, source }
    }

    pub fn alignment(context: impl Into<String>) -> impl FnOnce(floodscope_core::Error) -> Self {
        let context = context.into();
        move |source| Self::Alignment { context, source }
    }

    pub fn processing(context: impl Into<String>) -> impl FnOnce(floodscope_core::Error) -> Self {
        let context = context.into();
        move |source| Self::Processing { context, source }
    }

    pub fn output<E: Into<RenderError>>(context: impl Into<String>) -> impl FnOnce(E) -> Self {
        let context = context.into();
        move |source| Self::Output {
            context,
            source: source.into(),
        }
    }
}

/// Error message followed by every source, joined with `": "`
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub type Result<T> = std::result::Result<T, PipelineError>;
