use cutline_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid render dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("render not started")]
    NotRendering,

    #[error("media {0} has neither audio nor video streams")]
    NoStreams(uuid::Uuid),
}

pub type Result<T> = std::result::Result<T, RenderError>;
