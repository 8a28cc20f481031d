use cutline_render::error::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("playback task has exited")]
    Closed,

    #[error("playback task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, PreviewError>;
