use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(uuid::Uuid),

    #[error("Clip already on the timeline: {0}")]
    DuplicateClip(uuid::Uuid),

    #[error("Media not found: {0}")]
    MediaNotFound(uuid::Uuid),

    #[error("Track {track} out of range (track set has {count} tracks)")]
    TrackOutOfRange { track: usize, count: usize },

    #[error("Overlap detected on track {track} at frame {start}")]
    Overlap { track: usize, start: i64 },

    #[error("Invalid timeline position: {0}")]
    InvalidPosition(i64),

    #[error("Invalid clip boundaries: begin {begin} must be before end {end}")]
    InvalidBoundaries { begin: i64, end: i64 },

    #[error("Split point {at} must be strictly between {begin} and {end}")]
    InvalidSplit { at: i64, begin: i64, end: i64 },

    #[error("No legal placement found")]
    PlacementInfeasible,

    #[error("Invalid timeline layout: {0}")]
    InvalidLayout(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
