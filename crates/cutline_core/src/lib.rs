pub mod clip;
pub mod error;
pub mod journal;
pub mod layout;
pub mod links;
pub mod media;
pub mod placement;
pub mod settings;
pub mod track;
pub mod track_set;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{ClipId, MediaId, Placement, TrackType};
