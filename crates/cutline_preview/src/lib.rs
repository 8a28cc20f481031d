pub mod driver;
pub mod error;

pub use driver::{FrameSink, PlaybackCommand, PlaybackDriver, PlaybackState, PlaybackSummary, Presented};
pub use error::{PreviewError, Result};
