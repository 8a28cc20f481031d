pub mod error;
pub mod events;
pub mod output;
pub mod workflow;

pub use error::{RenderError, Result};
pub use events::{EventBus, FrameChangedReason, WorkflowEvent};
pub use output::{AudioBuffer, EffectsStage, OutputBuffer, VideoFrame};
pub use workflow::{DroppedClips, LoadSummary, MoveOrigin, Workflow};
