use cutline_core::track_set::ActiveClip;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Packed RGB24 pixels. An empty buffer means "nothing composed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn black(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self {
            width,
            height,
            data: vec![0u8; len].into(),
        }
    }

    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let len = width as usize * height as usize;
        let data: Vec<u8> = std::iter::repeat(rgb).take(len).flatten().collect();
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_black(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }
}

/// Interleaved f32 samples for one tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }
}

/// What the render consumer gets back for one track type and one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputBuffer {
    Video(VideoFrame),
    Audio(AudioBuffer),
}

impl OutputBuffer {
    pub fn as_video(&self) -> Option<&VideoFrame> {
        match self {
            Self::Video(frame) => Some(frame),
            Self::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioBuffer> {
        match self {
            Self::Audio(buffer) => Some(buffer),
            Self::Video(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Effects / compose stage
// ---------------------------------------------------------------------------

/// Decoding and composition live behind this trait. `clips` are ordered
/// lowest lane first.
pub trait EffectsStage: Send + Sync {
    /// Composite the active video clips. `None` means nothing was drawn and
    /// the caller substitutes a black frame.
    fn compose(&self, frame: i64, clips: &[ActiveClip], paused: bool) -> Option<VideoFrame>;

    /// Mix the active audio clips for one tick.
    fn mix(&self, frame: i64, clips: &[ActiveClip], paused: bool) -> AudioBuffer;
}

/// Draws nothing and mixes silence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStage;

impl EffectsStage for NullStage {
    fn compose(&self, _frame: i64, _clips: &[ActiveClip], _paused: bool) -> Option<VideoFrame> {
        None
    }

    fn mix(&self, _frame: i64, _clips: &[ActiveClip], _paused: bool) -> AudioBuffer {
        AudioBuffer::default()
    }
}

/// Headless stand-in for a real compositor: paints a flat colour keyed on
/// the topmost active lane and emits silence sized to one tick.
#[derive(Debug, Clone)]
pub struct PlaceholderStage {
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub fps: f64,
}

const LANE_COLOURS: [[u8; 3]; 4] = [[200, 60, 60], [60, 200, 60], [60, 60, 200], [200, 200, 60]];

impl EffectsStage for PlaceholderStage {
    fn compose(&self, _frame: i64, clips: &[ActiveClip], _paused: bool) -> Option<VideoFrame> {
        let top = clips.last()?;
        let rgb = LANE_COLOURS[top.track % LANE_COLOURS.len()];
        Some(VideoFrame::solid(self.width, self.height, rgb))
    }

    fn mix(&self, _frame: i64, _clips: &[ActiveClip], paused: bool) -> AudioBuffer {
        if paused || self.fps <= 0.0 {
            return AudioBuffer::silence(self.sample_rate, 2, 0);
        }
        let per_tick = (self.sample_rate as f64 / self.fps).round() as usize;
        AudioBuffer::silence(self.sample_rate, 2, per_tick)
    }
}
