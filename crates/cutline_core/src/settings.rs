use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output format of the render pipeline and the starting lane count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub sample_rate: u32,
    /// Lanes each track set starts with.
    pub initial_tracks: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        preset_1080p()
    }
}

impl RenderSettings {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Look up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "1080p" => Some(preset_1080p()),
            "1080p60" => Some(preset_1080p_60()),
            "720p" => Some(preset_720p()),
            "4k" => Some(preset_4k()),
            "shorts" => Some(preset_shorts()),
            _ => None,
        }
    }

    /// Duration of one frame.
    pub fn frame_duration(&self) -> std::time::Duration {
        if self.fps > 0.0 {
            std::time::Duration::from_secs_f64(1.0 / self.fps)
        } else {
            std::time::Duration::from_millis(40)
        }
    }
}

/// 1920x1080 30fps preset.
pub fn preset_1080p() -> RenderSettings {
    RenderSettings {
        width: 1920,
        height: 1080,
        fps: 30.0,
        sample_rate: 48000,
        initial_tracks: 1,
    }
}

/// 1080x1920 30fps (vertical/shorts) preset.
pub fn preset_shorts() -> RenderSettings {
    RenderSettings {
        width: 1080,
        height: 1920,
        ..preset_1080p()
    }
}

/// 1280x720 30fps preset.
pub fn preset_720p() -> RenderSettings {
    RenderSettings {
        width: 1280,
        height: 720,
        ..preset_1080p()
    }
}

/// 3840x2160 30fps (4K) preset.
pub fn preset_4k() -> RenderSettings {
    RenderSettings {
        width: 3840,
        height: 2160,
        ..preset_1080p()
    }
}

/// 1920x1080 60fps preset.
pub fn preset_1080p_60() -> RenderSettings {
    RenderSettings {
        fps: 60.0,
        ..preset_1080p()
    }
}
