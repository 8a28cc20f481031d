use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timeline identity of a clip. Distinct from the identity of its media.
pub type ClipId = Uuid;

/// Catalog identity of a source media item.
pub type MediaId = Uuid;

// ---------------------------------------------------------------------------
// TrackType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrackType {
    Video,
    Audio,
}

impl TrackType {
    pub const ALL: [TrackType; 2] = [TrackType::Video, TrackType::Audio];

    /// Slot of this type in per-type arrays.
    pub fn index(self) -> usize {
        match self {
            TrackType::Video => 0,
            TrackType::Audio => 1,
        }
    }

    /// Inverse of [`TrackType::index`], used by the persisted layout.
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(TrackType::Video),
            1 => Some(TrackType::Audio),
            _ => None,
        }
    }

    /// The type a linked partner clip lives on.
    pub fn other(self) -> Self {
        match self {
            TrackType::Video => TrackType::Audio,
            TrackType::Audio => TrackType::Video,
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
        }
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// A `(track, time)` pair. Time is a whole frame on the timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Placement {
    pub track: usize,
    pub time: i64,
}

impl Placement {
    pub fn new(track: usize, time: i64) -> Self {
        Self { track, time }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {} @ frame {}", self.track, self.time)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
