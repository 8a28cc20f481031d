use crate::error::{CoreError, Result};
use crate::types::ClipId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A clip as it sits on a lane: `[start, start + length)` in timeline frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlacedClip {
    pub clip_id: ClipId,
    pub start: i64,
    pub length: i64,
}

impl PlacedClip {
    pub fn end(&self) -> i64 {
        self.start + self.length
    }

    pub fn contains(&self, frame: i64) -> bool {
        frame >= self.start && frame < self.end()
    }

    /// Closed-open intersection; touching intervals do not overlap.
    pub fn overlaps(&self, start: i64, length: i64) -> bool {
        self.start < start + length && start < self.end()
    }
}

/// One lane of one track type. Entries are kept sorted by start frame and
/// never overlap.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Track {
    entries: Vec<PlacedClip>,
    muted: bool,
    muted_clips: HashSet<ClipId>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[PlacedClip] {
        &self.entries
    }

    pub fn get(&self, clip_id: ClipId) -> Option<&PlacedClip> {
        self.entries.iter().find(|e| e.clip_id == clip_id)
    }

    /// Frame just past the last clip, or 0 for an empty lane.
    pub fn end(&self) -> i64 {
        self.entries.last().map(PlacedClip::end).unwrap_or(0)
    }

    /// Entries intersecting `[start, start + length)`, ignoring `exclude`.
    pub fn collisions(
        &self,
        start: i64,
        length: i64,
        exclude: Option<ClipId>,
    ) -> impl Iterator<Item = &PlacedClip> {
        self.entries
            .iter()
            .filter(move |e| Some(e.clip_id) != exclude && e.overlaps(start, length))
    }

    pub fn is_free(&self, start: i64, length: i64, exclude: Option<ClipId>) -> bool {
        self.collisions(start, length, exclude).next().is_none()
    }

    /// The entry covering `frame`, if any.
    pub fn clip_at(&self, frame: i64) -> Option<&PlacedClip> {
        let idx = self.entries.partition_point(|e| e.start <= frame);
        idx.checked_sub(1)
            .map(|i| &self.entries[i])
            .filter(|e| e.contains(frame))
    }

    /// Authoritative insert: refuses any write that would overlap.
    pub(crate) fn insert(&mut self, track: usize, entry: PlacedClip) -> Result<()> {
        if !self.is_free(entry.start, entry.length, Some(entry.clip_id)) {
            return Err(CoreError::Overlap {
                track,
                start: entry.start,
            });
        }
        self.entries.retain(|e| e.clip_id != entry.clip_id);
        let idx = self.entries.partition_point(|e| e.start < entry.start);
        self.entries.insert(idx, entry);
        Ok(())
    }

    pub(crate) fn remove(&mut self, clip_id: ClipId) -> Option<PlacedClip> {
        let pos = self.entries.iter().position(|e| e.clip_id == clip_id)?;
        self.muted_clips.remove(&clip_id);
        Some(self.entries.remove(pos))
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_clip_muted(&self, clip_id: ClipId) -> bool {
        self.muted_clips.contains(&clip_id)
    }

    pub(crate) fn set_clip_muted(&mut self, clip_id: ClipId, muted: bool) -> bool {
        if self.get(clip_id).is_none() {
            return false;
        }
        if muted {
            self.muted_clips.insert(clip_id);
        } else {
            self.muted_clips.remove(&clip_id);
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
