use crate::clip::Clip;
use crate::error::{CoreError, Result};
use crate::track::{PlacedClip, Track};
use crate::types::{ClipId, MediaId, TrackType};
use std::collections::HashMap;

/// A clip that is audible/visible at a given timeline frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveClip {
    pub clip_id: ClipId,
    pub media_id: MediaId,
    pub track: usize,
    /// Frame inside the source media to present.
    pub source_frame: i64,
}

/// Every lane of one track type, plus the clip arena backing them.
///
/// Lanes store clip ids; the clips themselves live in `clips`. After each
/// structural change the set keeps exactly one empty lane on top (unless
/// it only has a single lane).
#[derive(Debug, Clone)]
pub struct TrackSet {
    track_type: TrackType,
    initial_tracks: usize,
    tracks: Vec<Track>,
    clips: HashMap<ClipId, Clip>,
}

impl TrackSet {
    pub fn new(track_type: TrackType, initial_tracks: usize) -> Self {
        let initial_tracks = initial_tracks.max(1);
        Self {
            track_type,
            initial_tracks,
            tracks: (0..initial_tracks).map(|_| Track::new()).collect(),
            clips: HashMap::new(),
        }
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track: usize) -> Option<&Track> {
        self.tracks.get(track)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn get(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.get(&clip_id)
    }

    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.clips.contains_key(&clip_id)
    }

    /// Start frame of a clip on the given lane.
    pub fn position(&self, clip_id: ClipId, track: usize) -> Option<i64> {
        self.tracks.get(track)?.get(clip_id).map(|e| e.start)
    }

    /// The lane currently holding `clip_id`.
    pub fn track_of(&self, clip_id: ClipId) -> Option<usize> {
        self.tracks.iter().position(|t| t.get(clip_id).is_some())
    }

    /// Clip occupying `time` on `track`.
    pub fn clip_at(&self, track: usize, time: i64) -> Option<&Clip> {
        let entry = self.tracks.get(track)?.clip_at(time)?;
        self.clips.get(&entry.clip_id)
    }

    /// Indices of lanes holding at least one clip.
    pub fn occupied_tracks(&self) -> Vec<usize> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Frame just past the last clip on any lane.
    pub fn length(&self) -> i64 {
        self.tracks.iter().map(Track::end).max().unwrap_or(0)
    }

    /// Whether `[start, start + length)` is free on `track`. Lanes past the
    /// current count are empty by definition.
    pub fn is_free(&self, track: usize, start: i64, length: i64, exclude: Option<ClipId>) -> bool {
        self.tracks
            .get(track)
            .map_or(true, |t| t.is_free(start, length, exclude))
    }

    /// Clips referencing `media_id`, with their lanes.
    pub fn clips_of_media(&self, media_id: MediaId) -> Vec<(ClipId, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .flat_map(|(i, t)| t.entries().iter().map(move |e| (e.clip_id, i)))
            .filter(|(id, _)| {
                self.clips
                    .get(id)
                    .is_some_and(|c| c.media_id() == media_id)
            })
            .collect()
    }

    /// Every clip currently present at `frame` on an unmuted lane, lowest
    /// lane first. Muted clips are skipped.
    pub fn active_at(&self, frame: i64) -> Vec<ActiveClip> {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_muted())
            .filter_map(|(i, t)| {
                let entry = t.clip_at(frame)?;
                if t.is_clip_muted(entry.clip_id) {
                    return None;
                }
                let clip = self.clips.get(&entry.clip_id)?;
                Some(ActiveClip {
                    clip_id: entry.clip_id,
                    media_id: clip.media_id(),
                    track: i,
                    source_frame: clip.begin() + (frame - entry.start),
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Put a new clip on `track` at `time`, growing the set as needed.
    pub fn place(&mut self, clip: Clip, track: usize, time: i64) -> Result<()> {
        if self.clips.contains_key(&clip.id()) {
            return Err(CoreError::DuplicateClip(clip.id()));
        }
        if time < 0 {
            return Err(CoreError::InvalidPosition(time));
        }
        if !self.is_free(track, time, clip.length(), None) {
            return Err(CoreError::Overlap { track, start: time });
        }
        self.ensure_track(track);
        self.tracks[track].insert(
            track,
            PlacedClip {
                clip_id: clip.id(),
                start: time,
                length: clip.length(),
            },
        )?;
        self.clips.insert(clip.id(), clip);
        self.normalize();
        Ok(())
    }

    /// Relocate an already placed clip. Nothing changes on failure.
    pub fn move_clip(
        &mut self,
        clip_id: ClipId,
        old_track: usize,
        new_track: usize,
        time: i64,
    ) -> Result<()> {
        let entry = *self.entry(clip_id, old_track)?;
        if time < 0 {
            return Err(CoreError::InvalidPosition(time));
        }
        if !self.is_free(new_track, time, entry.length, Some(clip_id)) {
            return Err(CoreError::Overlap {
                track: new_track,
                start: time,
            });
        }
        self.tracks[old_track].remove(clip_id);
        self.ensure_track(new_track);
        self.tracks[new_track].insert(
            new_track,
            PlacedClip {
                start: time,
                ..entry
            },
        )?;
        self.normalize();
        Ok(())
    }

    /// Detach a clip and hand it back to the caller.
    pub fn remove(&mut self, clip_id: ClipId, track: usize) -> Result<Clip> {
        self.entry(clip_id, track)?;
        self.tracks[track].remove(clip_id);
        let clip = self
            .clips
            .remove(&clip_id)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        self.normalize();
        Ok(clip)
    }

    /// Change a clip's source range. When `new_begin` differs from the
    /// current begin the clip is also moved to `new_pos` on the same lane.
    /// Boundaries are clamped into the clip's limits.
    pub fn resize(
        &mut self,
        clip_id: ClipId,
        track: usize,
        new_begin: i64,
        new_end: i64,
        new_pos: i64,
    ) -> Result<()> {
        let entry = *self.entry(clip_id, track)?;
        let mut clip = self
            .clips
            .get(&clip_id)
            .cloned()
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let start = if new_begin != clip.begin() {
            new_pos
        } else {
            entry.start
        };
        if start < 0 {
            return Err(CoreError::InvalidPosition(start));
        }
        clip.set_boundaries(new_begin, new_end, false)?;
        if !self.is_free(track, start, clip.length(), Some(clip_id)) {
            return Err(CoreError::Overlap { track, start });
        }
        self.tracks[track].insert(
            track,
            PlacedClip {
                clip_id,
                start,
                length: clip.length(),
            },
        )?;
        self.clips.insert(clip_id, clip);
        self.normalize();
        Ok(())
    }

    /// Cut `clip_id` at media frame `split_point`. The original keeps the left
    /// part; the right part goes at `new_start` on the same lane. A
    /// `replacement` built by an earlier split is reused as the right part.
    pub fn split(
        &mut self,
        clip_id: ClipId,
        track: usize,
        replacement: Option<Clip>,
        new_start: i64,
        split_point: i64,
    ) -> Result<ClipId> {
        let entry = *self.entry(clip_id, track)?;
        let mut left = self
            .clips
            .get(&clip_id)
            .cloned()
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let right = match replacement {
            Some(right) => {
                if right.begin() != split_point {
                    return Err(CoreError::InvalidSplit {
                        at: split_point,
                        begin: right.begin(),
                        end: right.end(),
                    });
                }
                left.truncate_for(&right)?;
                right
            }
            None => left.split_off(split_point)?,
        };
        if self.clips.contains_key(&right.id()) {
            return Err(CoreError::DuplicateClip(right.id()));
        }
        if new_start < 0 {
            return Err(CoreError::InvalidPosition(new_start));
        }
        let left_entry = PlacedClip {
            length: left.length(),
            ..entry
        };
        if left_entry.overlaps(new_start, right.length())
            || !self.is_free(track, new_start, right.length(), Some(clip_id))
        {
            return Err(CoreError::Overlap {
                track,
                start: new_start,
            });
        }

        let right_id = right.id();
        self.tracks[track].insert(track, left_entry)?;
        self.tracks[track].insert(
            track,
            PlacedClip {
                clip_id: right_id,
                start: new_start,
                length: right.length(),
            },
        )?;
        self.clips.insert(clip_id, left);
        self.clips.insert(right_id, right);
        self.normalize();
        Ok(right_id)
    }

    /// Inverse of [`TrackSet::split`]: drop `splitted` and extend `original`
    /// back over its range. Returns the removed right part.
    pub fn unsplit(&mut self, original: ClipId, splitted: ClipId, track: usize) -> Result<Clip> {
        let entry = *self.entry(original, track)?;
        self.entry(splitted, track)?;
        let mut left = self
            .clips
            .get(&original)
            .cloned()
            .ok_or(CoreError::ClipNotFound(original))?;
        let right = self
            .clips
            .get(&splitted)
            .cloned()
            .ok_or(CoreError::ClipNotFound(splitted))?;
        left.absorb(&right)?;

        let restored = PlacedClip {
            length: left.length(),
            ..entry
        };
        let blocked = self.tracks[track]
            .collisions(restored.start, restored.length, Some(original))
            .any(|e| e.clip_id != splitted);
        if blocked {
            return Err(CoreError::Overlap {
                track,
                start: restored.start,
            });
        }

        self.tracks[track].remove(splitted);
        self.tracks[track].insert(track, restored)?;
        self.clips.remove(&splitted);
        self.clips.insert(original, left);
        self.normalize();
        Ok(right)
    }

    pub fn set_track_muted(&mut self, track: usize, muted: bool) -> Result<()> {
        let count = self.tracks.len();
        let lane = self
            .tracks
            .get_mut(track)
            .ok_or(CoreError::TrackOutOfRange { track, count })?;
        lane.set_muted(muted);
        Ok(())
    }

    pub fn set_clip_muted(&mut self, clip_id: ClipId, track: usize, muted: bool) -> Result<()> {
        let lane = self
            .tracks
            .get_mut(track)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        if lane.set_clip_muted(clip_id, muted) {
            Ok(())
        } else {
            Err(CoreError::ClipNotFound(clip_id))
        }
    }

    /// Drop every clip and return to the initial lane count. Like a fresh
    /// set, the preallocated empty lanes stay until the next edit.
    pub fn clear(&mut self) {
        self.clips.clear();
        self.tracks = (0..self.initial_tracks).map(|_| Track::new()).collect();
    }

    /// Clips in lane order, then start order, with their placement.
    pub fn placed_clips(&self) -> impl Iterator<Item = (usize, &PlacedClip, &Clip)> {
        self.tracks.iter().enumerate().flat_map(move |(i, t)| {
            t.entries()
                .iter()
                .filter_map(move |e| self.clips.get(&e.clip_id).map(|c| (i, e, c)))
        })
    }

    fn entry(&self, clip_id: ClipId, track: usize) -> Result<&PlacedClip> {
        self.tracks
            .get(track)
            .and_then(|t| t.get(clip_id))
            .ok_or(CoreError::ClipNotFound(clip_id))
    }

    fn ensure_track(&mut self, track: usize) {
        while self.tracks.len() <= track {
            self.tracks.push(Track::new());
        }
    }

    /// Keep one empty lane on top and drop any further empty ones.
    fn normalize(&mut self) {
        if self.tracks.last().map_or(true, |t| !t.is_empty()) {
            self.tracks.push(Track::new());
        }
        let trailing = self.tracks.iter().rev().take_while(|t| t.is_empty()).count();
        let removable = trailing.saturating_sub(1).min(self.tracks.len() - 1);
        let keep = self.tracks.len() - removable;
        self.tracks.truncate(keep);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
