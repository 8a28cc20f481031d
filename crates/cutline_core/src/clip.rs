use crate::error::{CoreError, Result};
use crate::media::{match_tags, Media};
use crate::types::{ClipId, MediaId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous sub-range `[begin, end)` of a media item, in media frames.
///
/// The clip holds the media id only; the media itself belongs to the catalog.
/// `max_begin`/`max_end` bound how far a resize may extend the range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    id: ClipId,
    media_id: MediaId,
    begin: i64,
    end: i64,
    max_begin: i64,
    max_end: i64,
    #[serde(default)]
    meta_tags: Vec<String>,
    #[serde(default)]
    notes: String,
}

impl Clip {
    /// The default clip covering the whole media.
    pub fn from_media(media: &Media) -> Result<Self> {
        Self::new(media, 0, None)
    }

    /// `end = None` means "till the end of the media".
    pub fn new(media: &Media, begin: i64, end: Option<i64>) -> Result<Self> {
        let end = end.unwrap_or(media.nb_frames);
        if begin < 0 || begin >= end || end > media.nb_frames {
            return Err(CoreError::InvalidBoundaries { begin, end });
        }
        Ok(Self::from_parts(Uuid::new_v4(), media.id, begin, end))
    }

    /// Build a clip from raw fields, for example while loading a project.
    pub fn from_parts(id: ClipId, media_id: MediaId, begin: i64, end: i64) -> Self {
        Self {
            id,
            media_id,
            begin,
            end,
            max_begin: begin,
            max_end: end,
            meta_tags: Vec::new(),
            notes: String::new(),
        }
    }

    /// A new clip over `[begin, end)` of the same media. It may not grow
    /// back before `begin`, but inherits this clip's end limit.
    pub fn sub_clip(&self, begin: i64, end: i64) -> Result<Self> {
        if begin >= end || begin < self.max_begin || end > self.max_end {
            return Err(CoreError::InvalidBoundaries { begin, end });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            media_id: self.media_id,
            begin,
            end,
            max_begin: begin,
            max_end: self.max_end,
            meta_tags: self.meta_tags.clone(),
            notes: self.notes.clone(),
        })
    }

    /// Same range and metadata under a fresh timeline identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn media_id(&self) -> MediaId {
        self.media_id
    }

    pub fn begin(&self) -> i64 {
        self.begin
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn length(&self) -> i64 {
        self.end - self.begin
    }

    /// Length in whole seconds at the given frame rate.
    pub fn length_seconds(&self, fps: f64) -> i64 {
        if fps <= 0.0 {
            return 0;
        }
        (self.length() as f64 / fps).round() as i64
    }

    pub fn max_begin(&self) -> i64 {
        self.max_begin
    }

    pub fn max_end(&self) -> i64 {
        self.max_end
    }

    pub fn set_begin(&mut self, begin: i64, update_max: bool) -> Result<()> {
        self.set_boundaries(begin, self.end, update_max)
    }

    pub fn set_end(&mut self, end: i64, update_max: bool) -> Result<()> {
        self.set_boundaries(self.begin, end, update_max)
    }

    /// Replace both boundaries. Without `update_max` the new range is
    /// clamped into `[max_begin, max_end]`; with it the limits follow the
    /// new range. Fails without mutating if the result would be empty.
    pub fn set_boundaries(&mut self, begin: i64, end: i64, update_max: bool) -> Result<()> {
        let (begin, end) = if update_max {
            (begin, end)
        } else {
            (begin.max(self.max_begin), end.min(self.max_end))
        };
        if begin >= end || begin < 0 {
            return Err(CoreError::InvalidBoundaries { begin, end });
        }
        self.begin = begin;
        self.end = end;
        if update_max {
            self.max_begin = begin;
            self.max_end = end;
        }
        Ok(())
    }

    /// Extend this clip over a contiguous right-hand sibling, taking over
    /// its end and end limit.
    pub(crate) fn absorb(&mut self, right: &Clip) -> Result<()> {
        if right.media_id != self.media_id || right.begin != self.end {
            return Err(CoreError::InvalidBoundaries {
                begin: self.end,
                end: right.begin,
            });
        }
        self.end = right.end;
        self.max_end = right.max_end;
        Ok(())
    }

    /// Cut at `at` (a media frame). `self` keeps `[begin, at)` and may no
    /// longer extend past it; the returned clip covers `[at, end)`.
    pub(crate) fn split_off(&mut self, at: i64) -> Result<Clip> {
        if at <= self.begin || at >= self.end {
            return Err(CoreError::InvalidSplit {
                at,
                begin: self.begin,
                end: self.end,
            });
        }
        let right = self.sub_clip(at, self.end)?;
        self.end = at;
        self.max_end = at;
        Ok(right)
    }

    /// Shrink `self` to end at `at` for a caller-supplied right half.
    pub(crate) fn truncate_for(&mut self, right: &Clip) -> Result<()> {
        let at = right.begin;
        if at <= self.begin || at >= self.end || right.end != self.end {
            return Err(CoreError::InvalidSplit {
                at,
                begin: self.begin,
                end: self.end,
            });
        }
        self.end = at;
        self.max_end = at;
        Ok(())
    }

    pub fn meta_tags(&self) -> &[String] {
        &self.meta_tags
    }

    pub fn set_meta_tags(&mut self, tags: Vec<String>) {
        self.meta_tags = tags;
    }

    pub fn match_meta_tag(&self, tag: &str) -> bool {
        match_tags(&self.meta_tags, tag)
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
