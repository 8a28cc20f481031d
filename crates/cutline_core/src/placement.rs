//! Collision-aware placement of clips on a track set.
//!
//! Everything here is read-only over a [`TrackSet`] snapshot, so it can run
//! speculatively while the user drags. The commit itself is re-checked by
//! the track set under its lock.

use crate::error::{CoreError, Result};
use crate::track_set::TrackSet;
use crate::types::{ClipId, Placement};

/// The thing being placed: its extent and, for clips already on the
/// timeline, its identity (so it never collides with itself) and its
/// current position (the fallback when no better spot exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub clip_id: Option<ClipId>,
    pub length: i64,
    pub origin: Option<Placement>,
}

impl Candidate {
    /// A clip not yet on the timeline, e.g. during a drop.
    pub fn fresh(length: i64) -> Self {
        Self {
            clip_id: None,
            length,
            origin: None,
        }
    }

    /// A clip already present in `set`.
    pub fn placed(set: &TrackSet, clip_id: ClipId) -> Option<Self> {
        let track = set.track_of(clip_id)?;
        let time = set.position(clip_id, track)?;
        let length = set.get(clip_id)?.length();
        Some(Self {
            clip_id: Some(clip_id),
            length,
            origin: Some(Placement::new(track, time)),
        })
    }

    fn is_legal_at(&self, set: &TrackSet, p: Placement) -> bool {
        p.time >= 0 && set.is_free(p.track, p.time, self.length, self.clip_id)
    }
}

/// Nearest legal placement for `candidate` around `desired`.
pub fn resolve(set: &TrackSet, candidate: &Candidate, desired: Placement) -> Result<Placement> {
    let requested = clamp_track(set, desired);
    let p = find_position(set, candidate, requested);
    if candidate.is_legal_at(set, p) {
        Ok(p)
    } else {
        Err(CoreError::PlacementInfeasible)
    }
}

/// Joint placement of a linked video/audio pair. Both clips must end up at
/// the same `(track, time)`; otherwise the move is refused for both.
pub fn resolve_linked(
    primary_set: &TrackSet,
    primary: &Candidate,
    linked_set: &TrackSet,
    linked: &Candidate,
    desired: Placement,
) -> Result<Placement> {
    let requested = clamp_track(primary_set, desired);
    let mut p = find_position(primary_set, primary, requested);
    let mut p2 = find_position(linked_set, linked, requested);

    if p != p2 {
        if p == requested {
            // The primary got what it asked for; try it where the partner fits.
            p = find_position(primary_set, primary, p2);
        } else if p2 == requested {
            p2 = find_position(linked_set, linked, p);
        }
    }

    if p == p2 && primary.is_legal_at(primary_set, p) && linked.is_legal_at(linked_set, p2) {
        Ok(p)
    } else {
        tracing::debug!(%requested, primary = %p, linked = %p2, "linked placement did not converge");
        Err(CoreError::PlacementInfeasible)
    }
}

fn clamp_track(set: &TrackSet, desired: Placement) -> Placement {
    Placement::new(
        desired.track.min(set.track_count().saturating_sub(1)),
        desired.time,
    )
}

/// Raw search. The result may still collide when every fallback is taken;
/// callers check legality.
fn find_position(set: &TrackSet, candidate: &Candidate, at: Placement) -> Placement {
    let origin = candidate.origin.unwrap_or(at);
    let exclude = candidate.clip_id;
    let length = candidate.length;

    // Vertical: step toward lane 0 until the interval fits. The collider is
    // always on the probed lane, so the search only descends.
    let mut track = at.track;
    while !set.is_free(track, at.time, length, exclude) {
        if track == 0 {
            track = origin.track;
            break;
        }
        track -= 1;
    }

    // Horizontal: clear the first neighbour on the chosen lane.
    let time = at.time.max(0);
    let neighbour = set
        .track(track)
        .and_then(|lane| lane.collisions(time, length, exclude).next().copied());

    let time = match neighbour {
        None => time,
        Some(h) => {
            // Left of (or level with) the neighbour's start goes before it.
            let shifted = if time > h.start {
                h.end()
            } else {
                h.start - length
            };
            if shifted < 0 || shifted == h.start {
                origin.time
            } else if set.is_free(track, shifted, length, exclude) {
                shifted
            } else {
                origin.time
            }
        }
    };

    Placement::new(track, time)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
