//! The multi-track workflow: frame clock, output pulls and structural edits
//! over the video and audio track sets.
//!
//! Locks are always taken in this order, each one optional:
//! render state, frame clock, video set, audio set, length, links.
//! Events are published while the lock guarding the changed state is still
//! held, so subscribers see them in commit order.

use crate::error::{RenderError, Result};
use crate::events::{EventBus, FrameChangedReason, WorkflowEvent};
use crate::output::{EffectsStage, OutputBuffer, VideoFrame};
use crossbeam_channel::Receiver;
use cutline_core::clip::Clip;
use cutline_core::error::CoreError;
use cutline_core::journal::{EditJournal, EditRecord};
use cutline_core::layout::TimelineLayout;
use cutline_core::links::{LinkEnd, LinkRegistry};
use cutline_core::media::{CatalogEvent, MediaCatalog};
use cutline_core::placement::{self, Candidate};
use cutline_core::track_set::TrackSet;
use cutline_core::types::{ClipId, MediaId, Placement, TrackType};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whether a move comes from a live gesture (the UI already shows it) or
/// from replaying history (observers must be told).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrigin {
    Gesture,
    Replay,
}

/// Clips created by [`Workflow::drop_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedClips {
    pub at: Placement,
    pub video: Option<ClipId>,
    pub audio: Option<ClipId>,
}

/// Outcome of [`Workflow::load_layout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct RenderState {
    started: bool,
    black: Option<VideoFrame>,
}

#[derive(Debug, Default)]
struct FrameClock {
    current: [i64; 2],
    end_reached: bool,
}

#[derive(Debug, Default)]
struct ProjectLength {
    per_type: [i64; 2],
    total: i64,
}

pub struct Workflow {
    catalog: Arc<dyn MediaCatalog>,
    effects: Arc<dyn EffectsStage>,
    journal: Arc<dyn EditJournal>,
    render: Mutex<RenderState>,
    clock: RwLock<FrameClock>,
    video: RwLock<TrackSet>,
    audio: RwLock<TrackSet>,
    length: Mutex<ProjectLength>,
    links: Mutex<LinkRegistry>,
    events: EventBus,
}

impl Workflow {
    pub fn new(
        initial_tracks: usize,
        catalog: Arc<dyn MediaCatalog>,
        effects: Arc<dyn EffectsStage>,
        journal: Arc<dyn EditJournal>,
    ) -> Self {
        Self {
            catalog,
            effects,
            journal,
            render: Mutex::new(RenderState::default()),
            clock: RwLock::new(FrameClock::default()),
            video: RwLock::new(TrackSet::new(TrackType::Video, initial_tracks)),
            audio: RwLock::new(TrackSet::new(TrackType::Audio, initial_tracks)),
            length: Mutex::new(ProjectLength::default()),
            links: Mutex::new(LinkRegistry::new()),
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&self) -> Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    fn tracks(&self, track_type: TrackType) -> &RwLock<TrackSet> {
        match track_type {
            TrackType::Video => &self.video,
            TrackType::Audio => &self.audio,
        }
    }

    // -----------------------------------------------------------------------
    // Render clock
    // -----------------------------------------------------------------------

    /// Stopped -> Rendering. Resets both frame counters and allocates the
    /// black frame used when nothing is composed.
    pub fn start_render(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let mut render = self.render.lock();
        let mut clock = self.clock.write();
        render.started = true;
        render.black = Some(VideoFrame::black(width, height));
        clock.current = [0, 0];
        clock.end_reached = false;
        tracing::info!(width, height, "render started");
        Ok(())
    }

    /// Any state -> Stopped. Counters go back to 0.
    pub fn stop(&self) {
        let mut render = self.render.lock();
        let mut clock = self.clock.write();
        render.started = false;
        clock.current = [0, 0];
        clock.end_reached = false;
        self.events.publish(WorkflowEvent::FrameChanged {
            frame: 0,
            reason: FrameChangedReason::Renderer,
        });
        tracing::info!("render stopped");
    }

    pub fn is_rendering(&self) -> bool {
        self.render.lock().started
    }

    /// Output for the current frame of `track_type`, or `None` while stopped.
    pub fn get_output(&self, track_type: TrackType, paused: bool) -> Option<OutputBuffer> {
        let render = self.render.lock();
        if !render.started {
            return None;
        }
        let clock = self.clock.read();
        let frame = clock.current[track_type.index()];
        let active = self.tracks(track_type).read().active_at(frame);

        match track_type {
            TrackType::Video => {
                let composed = self
                    .effects
                    .compose(frame, &active, paused)
                    .filter(|f| !f.is_empty());
                composed.or_else(|| render.black.clone()).map(OutputBuffer::Video)
            }
            TrackType::Audio => Some(OutputBuffer::Audio(self.effects.mix(frame, &active, paused))),
        }
    }

    /// The canonical (video) frame.
    pub fn get_current_frame(&self) -> i64 {
        self.clock.read().current[TrackType::Video.index()]
    }

    pub fn current_frame(&self, track_type: TrackType) -> i64 {
        self.clock.read().current[track_type.index()]
    }

    pub fn advance_frame(&self, track_type: TrackType) {
        let mut clock = self.clock.write();
        clock.current[track_type.index()] += 1;
        if track_type == TrackType::Video {
            self.events.publish(WorkflowEvent::FrameChanged {
                frame: clock.current[track_type.index()],
                reason: FrameChangedReason::Renderer,
            });
        }
    }

    /// Step back one frame; the counter never goes below 0.
    pub fn retreat_frame(&self, track_type: TrackType) {
        let mut clock = self.clock.write();
        let slot = &mut clock.current[track_type.index()];
        *slot = (*slot - 1).max(0);
        let frame = *slot;
        if track_type == TrackType::Video {
            self.events.publish(WorkflowEvent::FrameChanged {
                frame,
                reason: FrameChangedReason::Renderer,
            });
        }
    }

    /// Seek both counters to `frame`.
    pub fn set_current_frame(&self, frame: i64, reason: FrameChangedReason) {
        let frame = frame.max(0);
        let mut clock = self.clock.write();
        clock.current = [frame; 2];
        clock.end_reached = false;
        self.events
            .publish(WorkflowEvent::FrameChanged { frame, reason });
    }

    /// One render tick: advance both counters together. Returns `true` on the
    /// tick where every track type has run past the project length; the
    /// `EndReached` event fires only on that tick.
    pub fn render_one_frame(&self) -> Result<bool> {
        let render = self.render.lock();
        if !render.started {
            return Err(RenderError::NotRendering);
        }
        let mut clock = self.clock.write();
        for slot in clock.current.iter_mut() {
            *slot += 1;
        }
        self.events.publish(WorkflowEvent::FrameChanged {
            frame: clock.current[TrackType::Video.index()],
            reason: FrameChangedReason::Renderer,
        });

        let length = self.length.lock().total;
        if !clock.end_reached && clock.current.iter().all(|f| *f >= length) {
            clock.end_reached = true;
            tracing::info!(frame = clock.current[0], "end of timeline reached");
            self.events.publish(WorkflowEvent::EndReached);
            return Ok(true);
        }
        Ok(false)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Run `f` against a consistent view of one track set.
    pub fn with_track_set<R>(&self, track_type: TrackType, f: impl FnOnce(&TrackSet) -> R) -> R {
        f(&self.tracks(track_type).read())
    }

    pub fn get_clip(&self, clip_id: ClipId, track_type: TrackType) -> Option<Clip> {
        self.tracks(track_type).read().get(clip_id).cloned()
    }

    pub fn clip_position(&self, clip_id: ClipId, track: usize, track_type: TrackType) -> Option<i64> {
        self.tracks(track_type).read().position(clip_id, track)
    }

    pub fn clip_track(&self, clip_id: ClipId, track_type: TrackType) -> Option<usize> {
        self.tracks(track_type).read().track_of(clip_id)
    }

    pub fn track_count(&self, track_type: TrackType) -> usize {
        self.tracks(track_type).read().track_count()
    }

    pub fn length_frame(&self) -> i64 {
        self.length.lock().total
    }

    /// Speculative placement against the current contents; nothing is locked
    /// beyond the read.
    pub fn resolve(
        &self,
        track_type: TrackType,
        candidate: &Candidate,
        desired: Placement,
    ) -> Result<Placement> {
        let set = self.tracks(track_type).read();
        Ok(placement::resolve(&set, candidate, desired)?)
    }

    // -----------------------------------------------------------------------
    // Structural edits
    // -----------------------------------------------------------------------

    /// Put `clip` at an already resolved position.
    pub fn add_clip(
        &self,
        clip: Clip,
        track: usize,
        time: i64,
        track_type: TrackType,
    ) -> Result<ClipId> {
        let mut set = self.tracks(track_type).write();
        let id = self.commit_add(&mut set, clip, Placement::new(track, time))?;
        self.update_length(&[(track_type, set.length())]);
        Ok(id)
    }

    /// Re-place an existing clip at an already resolved position. Only
    /// replays notify observers with `ClipMoved`.
    pub fn move_clip(
        &self,
        clip_id: ClipId,
        old_track: usize,
        new_track: usize,
        time: i64,
        track_type: TrackType,
        origin: MoveOrigin,
    ) -> Result<()> {
        let mut set = self.tracks(track_type).write();
        let from = set
            .position(clip_id, old_track)
            .map(|t| Placement::new(old_track, t))
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let to = Placement::new(new_track, time);
        set.move_clip(clip_id, old_track, new_track, time)?;
        self.after_move(clip_id, track_type, from, to, origin);
        self.update_length(&[(track_type, set.length())]);
        Ok(())
    }

    /// Detach a clip and hand it to the caller. Its link, if any, is cleared.
    pub fn remove_clip(&self, clip_id: ClipId, track: usize, track_type: TrackType) -> Result<Clip> {
        let mut set = self.tracks(track_type).write();
        let clip = self.commit_remove(&mut set, clip_id, track)?;
        self.update_length(&[(track_type, set.length())]);
        self.links.lock().unlink(clip_id);
        Ok(clip)
    }

    /// Cut `original` at media frame `split_point`; the right part lands at
    /// `new_start`. Pass the clip returned by an earlier split as
    /// `replacement` to redo it exactly.
    pub fn split_clip(
        &self,
        original: ClipId,
        replacement: Option<Clip>,
        track: usize,
        new_start: i64,
        split_point: i64,
        track_type: TrackType,
    ) -> Result<ClipId> {
        let _render = self.render.lock();
        let mut set = self.tracks(track_type).write();
        let new_clip = set.split(original, track, replacement, new_start, split_point)?;
        tracing::debug!(%original, %new_clip, split_point, "clip split");
        self.events.publish(WorkflowEvent::ClipAdded {
            clip_id: new_clip,
            track_type,
            at: Placement::new(track, new_start),
        });
        self.journal.record(EditRecord::Split {
            original,
            new_clip,
            track_type,
            track,
            split_point,
        });
        self.update_length(&[(track_type, set.length())]);
        Ok(new_clip)
    }

    /// Exact inverse of [`Workflow::split_clip`]. Returns the removed part.
    pub fn unsplit_clip(
        &self,
        original: ClipId,
        splitted: ClipId,
        track: usize,
        track_type: TrackType,
    ) -> Result<Clip> {
        let _render = self.render.lock();
        let mut set = self.tracks(track_type).write();
        let removed = set.unsplit(original, splitted, track)?;
        tracing::debug!(%original, %splitted, "clip unsplit");
        self.events.publish(WorkflowEvent::ClipRemoved {
            clip_id: splitted,
            track_type,
            track,
        });
        self.journal.record(EditRecord::Unsplit {
            original,
            removed: splitted,
            track_type,
            track,
        });
        self.update_length(&[(track_type, set.length())]);
        self.links.lock().unlink(splitted);
        Ok(removed)
    }

    /// Change a clip's source range. A new begin also moves it to `new_pos`.
    pub fn resize_clip(
        &self,
        clip_id: ClipId,
        new_begin: i64,
        new_end: i64,
        new_pos: i64,
        track: usize,
        track_type: TrackType,
    ) -> Result<()> {
        let _render = self.render.lock();
        let mut set = self.tracks(track_type).write();
        let (old_bounds, old_start) = set
            .get(clip_id)
            .zip(set.position(clip_id, track))
            .map(|(c, start)| ((c.begin(), c.end()), start))
            .ok_or(CoreError::ClipNotFound(clip_id))?;

        set.resize(clip_id, track, new_begin, new_end, new_pos)?;

        let (new_bounds, new_start) = set
            .get(clip_id)
            .zip(set.position(clip_id, track))
            .map(|(c, start)| ((c.begin(), c.end()), start))
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        if new_start != old_start {
            self.events.publish(WorkflowEvent::ClipMoved {
                clip_id,
                track_type,
                at: Placement::new(track, new_start),
            });
        }
        self.events.publish(WorkflowEvent::ClipResized {
            clip_id,
            track_type,
            begin: new_bounds.0,
            end: new_bounds.1,
        });
        self.journal.record(EditRecord::Resized {
            clip_id,
            track_type,
            old_bounds,
            new_bounds,
            old_start,
            new_start,
        });
        self.update_length(&[(track_type, set.length())]);
        Ok(())
    }

    pub fn mute_track(&self, track: usize, track_type: TrackType) -> Result<()> {
        self.set_muted(track, None, track_type, true)
    }

    pub fn unmute_track(&self, track: usize, track_type: TrackType) -> Result<()> {
        self.set_muted(track, None, track_type, false)
    }

    pub fn mute_clip(&self, clip_id: ClipId, track: usize, track_type: TrackType) -> Result<()> {
        self.set_muted(track, Some(clip_id), track_type, true)
    }

    pub fn unmute_clip(&self, clip_id: ClipId, track: usize, track_type: TrackType) -> Result<()> {
        self.set_muted(track, Some(clip_id), track_type, false)
    }

    fn set_muted(
        &self,
        track: usize,
        clip_id: Option<ClipId>,
        track_type: TrackType,
        muted: bool,
    ) -> Result<()> {
        let mut set = self.tracks(track_type).write();
        match clip_id {
            Some(id) => set.set_clip_muted(id, track, muted)?,
            None => set.set_track_muted(track, muted)?,
        }
        self.events.publish(WorkflowEvent::MuteChanged {
            track_type,
            track,
            clip_id,
            muted,
        });
        self.journal.record(EditRecord::Muted {
            track_type,
            track,
            clip_id,
            muted,
        });
        Ok(())
    }

    /// Drop every clip and link.
    pub fn clear(&self) {
        let mut video = self.video.write();
        let mut audio = self.audio.write();
        video.clear();
        audio.clear();
        self.update_length(&[(TrackType::Video, 0), (TrackType::Audio, 0)]);
        self.links.lock().clear();
        self.events.publish(WorkflowEvent::Cleared);
        self.journal.record(EditRecord::Cleared);
        tracing::debug!("timeline cleared");
    }

    // -----------------------------------------------------------------------
    // Linked pairs
    // -----------------------------------------------------------------------

    /// Pair a video clip with an audio clip so they move together.
    pub fn link_clips(&self, video_clip: ClipId, audio_clip: ClipId) -> Result<()> {
        let video = self.video.read();
        let audio = self.audio.read();
        if !video.contains(video_clip) {
            return Err(CoreError::ClipNotFound(video_clip).into());
        }
        if !audio.contains(audio_clip) {
            return Err(CoreError::ClipNotFound(audio_clip).into());
        }
        self.links.lock().link(
            LinkEnd {
                clip_id: video_clip,
                track_type: TrackType::Video,
            },
            LinkEnd {
                clip_id: audio_clip,
                track_type: TrackType::Audio,
            },
        );
        Ok(())
    }

    pub fn linked_clip(&self, clip_id: ClipId) -> Option<LinkEnd> {
        self.links.lock().partner(clip_id)
    }

    /// Resolve and commit a move of `clip_id` toward `desired`, dragging its
    /// linked partner along. Both clips land on the same placement or
    /// neither moves.
    pub fn move_linked(
        &self,
        clip_id: ClipId,
        track_type: TrackType,
        desired: Placement,
        origin: MoveOrigin,
    ) -> Result<Placement> {
        let partner = self.links.lock().partner(clip_id);
        let mut video = self.video.write();
        let mut audio = self.audio.write();
        let (primary_set, linked_set) = match track_type {
            TrackType::Video => (&mut *video, &mut *audio),
            TrackType::Audio => (&mut *audio, &mut *video),
        };

        let primary =
            Candidate::placed(primary_set, clip_id).ok_or(CoreError::ClipNotFound(clip_id))?;
        let Some(from) = primary.origin else {
            return Err(CoreError::ClipNotFound(clip_id).into());
        };

        let Some(partner) = partner.filter(|p| p.track_type == track_type.other()) else {
            let to = placement::resolve(primary_set, &primary, desired)?;
            primary_set.move_clip(clip_id, from.track, to.track, to.time)?;
            self.after_move(clip_id, track_type, from, to, origin);
            self.update_length(&[(track_type, primary_set.length())]);
            return Ok(to);
        };

        let linked = Candidate::placed(linked_set, partner.clip_id)
            .ok_or(CoreError::ClipNotFound(partner.clip_id))?;
        let Some(linked_from) = linked.origin else {
            return Err(CoreError::ClipNotFound(partner.clip_id).into());
        };
        let to = placement::resolve_linked(primary_set, &primary, linked_set, &linked, desired)?;

        primary_set.move_clip(clip_id, from.track, to.track, to.time)?;
        if let Err(e) = linked_set.move_clip(partner.clip_id, linked_from.track, to.track, to.time) {
            if let Err(rollback) = primary_set.move_clip(clip_id, to.track, from.track, from.time) {
                tracing::error!(%clip_id, %rollback, "failed to restore clip after linked move");
            }
            return Err(e.into());
        }

        self.after_move(clip_id, track_type, from, to, origin);
        self.after_move(partner.clip_id, partner.track_type, linked_from, to, origin);
        self.update_length(&[
            (track_type, primary_set.length()),
            (partner.track_type, linked_set.length()),
        ]);
        Ok(to)
    }

    /// Create clips for `media_id` (video and/or audio, per its streams),
    /// link them, and add them at the placement resolved around
    /// `(track, time)`.
    pub fn drop_media(&self, media_id: MediaId, track: usize, time: i64) -> Result<DroppedClips> {
        let media = self
            .catalog
            .media(media_id)
            .ok_or(CoreError::MediaNotFound(media_id))?;
        let video_clip = media.has_video().then(|| Clip::from_media(&media)).transpose()?;
        let audio_clip = media.has_audio().then(|| Clip::from_media(&media)).transpose()?;
        let desired = Placement::new(track, time);

        let mut video = self.video.write();
        let mut audio = self.audio.write();

        let dropped = match (video_clip, audio_clip) {
            (Some(v), Some(a)) => {
                let at = placement::resolve_linked(
                    &video,
                    &Candidate::fresh(v.length()),
                    &audio,
                    &Candidate::fresh(a.length()),
                    desired,
                )?;
                let video_id = self.commit_add(&mut video, v, at)?;
                let audio_id = match self.commit_add(&mut audio, a, at) {
                    Ok(id) => id,
                    Err(e) => {
                        if let Err(rollback) = self.commit_remove(&mut video, video_id, at.track) {
                            tracing::error!(%video_id, %rollback, "failed to undo partial drop");
                        }
                        return Err(e);
                    }
                };
                self.links.lock().link(
                    LinkEnd {
                        clip_id: video_id,
                        track_type: TrackType::Video,
                    },
                    LinkEnd {
                        clip_id: audio_id,
                        track_type: TrackType::Audio,
                    },
                );
                DroppedClips {
                    at,
                    video: Some(video_id),
                    audio: Some(audio_id),
                }
            }
            (Some(v), None) => {
                let at = placement::resolve(&video, &Candidate::fresh(v.length()), desired)?;
                let id = self.commit_add(&mut video, v, at)?;
                DroppedClips {
                    at,
                    video: Some(id),
                    audio: None,
                }
            }
            (None, Some(a)) => {
                let at = placement::resolve(&audio, &Candidate::fresh(a.length()), desired)?;
                let id = self.commit_add(&mut audio, a, at)?;
                DroppedClips {
                    at,
                    video: None,
                    audio: Some(id),
                }
            }
            (None, None) => return Err(RenderError::NoStreams(media_id)),
        };

        self.update_length(&[
            (TrackType::Video, video.length()),
            (TrackType::Audio, audio.length()),
        ]);
        Ok(dropped)
    }

    // -----------------------------------------------------------------------
    // Media catalog
    // -----------------------------------------------------------------------

    /// Remove every clip backed by `media_id`. Returns how many went.
    pub fn purge_media(&self, media_id: MediaId) -> usize {
        let mut video = self.video.write();
        let mut audio = self.audio.write();
        let mut removed = Vec::new();
        for set in [&mut *video, &mut *audio] {
            for (clip_id, track) in set.clips_of_media(media_id) {
                match self.commit_remove(set, clip_id, track) {
                    Ok(_) => removed.push(clip_id),
                    Err(e) => tracing::warn!(%clip_id, error = %e, "failed to purge clip"),
                }
            }
        }
        self.update_length(&[
            (TrackType::Video, video.length()),
            (TrackType::Audio, audio.length()),
        ]);
        let mut links = self.links.lock();
        for clip_id in &removed {
            links.unlink(*clip_id);
        }
        if !removed.is_empty() {
            tracing::debug!(%media_id, count = removed.len(), "purged clips of removed media");
        }
        removed.len()
    }

    pub fn handle_catalog_event(&self, event: &CatalogEvent) {
        if let CatalogEvent::MediaRemoved(id) = event {
            self.purge_media(*id);
        }
    }

    /// Apply every catalog event queued on `rx` without blocking.
    pub fn pump_catalog_events(&self, rx: &Receiver<CatalogEvent>) -> usize {
        let mut handled = 0;
        for event in rx.try_iter() {
            self.handle_catalog_event(&event);
            handled += 1;
        }
        handled
    }

    // -----------------------------------------------------------------------
    // Layout persistence
    // -----------------------------------------------------------------------

    pub fn layout(&self) -> TimelineLayout {
        let video = self.video.read();
        let audio = self.audio.read();
        TimelineLayout::from_sets([&*video, &*audio])
    }

    pub fn save_layout(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.layout().save_to_file(path)?)
    }

    /// Re-add the clips of a saved layout in file order. Entries whose media
    /// is unknown, whose range is invalid or which collide are skipped.
    /// Only an unreadable file or a wrong root fails the whole load.
    pub fn load_layout(&self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let report = TimelineLayout::load_from_file(path)?;
        let mut summary = self.apply_layout(&report.layout);
        summary.skipped += report.skipped;
        tracing::info!(loaded = summary.loaded, skipped = summary.skipped, "layout loaded");
        Ok(summary)
    }

    pub fn apply_layout(&self, layout: &TimelineLayout) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for entry in &layout.entries {
            // Lanes are saved in order, so a valid entry never lands more
            // than one lane above the current top.
            let count = self.track_count(entry.track_type);
            if entry.track > count {
                let e = CoreError::TrackOutOfRange {
                    track: entry.track,
                    count,
                };
                tracing::warn!(track = entry.track, error = %e, "track out of range in layout; skipping clip");
                summary.skipped += 1;
                continue;
            }
            let Some(media) = self.catalog.media(entry.parent) else {
                tracing::warn!(parent = %entry.parent, "unknown media in layout; skipping clip");
                summary.skipped += 1;
                continue;
            };
            let clip = match Clip::new(&media, entry.begin, Some(entry.end)) {
                Ok(clip) => clip,
                Err(e) => {
                    tracing::warn!(parent = %entry.parent, error = %e, "invalid clip in layout");
                    summary.skipped += 1;
                    continue;
                }
            };
            match self.add_clip(clip, entry.track, entry.start_frame, entry.track_type) {
                Ok(_) => summary.loaded += 1,
                Err(e) => {
                    tracing::warn!(track = entry.track, start = entry.start_frame, error = %e, "clip collides on load");
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn commit_add(&self, set: &mut TrackSet, clip: Clip, at: Placement) -> Result<ClipId> {
        let clip_id = clip.id();
        let media_id = clip.media_id();
        let track_type = set.track_type();
        set.place(clip, at.track, at.time)?;
        tracing::debug!(%clip_id, %track_type, %at, "clip added");
        self.events.publish(WorkflowEvent::ClipAdded {
            clip_id,
            track_type,
            at,
        });
        self.journal.record(EditRecord::Added {
            clip_id,
            media_id,
            track_type,
            at,
        });
        Ok(clip_id)
    }

    fn commit_remove(&self, set: &mut TrackSet, clip_id: ClipId, track: usize) -> Result<Clip> {
        let track_type = set.track_type();
        let time = set
            .position(clip_id, track)
            .ok_or(CoreError::ClipNotFound(clip_id))?;
        let clip = set.remove(clip_id, track)?;
        tracing::debug!(%clip_id, %track_type, track, "clip removed");
        self.events.publish(WorkflowEvent::ClipRemoved {
            clip_id,
            track_type,
            track,
        });
        self.journal.record(EditRecord::Removed {
            clip_id,
            media_id: clip.media_id(),
            track_type,
            at: Placement::new(track, time),
        });
        Ok(clip)
    }

    fn after_move(
        &self,
        clip_id: ClipId,
        track_type: TrackType,
        from: Placement,
        to: Placement,
        origin: MoveOrigin,
    ) {
        tracing::debug!(%clip_id, %track_type, %from, %to, "clip moved");
        if origin == MoveOrigin::Replay {
            self.events.publish(WorkflowEvent::ClipMoved {
                clip_id,
                track_type,
                at: to,
            });
        }
        self.journal.record(EditRecord::Moved {
            clip_id,
            track_type,
            from,
            to,
        });
    }

    /// Record new per-type lengths and publish `LengthChanged` when the
    /// project length moved.
    fn update_length(&self, updates: &[(TrackType, i64)]) {
        let mut length = self.length.lock();
        for (track_type, len) in updates {
            length.per_type[track_type.index()] = *len;
        }
        let total = length.per_type.iter().copied().max().unwrap_or(0);
        if total != length.total {
            length.total = total;
            self.events.publish(WorkflowEvent::LengthChanged(total));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AudioBuffer, NullStage};
    use cutline_core::journal::{NullJournal, RecordingJournal};
    use cutline_core::media::{Media, MediaLibrary, ProbeResult};
    use cutline_core::track_set::ActiveClip;
    use std::thread;
    use tempfile::TempDir;

    fn probe(frames: i64, video: u32, audio: u32) -> ProbeResult {
        ProbeResult {
            length_ms: frames * 40,
            nb_frames: frames,
            fps: 25.0,
            width: 640,
            height: 360,
            audio_tracks: audio,
            video_tracks: video,
        }
    }

    fn media(frames: i64) -> Media {
        let mut m = Media::new("/media/shot.mp4");
        m.apply_probe(&probe(frames, 1, 1));
        m
    }

    struct Fixture {
        library: Arc<MediaLibrary>,
        journal: Arc<RecordingJournal>,
        workflow: Workflow,
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(NullStage))
    }

    fn fixture_with(effects: Arc<dyn EffectsStage>) -> Fixture {
        let library = Arc::new(MediaLibrary::new());
        let journal = Arc::new(RecordingJournal::new(100));
        let workflow = Workflow::new(1, library.clone(), effects, journal.clone());
        Fixture {
            library,
            journal,
            workflow,
        }
    }

    fn clip(media: &Media, begin: i64, end: i64) -> Clip {
        Clip::new(media, begin, Some(end)).unwrap()
    }

    fn frame_events(rx: &Receiver<WorkflowEvent>) -> Vec<i64> {
        rx.try_iter()
            .filter_map(|e| match e {
                WorkflowEvent::FrameChanged { frame, .. } => Some(frame),
                _ => None,
            })
            .collect()
    }

    /// Reports whether anything was active, so tests can tell black from composed.
    struct MarkerStage;

    impl EffectsStage for MarkerStage {
        fn compose(&self, _frame: i64, clips: &[ActiveClip], _paused: bool) -> Option<VideoFrame> {
            if clips.is_empty() {
                None
            } else {
                Some(VideoFrame::solid(2, 2, [255, 255, 255]))
            }
        }

        fn mix(&self, _frame: i64, clips: &[ActiveClip], _paused: bool) -> AudioBuffer {
            AudioBuffer {
                sample_rate: 48_000,
                channels: 1,
                samples: vec![clips.len() as f32],
            }
        }
    }

    // ----- Render clock -----

    #[test]
    fn output_is_none_while_stopped() {
        let f = fixture();
        assert!(f.workflow.get_output(TrackType::Video, false).is_none());
        assert!(f.workflow.get_output(TrackType::Audio, false).is_none());
    }

    #[test]
    fn start_render_rejects_zero_dimensions() {
        let f = fixture();
        assert!(matches!(
            f.workflow.start_render(0, 720),
            Err(RenderError::InvalidDimensions { .. })
        ));
        assert!(!f.workflow.is_rendering());
    }

    #[test]
    fn empty_composition_becomes_black_frame() {
        let f = fixture();
        f.workflow.start_render(4, 2).unwrap();
        let out = f.workflow.get_output(TrackType::Video, false).unwrap();
        let frame = out.as_video().unwrap();
        assert_eq!((frame.width, frame.height), (4, 2));
        assert!(frame.is_black());
    }

    #[test]
    fn composed_frame_when_clip_active() {
        let f = fixture_with(Arc::new(MarkerStage));
        let m = media(100);
        f.library.insert(m.clone());
        f.workflow.add_clip(clip(&m, 0, 10), 0, 5, TrackType::Video).unwrap();
        f.workflow.add_clip(clip(&m, 0, 10), 0, 5, TrackType::Audio).unwrap();
        f.workflow.start_render(4, 2).unwrap();

        assert!(f.workflow.get_output(TrackType::Video, false).unwrap().as_video().unwrap().is_black());
        f.workflow.set_current_frame(5, FrameChangedReason::TimelineCursor);
        let video = f.workflow.get_output(TrackType::Video, false).unwrap();
        assert!(!video.as_video().unwrap().is_black());
        let audio = f.workflow.get_output(TrackType::Audio, false).unwrap();
        assert_eq!(audio.as_audio().unwrap().samples, vec![1.0]);
    }

    #[test]
    fn muted_track_is_skipped_but_kept() {
        let f = fixture_with(Arc::new(MarkerStage));
        let m = media(100);
        let id = f.workflow.add_clip(clip(&m, 0, 10), 0, 0, TrackType::Video).unwrap();
        f.workflow.start_render(4, 2).unwrap();

        f.workflow.mute_track(0, TrackType::Video).unwrap();
        assert!(f.workflow.get_output(TrackType::Video, false).unwrap().as_video().unwrap().is_black());
        assert!(f.workflow.get_clip(id, TrackType::Video).is_some());

        f.workflow.unmute_track(0, TrackType::Video).unwrap();
        f.workflow.mute_clip(id, 0, TrackType::Video).unwrap();
        assert!(f.workflow.get_output(TrackType::Video, false).unwrap().as_video().unwrap().is_black());
        f.workflow.unmute_clip(id, 0, TrackType::Video).unwrap();
        assert!(!f.workflow.get_output(TrackType::Video, false).unwrap().as_video().unwrap().is_black());
    }

    #[test]
    fn advance_frame_is_monotonic_with_one_event_each() {
        let f = fixture();
        let rx = f.workflow.subscribe();
        for _ in 0..10 {
            f.workflow.advance_frame(TrackType::Video);
        }
        assert_eq!(f.workflow.get_current_frame(), 10);
        assert_eq!(frame_events(&rx), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn audio_advance_is_silent() {
        let f = fixture();
        let rx = f.workflow.subscribe();
        f.workflow.advance_frame(TrackType::Audio);
        f.workflow.advance_frame(TrackType::Audio);
        assert_eq!(f.workflow.current_frame(TrackType::Audio), 2);
        assert_eq!(f.workflow.get_current_frame(), 0);
        assert!(frame_events(&rx).is_empty());
    }

    #[test]
    fn retreat_frame_stops_at_zero() {
        let f = fixture();
        f.workflow.advance_frame(TrackType::Video);
        f.workflow.retreat_frame(TrackType::Video);
        f.workflow.retreat_frame(TrackType::Video);
        assert_eq!(f.workflow.get_current_frame(), 0);
    }

    #[test]
    fn stop_resets_and_notifies_zero() {
        let f = fixture();
        f.workflow.start_render(4, 2).unwrap();
        f.workflow.set_current_frame(42, FrameChangedReason::RulerCursor);
        let rx = f.workflow.subscribe();
        f.workflow.stop();
        assert_eq!(f.workflow.get_current_frame(), 0);
        assert_eq!(f.workflow.current_frame(TrackType::Audio), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            WorkflowEvent::FrameChanged {
                frame: 0,
                reason: FrameChangedReason::Renderer
            }
        );
        assert!(!f.workflow.is_rendering());
    }

    #[test]
    fn set_current_frame_carries_reason() {
        let f = fixture();
        let rx = f.workflow.subscribe();
        f.workflow.set_current_frame(12, FrameChangedReason::PreviewCursor);
        assert_eq!(
            rx.try_recv().unwrap(),
            WorkflowEvent::FrameChanged {
                frame: 12,
                reason: FrameChangedReason::PreviewCursor
            }
        );
        assert_eq!(f.workflow.current_frame(TrackType::Audio), 12);
    }

    #[test]
    fn render_one_frame_requires_render() {
        let f = fixture();
        assert!(matches!(
            f.workflow.render_one_frame(),
            Err(RenderError::NotRendering)
        ));
    }

    #[test]
    fn end_reached_fires_once() {
        let f = fixture();
        let m = media(100);
        f.workflow.add_clip(clip(&m, 0, 3), 0, 0, TrackType::Video).unwrap();
        f.workflow.start_render(4, 2).unwrap();
        let rx = f.workflow.subscribe();

        let ends: Vec<bool> = (0..5).map(|_| f.workflow.render_one_frame().unwrap()).collect();
        assert_eq!(ends, vec![false, false, true, false, false]);
        assert_eq!(f.workflow.current_frame(TrackType::Audio), 5);
        let end_events = rx
            .try_iter()
            .filter(|e| *e == WorkflowEvent::EndReached)
            .count();
        assert_eq!(end_events, 1);
    }

    // ----- Edits -----

    #[test]
    fn add_clip_updates_length_once() {
        let f = fixture();
        let m = media(1000);
        f.workflow.add_clip(clip(&m, 0, 300), 0, 0, TrackType::Video).unwrap();
        let rx = f.workflow.subscribe();
        f.workflow.add_clip(clip(&m, 0, 100), 1, 400, TrackType::Audio).unwrap();

        assert_eq!(f.workflow.length_frame(), 500);
        let lengths: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, WorkflowEvent::LengthChanged(_)))
            .collect();
        assert_eq!(lengths, vec![WorkflowEvent::LengthChanged(500)]);
    }

    #[test]
    fn add_clip_event_follows_commit() {
        let f = fixture();
        let m = media(100);
        let rx = f.workflow.subscribe();
        let id = f.workflow.add_clip(clip(&m, 0, 50), 0, 10, TrackType::Video).unwrap();
        match rx.try_recv().unwrap() {
            WorkflowEvent::ClipAdded { clip_id, at, .. } => {
                assert_eq!(clip_id, id);
                assert_eq!(at, Placement::new(0, 10));
                assert_eq!(f.workflow.clip_position(id, 0, TrackType::Video), Some(10));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(f.workflow.track_count(TrackType::Video), 2);
    }

    #[test]
    fn colliding_add_is_rejected_without_change() {
        let f = fixture();
        let m = media(100);
        f.workflow.add_clip(clip(&m, 0, 50), 0, 0, TrackType::Video).unwrap();
        let err = f.workflow.add_clip(clip(&m, 0, 50), 0, 25, TrackType::Video);
        assert!(matches!(err, Err(RenderError::Core(CoreError::Overlap { .. }))));
        assert_eq!(f.workflow.with_track_set(TrackType::Video, |s| s.clip_count()), 1);
        assert_eq!(f.workflow.length_frame(), 50);
    }

    #[test]
    fn move_notifies_only_on_replay() {
        let f = fixture();
        let m = media(100);
        let id = f.workflow.add_clip(clip(&m, 0, 50), 0, 0, TrackType::Video).unwrap();
        let rx = f.workflow.subscribe();

        f.workflow
            .move_clip(id, 0, 1, 10, TrackType::Video, MoveOrigin::Gesture)
            .unwrap();
        assert!(!rx.try_iter().any(|e| matches!(e, WorkflowEvent::ClipMoved { .. })));

        f.workflow
            .move_clip(id, 1, 0, 0, TrackType::Video, MoveOrigin::Replay)
            .unwrap();
        assert!(rx.try_iter().any(|e| matches!(
            e,
            WorkflowEvent::ClipMoved { at, .. } if at == Placement::new(0, 0)
        )));
        assert_eq!(f.journal.len(), 3);
    }

    #[test]
    fn remove_returns_clip_and_shrinks() {
        let f = fixture();
        let m = media(100);
        let id = f.workflow.add_clip(clip(&m, 0, 50), 2, 0, TrackType::Audio).unwrap();
        assert_eq!(f.workflow.track_count(TrackType::Audio), 4);

        let removed = f.workflow.remove_clip(id, 2, TrackType::Audio).unwrap();
        assert_eq!(removed.id(), id);
        assert_eq!(f.workflow.track_count(TrackType::Audio), 1);
        assert_eq!(f.workflow.length_frame(), 0);
        assert!(f.workflow.remove_clip(id, 2, TrackType::Audio).is_err());
    }

    #[test]
    fn split_then_unsplit_restores_clip() {
        let f = fixture();
        let m = media(200);
        let id = f.workflow.add_clip(clip(&m, 10, 110), 0, 0, TrackType::Video).unwrap();
        let before = f.workflow.get_clip(id, TrackType::Video).unwrap();

        let right = f
            .workflow
            .split_clip(id, None, 0, 40, 40, TrackType::Video)
            .unwrap();
        assert_eq!(f.workflow.get_clip(id, TrackType::Video).unwrap().end(), 40);
        let right_clip = f.workflow.get_clip(right, TrackType::Video).unwrap();
        assert_eq!((right_clip.begin(), right_clip.end()), (40, 110));

        let removed = f.workflow.unsplit_clip(id, right, 0, TrackType::Video).unwrap();
        assert_eq!(removed.id(), right);
        assert_eq!(f.workflow.get_clip(id, TrackType::Video).unwrap(), before);
        assert!(f.workflow.get_clip(right, TrackType::Video).is_none());

        // Redo with the clip handed back by the undo.
        let again = f
            .workflow
            .split_clip(id, Some(removed), 0, 40, 40, TrackType::Video)
            .unwrap();
        assert_eq!(again, right);
    }

    #[test]
    fn resize_moves_when_begin_changes() {
        let f = fixture();
        let m = media(200);
        let id = f.workflow.add_clip(clip(&m, 50, 100), 0, 100, TrackType::Video).unwrap();
        let rx = f.workflow.subscribe();

        f.workflow.resize_clip(id, 50, 80, 999, 0, TrackType::Video).unwrap();
        assert_eq!(f.workflow.clip_position(id, 0, TrackType::Video), Some(100));
        assert_eq!(f.workflow.length_frame(), 130);

        f.workflow.resize_clip(id, 60, 80, 110, 0, TrackType::Video).unwrap();
        assert_eq!(f.workflow.clip_position(id, 0, TrackType::Video), Some(110));
        let c = f.workflow.get_clip(id, TrackType::Video).unwrap();
        assert_eq!((c.begin(), c.end()), (60, 80));
        assert!(rx.try_iter().any(|e| matches!(e, WorkflowEvent::ClipMoved { .. })));
    }

    #[test]
    fn clear_empties_everything() {
        let f = fixture();
        let m = media(100);
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 0).unwrap();
        let rx = f.workflow.subscribe();
        f.workflow.clear();
        assert_eq!(f.workflow.length_frame(), 0);
        assert!(dropped.video.and_then(|id| f.workflow.linked_clip(id)).is_none());
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![WorkflowEvent::LengthChanged(0), WorkflowEvent::Cleared]);
    }

    // ----- Linked pairs -----

    #[test]
    fn drop_media_creates_linked_pair() {
        let f = fixture();
        let m = media(100);
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 30).unwrap();
        let (Some(v), Some(a)) = (dropped.video, dropped.audio) else {
            panic!("expected both clips");
        };
        assert_eq!(dropped.at, Placement::new(0, 30));
        assert_eq!(f.workflow.linked_clip(v).map(|l| l.clip_id), Some(a));
        assert_eq!(f.workflow.linked_clip(a).map(|l| l.clip_id), Some(v));
        assert_eq!(f.workflow.length_frame(), 130);
    }

    #[test]
    fn drop_audio_only_media() {
        let f = fixture();
        let mut m = Media::new("/media/voice.wav");
        m.apply_probe(&probe(50, 0, 1));
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 0).unwrap();
        assert!(dropped.video.is_none());
        assert!(dropped.audio.is_some());
    }

    #[test]
    fn drop_unknown_media_fails() {
        let f = fixture();
        assert!(matches!(
            f.workflow.drop_media(uuid::Uuid::new_v4(), 0, 0),
            Err(RenderError::Core(CoreError::MediaNotFound(_)))
        ));
    }

    #[test]
    fn move_linked_moves_both() {
        let f = fixture();
        let m = media(100);
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 0).unwrap();
        let (Some(v), Some(a)) = (dropped.video, dropped.audio) else {
            panic!("expected both clips");
        };
        let to = f
            .workflow
            .move_linked(v, TrackType::Video, Placement::new(0, 250), MoveOrigin::Gesture)
            .unwrap();
        assert_eq!(to, Placement::new(0, 250));
        assert_eq!(f.workflow.clip_position(v, 0, TrackType::Video), Some(250));
        assert_eq!(f.workflow.clip_position(a, 0, TrackType::Audio), Some(250));
    }

    #[test]
    fn linked_move_without_convergence_changes_nothing() {
        let f = fixture();
        let m = media(1000);
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 500).unwrap();
        let (Some(v), Some(a)) = (dropped.video, dropped.audio) else {
            panic!("expected both clips");
        };
        // Video lane 0 blocked at [0,100), audio lane 0 blocked at [100,200):
        // no single (track, time) near 0 satisfies both.
        let m2 = media(1000);
        f.workflow.add_clip(clip(&m2, 0, 100), 0, 0, TrackType::Video).unwrap();
        f.workflow.add_clip(clip(&m2, 0, 100), 0, 100, TrackType::Audio).unwrap();
        let before_len = f.journal.len();

        let result = f
            .workflow
            .move_linked(v, TrackType::Video, Placement::new(0, 50), MoveOrigin::Gesture);
        assert!(matches!(
            result,
            Err(RenderError::Core(CoreError::PlacementInfeasible))
        ));
        assert_eq!(f.workflow.clip_position(v, 0, TrackType::Video), Some(500));
        assert_eq!(f.workflow.clip_position(a, 0, TrackType::Audio), Some(500));
        assert_eq!(f.journal.len(), before_len);
    }

    #[test]
    fn unlinked_move_resolves_alone() {
        let f = fixture();
        let m = media(100);
        f.workflow.add_clip(clip(&m, 0, 100), 0, 0, TrackType::Video).unwrap();
        let b = f.workflow.add_clip(clip(&m, 0, 50), 0, 300, TrackType::Video).unwrap();
        let to = f
            .workflow
            .move_linked(b, TrackType::Video, Placement::new(0, 60), MoveOrigin::Gesture)
            .unwrap();
        assert_eq!(to, Placement::new(0, 100));
    }

    #[test]
    fn removing_one_side_clears_link() {
        let f = fixture();
        let m = media(100);
        f.library.insert(m.clone());
        let dropped = f.workflow.drop_media(m.id, 0, 0).unwrap();
        let (Some(v), Some(a)) = (dropped.video, dropped.audio) else {
            panic!("expected both clips");
        };
        f.workflow.remove_clip(a, 0, TrackType::Audio).unwrap();
        assert!(f.workflow.linked_clip(v).is_none());
    }

    #[test]
    fn link_requires_both_clips() {
        let f = fixture();
        let m = media(100);
        let v = f.workflow.add_clip(clip(&m, 0, 10), 0, 0, TrackType::Video).unwrap();
        assert!(f.workflow.link_clips(v, uuid::Uuid::new_v4()).is_err());
        let a = f.workflow.add_clip(clip(&m, 0, 10), 0, 0, TrackType::Audio).unwrap();
        f.workflow.link_clips(v, a).unwrap();
        assert_eq!(f.workflow.linked_clip(a).map(|l| l.track_type), Some(TrackType::Video));
    }

    // ----- Catalog -----

    #[test]
    fn media_removal_purges_clips() {
        let f = fixture();
        let catalog_rx = f.library.subscribe();
        let m = media(100);
        let other = media(100);
        f.library.insert(m.clone());
        f.library.insert(other.clone());
        f.workflow.drop_media(m.id, 0, 0).unwrap();
        f.workflow.drop_media(other.id, 0, 200).unwrap();

        f.library.remove(m.id);
        f.workflow.pump_catalog_events(&catalog_rx);

        assert_eq!(f.workflow.with_track_set(TrackType::Video, |s| s.clip_count()), 1);
        assert_eq!(f.workflow.with_track_set(TrackType::Audio, |s| s.clip_count()), 1);
        assert_eq!(f.workflow.length_frame(), 300);
        assert_eq!(f.workflow.purge_media(m.id), 0);
    }

    #[test]
    fn purge_unlinks_removed_pair_only() {
        let f = fixture();
        let m = media(100);
        let other = media(100);
        f.library.insert(m.clone());
        f.library.insert(other.clone());
        let gone = f.workflow.drop_media(m.id, 0, 0).unwrap();
        let kept = f.workflow.drop_media(other.id, 0, 200).unwrap();
        let (gone_v, gone_a) = (gone.video.unwrap(), gone.audio.unwrap());
        let (kept_v, kept_a) = (kept.video.unwrap(), kept.audio.unwrap());
        assert!(f.workflow.linked_clip(gone_v).is_some());

        assert_eq!(f.workflow.purge_media(m.id), 2);
        assert!(f.workflow.linked_clip(gone_v).is_none());
        assert!(f.workflow.linked_clip(gone_a).is_none());
        assert_eq!(f.workflow.linked_clip(kept_v).map(|l| l.clip_id), Some(kept_a));
        assert_eq!(f.workflow.linked_clip(kept_a).map(|l| l.clip_id), Some(kept_v));
    }

    // ----- Layout -----

    #[test]
    fn layout_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let f = fixture();
        let m = media(500);
        f.library.insert(m.clone());
        f.workflow.drop_media(m.id, 0, 0).unwrap();
        f.workflow.add_clip(clip(&m, 100, 200), 1, 40, TrackType::Video).unwrap();
        let path = f.workflow.save_layout(dir.path().join("cut")).unwrap();

        let g = Workflow::new(1, f.library.clone(), Arc::new(NullStage), Arc::new(NullJournal));
        let summary = g.load_layout(&path).unwrap();
        assert_eq!(summary, LoadSummary { loaded: 3, skipped: 0 });
        assert_eq!(g.length_frame(), f.workflow.length_frame());
        assert_eq!(g.layout(), f.workflow.layout());
    }

    #[test]
    fn load_skips_unknown_media_and_collisions() {
        let f = fixture();
        let m = media(500);
        f.library.insert(m.clone());
        let doc = serde_json::json!({ "timeline": { "tracks": [ { "id": 0, "clips": [
            { "parent": m.id.to_string(), "begin": 0, "end": 100, "startFrame": 0, "trackType": 0 },
            { "parent": m.id.to_string(), "begin": 0, "end": 100, "startFrame": 50, "trackType": 0 },
            { "parent": uuid::Uuid::new_v4().to_string(), "begin": 0, "end": 10, "startFrame": 300, "trackType": 0 },
            { "parent": m.id.to_string(), "end": 10, "startFrame": 400, "trackType": 0 },
        ] } ] } });
        let report = TimelineLayout::parse(&doc).unwrap();
        let summary = f.workflow.apply_layout(&report.layout);
        assert_eq!(summary, LoadSummary { loaded: 1, skipped: 2 });
        assert_eq!(report.skipped, 1);
        assert_eq!(f.workflow.length_frame(), 100);
    }

    #[test]
    fn load_skips_track_far_above_the_top() {
        let f = fixture();
        let m = media(500);
        f.library.insert(m.clone());
        let parent = m.id.to_string();
        let doc = serde_json::json!({ "timeline": { "tracks": [
            { "id": 0, "clips": [
                { "parent": parent, "begin": 0, "end": 100, "startFrame": 0, "trackType": 0 },
            ] },
            { "id": 4_294_967_295u64, "clips": [
                { "parent": parent, "begin": 0, "end": 100, "startFrame": 0, "trackType": 0 },
            ] },
            { "id": u64::MAX, "clips": [
                { "parent": parent, "begin": 0, "end": 100, "startFrame": 0, "trackType": 1 },
            ] },
            { "id": 1, "clips": [
                { "parent": parent, "begin": 100, "end": 200, "startFrame": 50, "trackType": 0 },
            ] },
        ] } });
        let report = TimelineLayout::parse(&doc).unwrap();
        let summary = f.workflow.apply_layout(&report.layout);

        assert_eq!(summary, LoadSummary { loaded: 2, skipped: 2 });
        assert_eq!(f.workflow.track_count(TrackType::Video), 3);
        assert_eq!(f.workflow.track_count(TrackType::Audio), 1);
        assert_eq!(f.workflow.length_frame(), 150);
    }

    // ----- Concurrency -----

    #[test]
    fn render_and_edit_threads_interleave_safely() {
        let f = fixture_with(Arc::new(MarkerStage));
        let m = media(10_000);
        f.library.insert(m.clone());
        f.workflow.start_render(4, 2).unwrap();
        let workflow = Arc::new(f.workflow);
        let rx = workflow.subscribe();

        let renderer = {
            let wf = workflow.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    assert!(wf.get_output(TrackType::Video, false).is_some());
                    assert!(wf.get_output(TrackType::Audio, false).is_some());
                    wf.advance_frame(TrackType::Video);
                }
            })
        };
        let editor = {
            let wf = workflow.clone();
            let m = m.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    let id = wf
                        .add_clip(clip(&m, 0, 10), 0, i * 20, TrackType::Video)
                        .unwrap();
                    if i % 3 == 0 {
                        wf.split_clip(id, None, 0, i * 20 + 5, 5, TrackType::Video)
                            .unwrap();
                    }
                }
            })
        };
        renderer.join().unwrap();
        editor.join().unwrap();

        assert_eq!(workflow.get_current_frame(), 500);
        let frames = frame_events(&rx);
        assert_eq!(frames, (1..=500).collect::<Vec<_>>());
        workflow.with_track_set(TrackType::Video, |set| {
            for lane in set.tracks() {
                for pair in lane.entries().windows(2) {
                    assert!(pair[0].end() <= pair[1].start);
                }
            }
        });
        assert_eq!(workflow.length_frame(), 99 * 20 + 10);
    }
}
