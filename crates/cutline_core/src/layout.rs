//! Persisted timeline layout.
//!
//! ```json
//! { "timeline": { "tracks": [
//!     { "id": 0, "clips": [
//!         { "parent": "<media uuid>", "begin": 0, "end": 250,
//!           "startFrame": 100, "trackType": 0 } ] } ] } }
//! ```
//!
//! Loading is lenient: a malformed track or clip is skipped with a warning
//! and the rest of the document still loads.

use crate::error::{CoreError, Result};
use crate::track_set::TrackSet;
use crate::types::{MediaId, TrackType};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ROOT_TAG: &str = "timeline";
pub const EXTENSION: &str = "cutline";

/// One clip as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub track: usize,
    pub track_type: TrackType,
    pub parent: MediaId,
    pub begin: i64,
    pub end: i64,
    pub start_frame: i64,
}

/// Clips in source order, ready to be re-added one by one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineLayout {
    pub entries: Vec<LayoutEntry>,
}

/// Result of a lenient load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub layout: TimelineLayout,
    /// Track and clip entries that were dropped.
    pub skipped: usize,
}

impl TimelineLayout {
    /// Snapshot the given track sets, lane by lane.
    pub fn from_sets<'a>(sets: impl IntoIterator<Item = &'a TrackSet>) -> Self {
        let entries = sets
            .into_iter()
            .flat_map(|set| {
                let track_type = set.track_type();
                set.placed_clips().map(move |(track, placed, clip)| LayoutEntry {
                    track,
                    track_type,
                    parent: clip.media_id(),
                    begin: clip.begin(),
                    end: clip.end(),
                    start_frame: placed.start,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn to_json(&self) -> Value {
        let mut tracks: Vec<(TrackType, usize, Vec<Value>)> = Vec::new();
        for e in &self.entries {
            let clip = json!({
                "parent": e.parent.to_string(),
                "begin": e.begin,
                "end": e.end,
                "startFrame": e.start_frame,
                "trackType": e.track_type.index(),
            });
            match tracks
                .iter_mut()
                .find(|(tt, id, _)| *tt == e.track_type && *id == e.track)
            {
                Some((_, _, clips)) => clips.push(clip),
                None => tracks.push((e.track_type, e.track, vec![clip])),
            }
        }
        let tracks: Vec<Value> = tracks
            .into_iter()
            .map(|(_, id, clips)| json!({ "id": id, "clips": clips }))
            .collect();
        json!({ ROOT_TAG: { "tracks": tracks } })
    }

    /// Parse a layout document. Only a missing or malformed root is fatal.
    pub fn parse(doc: &Value) -> Result<LoadReport> {
        let Some(root) = doc.get(ROOT_TAG).and_then(Value::as_object) else {
            tracing::warn!("invalid timeline node: missing `{ROOT_TAG}` root");
            return Err(CoreError::InvalidLayout(format!("missing `{ROOT_TAG}` root")));
        };

        let mut report = LoadReport::default();
        let tracks = root.get("tracks").and_then(Value::as_array);
        for track in tracks.into_iter().flatten() {
            let Some(track_id) = track
                .get("id")
                .and_then(parse_u64)
                .and_then(|id| usize::try_from(id).ok())
            else {
                tracing::warn!("invalid track number in project file; skipping track");
                report.skipped += 1;
                continue;
            };
            let clips = track.get("clips").and_then(Value::as_array);
            for clip in clips.into_iter().flatten() {
                match parse_clip(track_id, clip) {
                    Some(entry) => report.layout.entries.push(entry),
                    None => report.skipped += 1,
                }
            }
        }
        Ok(report)
    }

    /// Save as pretty-printed JSON, appending the `.cutline` extension if missing.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_extension(path.as_ref());
        let json = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<LoadReport> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let doc: Value = serde_json::from_str(&data)?;
        Self::parse(&doc)
    }
}

fn parse_clip(track: usize, clip: &Value) -> Option<LayoutEntry> {
    let Some(fields) = clip.as_object() else {
        tracing::warn!(track, "clip entry is not an object");
        return None;
    };

    let mut parent = None;
    let mut begin = None;
    let mut end = None;
    let mut start_frame = None;
    let mut track_type = None;

    for (name, value) in fields {
        match name.as_str() {
            "parent" => {
                let id = value.as_str().and_then(|s| Uuid::parse_str(s).ok());
                parent = Some(required(name, id)?)
            }
            "begin" => begin = Some(required(name, parse_i64(value))?),
            "end" => end = Some(required(name, parse_i64(value))?),
            "startFrame" => start_frame = Some(required(name, parse_i64(value))?),
            "trackType" => {
                let tt = parse_u64(value).and_then(TrackType::from_index);
                track_type = Some(required(name, tt)?)
            }
            other => tracing::warn!(track, field = other, "unknown clip field"),
        }
    }

    match (parent, begin, end, start_frame, track_type) {
        (Some(parent), Some(begin), Some(end), Some(start_frame), Some(track_type)) => Some(LayoutEntry {
            track,
            track_type,
            parent,
            begin,
            end,
            start_frame,
        }),
        _ => {
            tracing::warn!(track, "clip entry is missing required fields; skipping");
            None
        }
    }
}

fn required<T>(name: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        tracing::warn!(field = name, "invalid clip field; skipping clip");
    }
    parsed
}

/// Integers may be stored as numbers or numeric strings.
fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
        path.to_path_buf()
    } else {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(EXTENSION);
        p.set_file_name(name);
        p
    }
}
