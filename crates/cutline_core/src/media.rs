use crate::error::{CoreError, Result};
use crate::types::MediaId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

pub const STREAM_PREFIX: &str = "stream://";

const VIDEO_EXTENSIONS: &[&str] = &["mov", "avi", "mkv", "mpg", "mpeg", "wmv", "mp4", "ogg", "ogv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "oga", "flac", "aac", "wav"];
const IMAGE_EXTENSIONS: &[&str] = &["gif", "png", "jpg", "jpeg"];

// ---------------------------------------------------------------------------
// MediaKind / InputKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Classify a file by its extension, case-insensitively.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InputKind {
    File,
    Stream,
}

// ---------------------------------------------------------------------------
// ProbeResult
// ---------------------------------------------------------------------------

/// Metadata produced by an external probe once a media item has been analysed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub length_ms: i64,
    pub nb_frames: i64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub audio_tracks: u32,
    pub video_tracks: u32,
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: MediaId,
    pub name: String,
    /// File path, or the stream URI with the `stream://` prefix stripped.
    pub location: String,
    pub input: InputKind,
    pub kind: Option<MediaKind>,
    pub length_ms: i64,
    pub nb_frames: i64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub audio_tracks: u32,
    pub video_tracks: u32,
    #[serde(default)]
    pub meta_tags: Vec<String>,
}

impl Media {
    /// Create a media item for a file path or a `stream://` URI.
    /// Metadata stays zeroed until [`Media::apply_probe`] runs.
    pub fn new(location: &str) -> Self {
        Self::with_id(Uuid::new_v4(), location)
    }

    pub fn with_id(id: MediaId, location: &str) -> Self {
        let (input, location, kind, name) = match location.strip_prefix(STREAM_PREFIX) {
            Some(uri) => (InputKind::Stream, uri.to_string(), Some(MediaKind::Video), uri.to_string()),
            None => {
                let path = Path::new(location);
                let kind = MediaKind::from_path(path);
                if kind.is_none() {
                    tracing::warn!(location, "unrecognised media extension");
                }
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| location.to_string());
                (InputKind::File, location.to_string(), kind, name)
            }
        };
        Self {
            id,
            name,
            location,
            input,
            kind,
            length_ms: 0,
            nb_frames: 0,
            fps: 0.0,
            width: 0,
            height: 0,
            audio_tracks: 0,
            video_tracks: 0,
            meta_tags: Vec::new(),
        }
    }

    /// Record the result of metadata probing.
    pub fn apply_probe(&mut self, probe: &ProbeResult) {
        self.length_ms = probe.length_ms;
        self.nb_frames = probe.nb_frames;
        self.fps = probe.fps;
        self.width = probe.width;
        self.height = probe.height;
        self.audio_tracks = probe.audio_tracks;
        self.video_tracks = probe.video_tracks;
    }

    pub fn has_audio(&self) -> bool {
        self.audio_tracks > 0
    }

    pub fn has_video(&self) -> bool {
        self.video_tracks > 0
    }

    /// Case-insensitive prefix match against the meta tags. An empty query matches.
    pub fn match_meta_tag(&self, tag: &str) -> bool {
        match_tags(&self.meta_tags, tag)
    }
}

pub(crate) fn match_tags(tags: &[String], tag: &str) -> bool {
    if tag.is_empty() {
        return true;
    }
    let needle = tag.to_lowercase();
    tags.iter().any(|t| t.to_lowercase().starts_with(&needle))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    MediaAdded(MediaId),
    MediaRemoved(MediaId),
}

/// Lookup side of the media catalog, as seen by the timeline.
pub trait MediaCatalog: Send + Sync {
    fn media(&self, id: MediaId) -> Option<Media>;
}

/// In-memory catalog. Removal is broadcast to every subscriber so the
/// timeline can purge clips that reference the removed media.
#[derive(Default)]
pub struct MediaLibrary {
    items: RwLock<HashMap<MediaId, Media>>,
    subscribers: Mutex<Vec<Sender<CatalogEvent>>>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn insert(&self, media: Media) -> MediaId {
        let id = media.id;
        self.items.write().insert(id, media);
        self.publish(CatalogEvent::MediaAdded(id));
        id
    }

    pub fn remove(&self, id: MediaId) -> Option<Media> {
        let removed = self.items.write().remove(&id);
        if removed.is_some() {
            self.publish(CatalogEvent::MediaRemoved(id));
        }
        removed
    }

    pub fn apply_probe(&self, id: MediaId, probe: &ProbeResult) -> Result<()> {
        let mut items = self.items.write();
        let media = items.get_mut(&id).ok_or(CoreError::MediaNotFound(id))?;
        media.apply_probe(probe);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Media whose meta tags match `tag`.
    pub fn search(&self, tag: &str) -> Vec<Media> {
        self.items
            .read()
            .values()
            .filter(|m| m.match_meta_tag(tag))
            .cloned()
            .collect()
    }

    /// Load a catalog from a JSON array of media records.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let records: Vec<Media> = serde_json::from_str(&data)?;
        let library = Self::new();
        for media in records {
            library.insert(media);
        }
        Ok(library)
    }

    fn publish(&self, event: CatalogEvent) {
        // Dropped receivers are pruned on the next publish.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl MediaCatalog for MediaLibrary {
    fn media(&self, id: MediaId) -> Option<Media> {
        self.items.read().get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
