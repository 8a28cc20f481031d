use crate::types::{ClipId, MediaId, Placement, TrackType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A committed timeline edit, described with enough detail for an external
/// undo stack to invert it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditRecord {
    Added {
        clip_id: ClipId,
        media_id: MediaId,
        track_type: TrackType,
        at: Placement,
    },
    Moved {
        clip_id: ClipId,
        track_type: TrackType,
        from: Placement,
        to: Placement,
    },
    Removed {
        clip_id: ClipId,
        media_id: MediaId,
        track_type: TrackType,
        at: Placement,
    },
    Split {
        original: ClipId,
        new_clip: ClipId,
        track_type: TrackType,
        track: usize,
        split_point: i64,
    },
    Unsplit {
        original: ClipId,
        removed: ClipId,
        track_type: TrackType,
        track: usize,
    },
    Resized {
        clip_id: ClipId,
        track_type: TrackType,
        old_bounds: (i64, i64),
        new_bounds: (i64, i64),
        old_start: i64,
        new_start: i64,
    },
    Muted {
        track_type: TrackType,
        track: usize,
        clip_id: Option<ClipId>,
        muted: bool,
    },
    Cleared,
}

impl EditRecord {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Added { .. } => "Add clip",
            Self::Moved { .. } => "Move clip",
            Self::Removed { .. } => "Remove clip",
            Self::Split { .. } => "Split clip",
            Self::Unsplit { .. } => "Unsplit clip",
            Self::Resized { .. } => "Resize clip",
            Self::Muted { muted: true, .. } => "Mute",
            Self::Muted { muted: false, .. } => "Unmute",
            Self::Cleared => "Clear timeline",
        }
    }
}

/// Receives every committed edit, in commit order.
pub trait EditJournal: Send + Sync {
    fn record(&self, edit: EditRecord);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl EditJournal for NullJournal {
    fn record(&self, _edit: EditRecord) {}
}

/// Keeps the most recent `max_size` edits.
#[derive(Debug)]
pub struct RecordingJournal {
    records: Mutex<VecDeque<EditRecord>>,
    max_size: usize,
}

impl RecordingJournal {
    pub fn new(max_size: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn last(&self) -> Option<EditRecord> {
        self.records.lock().back().cloned()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<EditRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn take(&self) -> Vec<EditRecord> {
        self.records.lock().drain(..).collect()
    }
}

impl EditJournal for RecordingJournal {
    fn record(&self, edit: EditRecord) {
        tracing::trace!(edit = edit.description(), "journal");
        let mut records = self.records.lock();
        records.push_back(edit);
        while records.len() > self.max_size {
            records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn moved(time: i64) -> EditRecord {
        EditRecord::Moved {
            clip_id: Uuid::new_v4(),
            track_type: TrackType::Video,
            from: Placement::new(0, 0),
            to: Placement::new(0, time),
        }
    }

    #[test]
    fn records_in_order() {
        let journal = RecordingJournal::new(10);
        journal.record(moved(1));
        journal.record(moved(2));
        let all = journal.snapshot();
        assert_eq!(all.len(), 2);
        assert!(matches!(all[1], EditRecord::Moved { to, .. } if to.time == 2));
    }

    #[test]
    fn bounded_drops_oldest() {
        let journal = RecordingJournal::new(3);
        for t in 0..5 {
            journal.record(moved(t));
        }
        assert_eq!(journal.len(), 3);
        assert!(matches!(journal.snapshot()[0], EditRecord::Moved { to, .. } if to.time == 2));
        assert!(matches!(journal.last(), Some(EditRecord::Moved { to, .. }) if to.time == 4));
    }

    #[test]
    fn take_empties() {
        let journal = RecordingJournal::new(3);
        journal.record(EditRecord::Cleared);
        assert_eq!(journal.take(), vec![EditRecord::Cleared]);
        assert!(journal.is_empty());
    }

    #[test]
    fn descriptions() {
        assert_eq!(moved(0).description(), "Move clip");
        assert_eq!(EditRecord::Cleared.description(), "Clear timeline");
    }

    #[test]
    fn null_journal_accepts_anything() {
        let journal: &dyn EditJournal = &NullJournal;
        journal.record(EditRecord::Cleared);
    }
}
