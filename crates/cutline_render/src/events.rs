use crossbeam_channel::{unbounded, Receiver, Sender};
use cutline_core::types::{ClipId, Placement, TrackType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Who moved the frame cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameChangedReason {
    Renderer,
    TimelineCursor,
    PreviewCursor,
    RulerCursor,
}

/// Published by the workflow after the matching state change has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    FrameChanged {
        frame: i64,
        reason: FrameChangedReason,
    },
    ClipAdded {
        clip_id: ClipId,
        track_type: TrackType,
        at: Placement,
    },
    ClipMoved {
        clip_id: ClipId,
        track_type: TrackType,
        at: Placement,
    },
    ClipRemoved {
        clip_id: ClipId,
        track_type: TrackType,
        track: usize,
    },
    ClipResized {
        clip_id: ClipId,
        track_type: TrackType,
        begin: i64,
        end: i64,
    },
    MuteChanged {
        track_type: TrackType,
        track: usize,
        clip_id: Option<ClipId>,
        muted: bool,
    },
    LengthChanged(i64),
    Cleared,
    EndReached,
}

/// Fan-out of workflow events to any number of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<WorkflowEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<WorkflowEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: WorkflowEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
