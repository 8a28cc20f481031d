use crate::types::{ClipId, TrackType};
use std::collections::HashMap;

/// One side of a link: a clip and the track type it lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkEnd {
    pub clip_id: ClipId,
    pub track_type: TrackType,
}

/// Symmetric video/audio pairing. Links are back-references, not
/// ownership; dropping either side clears the other.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    partners: HashMap<ClipId, LinkEnd>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `a` with `b`, replacing any previous partner of either.
    pub fn link(&mut self, a: LinkEnd, b: LinkEnd) {
        self.unlink(a.clip_id);
        self.unlink(b.clip_id);
        self.partners.insert(a.clip_id, b);
        self.partners.insert(b.clip_id, a);
    }

    pub fn partner(&self, clip_id: ClipId) -> Option<LinkEnd> {
        self.partners.get(&clip_id).copied()
    }

    /// Drop the link on both sides. Returns the former partner.
    pub fn unlink(&mut self, clip_id: ClipId) -> Option<LinkEnd> {
        let partner = self.partners.remove(&clip_id)?;
        self.partners.remove(&partner.clip_id);
        Some(partner)
    }

    pub fn len(&self) -> usize {
        self.partners.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn clear(&mut self) {
        self.partners.clear();
    }
}
