//! Per-entry playback status, keyed by node identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::tree::NodeId;

/// Mutable status attached to one entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub downloading: bool,
    pub playing: bool,
}

/// Shared store of per-entry records, created lazily on first access.
///
/// Keys are node ids, never name/source pairs, so two structurally
/// identical tracks never collide. Records are not pruned when an entry is
/// detached from the tree; callers that care use [`RecordStore::delete_record`].
#[derive(Clone, Default)]
pub struct RecordStore {
    inner: Arc<Mutex<HashMap<NodeId, Record>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `id`, creating the default on first access.
    pub fn record(&self, id: NodeId) -> Record {
        *self.inner.lock().unwrap().entry(id).or_default()
    }

    pub fn set_downloading(&self, id: NodeId, value: bool) {
        self.inner.lock().unwrap().entry(id).or_default().downloading = value;
    }

    pub fn set_playing(&self, id: NodeId, value: bool) {
        self.inner.lock().unwrap().entry(id).or_default().playing = value;
    }

    /// Drop the record for `id`, if any.
    pub fn delete_record(&self, id: NodeId) {
        self.inner.lock().unwrap().remove(&id);
    }
}
