//! Playback queue mutations and neighbor lookup.
//!
//! The queue is an ordered list of track ids, independent of tree order.
//! A track appears at most once; re-enqueueing moves it.

use std::sync::{Arc, Mutex};

use grouplike::{NodeId, Playlist};

use crate::events::EventBus;

/// Where an enqueued track lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueuePosition {
    /// Head of the queue.
    Front,
    /// Immediately after the anchor's current position; appended when the
    /// anchor is not queued.
    After(NodeId),
    /// Tail of the queue.
    End,
}

#[derive(Default)]
pub struct QueueState {
    pub items: Vec<NodeId>,
}

#[derive(Clone)]
pub struct QueueService {
    queue: Arc<Mutex<QueueState>>,
    events: EventBus,
}

impl QueueService {
    pub fn new(events: EventBus) -> Self {
        Self {
            queue: Arc::new(Mutex::new(QueueState::default())),
            events,
        }
    }

    /// Snapshot of the queued ids, front first.
    pub fn items(&self) -> Vec<NodeId> {
        self.queue.lock().unwrap().items.clone()
    }

    /// Enqueue an entry; a group enqueues its descendant tracks depth-first
    /// instead of itself.
    ///
    /// A track already queued is moved, not duplicated. Returns the ids
    /// inserted, in insertion order.
    pub fn enqueue(
        &self,
        playlist: &Playlist,
        entry: NodeId,
        position: EnqueuePosition,
    ) -> Vec<NodeId> {
        let tracks: Vec<NodeId> = if playlist.is_group(entry) {
            let only_tracks = |pl: &Playlist, id: NodeId| pl.is_track(id);
            playlist.collect_descendants(entry, Some(&only_tracks))
        } else {
            vec![entry]
        };
        if tracks.is_empty() {
            return tracks;
        }

        let mut queue = self.queue.lock().unwrap();
        let mut inserted = 0usize;
        for track in &tracks {
            if let Some(existing) = queue.items.iter().position(|t| t == track) {
                queue.items.remove(existing);
            }
            let index = match position {
                EnqueuePosition::Front => inserted,
                EnqueuePosition::After(anchor) => {
                    match queue.items.iter().position(|t| *t == anchor) {
                        Some(at) => at + 1 + inserted,
                        None => queue.items.len(),
                    }
                }
                EnqueuePosition::End => queue.items.len(),
            };
            queue.items.insert(index, *track);
            inserted += 1;
        }
        drop(queue);
        self.events.queue_changed();
        tracks
    }

    /// Remove a track from the queue.
    pub fn dequeue(&self, id: NodeId) -> bool {
        let mut queue = self.queue.lock().unwrap();
        if let Some(at) = queue.items.iter().position(|t| *t == id) {
            queue.items.remove(at);
            drop(queue);
            self.events.queue_changed();
            return true;
        }
        false
    }

    /// The queued item next to `id`: following it going forward, preceding
    /// it going backward. `None` when `id` is not queued or sits at the
    /// relevant edge.
    pub fn neighbor(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let queue = self.queue.lock().unwrap();
        let at = queue.items.iter().position(|t| *t == id)?;
        if forward {
            queue.items.get(at + 1).copied()
        } else {
            at.checked_sub(1).map(|previous| queue.items[previous])
        }
    }

    /// Clear the queue.
    pub fn clear(&self) {
        let mut queue = self.queue.lock().unwrap();
        if !queue.items.is_empty() {
            queue.items.clear();
            drop(queue);
            self.events.queue_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use grouplike::normalize;

    fn sample() -> Playlist {
        normalize(&json!({
            "children": [
                {"name": "t1", "sourceRef": "s1"},
                {"name": "t2", "sourceRef": "s2"},
                {"name": "album", "children": [
                    {"name": "t3", "sourceRef": "s3"},
                    {"name": "t4", "sourceRef": "s4"},
                ]},
            ]
        }))
        .unwrap()
    }

    fn make_service() -> QueueService {
        QueueService::new(EventBus::new())
    }

    #[test]
    fn enqueue_appends_by_default() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let t2 = playlist.children(root)[1];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        service.enqueue(&playlist, t2, EnqueuePosition::End);

        assert_eq!(service.items(), vec![t1, t2]);
    }

    #[test]
    fn reenqueueing_moves_instead_of_duplicating() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let t2 = playlist.children(root)[1];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        service.enqueue(&playlist, t2, EnqueuePosition::End);
        service.enqueue(&playlist, t2, EnqueuePosition::Front);

        assert_eq!(service.items().len(), 2);
        assert_eq!(service.items(), vec![t2, t1]);
    }

    #[test]
    fn front_insertion_preserves_group_order() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let album = playlist.children(root)[2];
        let t3 = playlist.children(album)[0];
        let t4 = playlist.children(album)[1];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        service.enqueue(&playlist, album, EnqueuePosition::Front);

        assert_eq!(service.items(), vec![t3, t4, t1]);
    }

    #[test]
    fn after_anchor_inserts_behind_it_in_order() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let t2 = playlist.children(root)[1];
        let album = playlist.children(root)[2];
        let t3 = playlist.children(album)[0];
        let t4 = playlist.children(album)[1];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        service.enqueue(&playlist, t2, EnqueuePosition::End);
        service.enqueue(&playlist, album, EnqueuePosition::After(t1));

        assert_eq!(service.items(), vec![t1, t3, t4, t2]);
    }

    #[test]
    fn missing_anchor_falls_back_to_append() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let t2 = playlist.children(root)[1];
        let album = playlist.children(root)[2];
        let t3 = playlist.children(album)[0];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        service.enqueue(&playlist, t2, EnqueuePosition::After(t3));

        assert_eq!(service.items(), vec![t1, t2]);
    }

    #[test]
    fn neighbor_looks_both_ways() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];
        let t2 = playlist.children(root)[1];

        service.enqueue(&playlist, root, EnqueuePosition::End);

        assert_eq!(service.neighbor(t1, true), Some(t2));
        assert_eq!(service.neighbor(t2, false), Some(t1));
        assert_eq!(service.neighbor(t1, false), None);
    }

    #[test]
    fn dequeue_removes_a_single_track() {
        let playlist = sample();
        let service = make_service();
        let root = playlist.root();
        let t1 = playlist.children(root)[0];

        service.enqueue(&playlist, t1, EnqueuePosition::End);
        assert!(service.dequeue(t1));
        assert!(!service.dequeue(t1));
        assert!(service.items().is_empty());
    }
}
