//! Download-then-play sequencing over the queue and tree.
//!
//! One logical playback chain owns the player at a time. Two mechanisms
//! guard the hand-off across the await points:
//!
//! * a play generation counter: a resolved download is discarded when any
//!   newer play call has started since, or when the track that should be
//!   playing is no longer the one this call captured;
//! * the playing pointer records which (track, generation) claimed the
//!   player, so a killed session's settle can tell it was taken over while
//!   a naturally finished session still advances.
//!
//! A superseded download is never cancelled, only discarded on arrival.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use grouplike::{NodeId, Playlist, RecordStore};

use crate::downloader::Downloader;
use crate::events::EventBus;
use crate::player::Player;
use crate::queue_service::{EnqueuePosition, QueueService};

/// Errors surfaced by [`PlaybackManager::play`].
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error("no player is available")]
    PlayerUnavailable,
    #[error("download failed for `{source_ref}`")]
    Download {
        source_ref: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("player failed")]
    Player(#[source] anyhow::Error),
}

/// Coordinates downloads, playback, and automatic advancement.
#[derive(Clone)]
pub struct PlaybackManager {
    playlist: Arc<Mutex<Playlist>>,
    queue: QueueService,
    records: RecordStore,
    downloader: Arc<dyn Downloader>,
    player: Option<Arc<dyn Player>>,
    events: EventBus,
    // Playing track plus the generation that claimed it.
    playing: Arc<Mutex<Option<(NodeId, u64)>>>,
    generation: Arc<AtomicU64>,
}

impl PlaybackManager {
    pub fn new(
        playlist: Arc<Mutex<Playlist>>,
        queue: QueueService,
        records: RecordStore,
        downloader: Arc<dyn Downloader>,
        player: Option<Arc<dyn Player>>,
        events: EventBus,
    ) -> Self {
        Self {
            playlist,
            queue,
            records,
            downloader,
            player,
            events,
            playing: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared playlist tree, also holding every derived view.
    pub fn playlist(&self) -> &Arc<Mutex<Playlist>> {
        &self.playlist
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// The track currently playing, if any.
    pub fn playing(&self) -> Option<NodeId> {
        self.playing.lock().unwrap().map(|(id, _)| id)
    }

    /// Download `track` and hand it to the player, then advance when it
    /// finishes naturally. Resolves when this playback chain ends, so
    /// awaiting `play` on the first track drives the whole playlist.
    ///
    /// With `auto_enqueue`, `track` is first queued immediately after the
    /// track playing when the call began.
    pub async fn play(&self, track: NodeId, auto_enqueue: bool) -> Result<(), PlayError> {
        self.play_inner(track, auto_enqueue).await
    }

    fn play_inner(&self, track: NodeId, auto_enqueue: bool) -> BoxFuture<'_, Result<(), PlayError>> {
        async move {
            let Some(player) = self.player.clone() else {
                return Err(PlayError::PlayerUnavailable);
            };

            let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let prior = self.playing();

            if auto_enqueue {
                let playlist = self.playlist.lock().unwrap();
                let position = prior
                    .map(EnqueuePosition::After)
                    .unwrap_or(EnqueuePosition::End);
                self.queue.enqueue(&playlist, track, position);
            }

            let source_ref = {
                let playlist = self.playlist.lock().unwrap();
                playlist.source_ref(track).unwrap_or("").to_string()
            };

            self.records.set_downloading(track, true);
            let resolved = self.downloader.resolve(&source_ref).await;

            let superseded = self.generation.load(Ordering::SeqCst) != token
                || self.playing() != prior;
            if superseded {
                // The track that should be playing changed while this
                // download was in flight; nothing of this attempt reaches
                // the player.
                tracing::debug!(?track, source_ref, "discarding superseded download");
                return Ok(());
            }

            self.records.set_downloading(track, false);
            let file = resolved.map_err(|source| PlayError::Download { source_ref, source })?;

            // Claim the player before killing the old session so its settle
            // sees the new owner.
            *self.playing.lock().unwrap() = Some((track, token));
            self.records.set_playing(track, true);
            player.kill().await;
            self.events.track_started(track);

            let outcome = player.play_file(&file).await;
            self.settle(track, token, outcome).await
        }
        .boxed()
    }

    async fn settle(
        &self,
        track: NodeId,
        token: u64,
        outcome: anyhow::Result<()>,
    ) -> Result<(), PlayError> {
        let still_owner = *self.playing.lock().unwrap() == Some((track, token));
        if still_owner {
            // Settled naturally: go idle, then advance.
            self.records.set_playing(track, false);
            *self.playing.lock().unwrap() = None;
            self.events.playback_stopped();
            outcome.map_err(PlayError::Player)?;
            self.advance(track, true).await
        } else {
            // Superseded mid-flight. Clear our own flag unless a newer
            // session replayed the same track and owns it now.
            let owned_by_newer = matches!(
                *self.playing.lock().unwrap(),
                Some((id, owner)) if id == track && owner != token
            );
            if !owned_by_newer {
                self.records.set_playing(track, false);
            }
            Ok(())
        }
    }

    /// Move to the neighbor of `track`: its queue neighbor when there is
    /// one, otherwise its sibling in the tree. The sibling is enqueued
    /// (`End` going forward, `Front` going backward) and the just-inserted
    /// slot is played. With neither, playback stays stopped.
    pub fn advance(&self, track: NodeId, forward: bool) -> BoxFuture<'_, Result<(), PlayError>> {
        async move {
            if let Some(neighbor) = self.queue.neighbor(track, forward) {
                return self.play_inner(neighbor, false).await;
            }

            let sibling = {
                let playlist = self.playlist.lock().unwrap();
                tree_sibling(&playlist, track, forward)
            };
            let Some(sibling) = sibling else {
                tracing::debug!(?track, forward, "nothing to advance to");
                return Ok(());
            };

            let position = if forward {
                EnqueuePosition::End
            } else {
                EnqueuePosition::Front
            };
            let inserted = {
                let playlist = self.playlist.lock().unwrap();
                self.queue.enqueue(&playlist, sibling, position)
            };
            let slot = if forward {
                inserted.first().copied()
            } else {
                inserted.last().copied()
            };
            match slot {
                Some(next) => self.play_inner(next, false).await,
                None => Ok(()),
            }
        }
        .boxed()
    }

    /// Stop playback and go idle. An in-flight download is left to finish;
    /// its result will be discarded.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let playing = self.playing.lock().unwrap().take();
        if let Some(player) = self.player.clone() {
            player.kill().await;
        }
        if let Some((track, _)) = playing {
            self.records.set_playing(track, false);
            self.events.playback_stopped();
        }
    }

    pub async fn toggle_pause(&self) {
        if let Some(player) = &self.player {
            player.toggle_pause().await;
        }
    }

    pub async fn seek_ahead(&self, seconds: f64) {
        if let Some(player) = &self.player {
            player.seek_ahead(seconds).await;
        }
    }

    pub async fn seek_back(&self, seconds: f64) {
        if let Some(player) = &self.player {
            player.seek_back(seconds).await;
        }
    }
}

fn tree_sibling(playlist: &Playlist, track: NodeId, forward: bool) -> Option<NodeId> {
    let parent = playlist.parent(track)?;
    let (index, _) = playlist.index_in_parent(track).ok()?;
    let siblings = playlist.children(parent);
    if forward {
        siblings.get(index + 1).copied()
    } else {
        index.checked_sub(1).map(|at| siblings[at])
    }
}
