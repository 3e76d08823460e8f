//! In-process event bus for playback updates.
//!
//! Provides a lightweight broadcast channel any front end can subscribe to.

use tokio::sync::broadcast;

use grouplike::NodeId;

/// Progress snapshot emitted by a player at its own cadence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackProgress {
    pub time_done_text: String,
    pub time_left_text: String,
    pub duration_text: String,
    pub percent_text: String,
    pub current_seconds: u64,
    pub total_seconds: u64,
}

/// Event payloads published by the queue and sequencer.
#[derive(Clone, Debug)]
pub enum HubEvent {
    QueueChanged,
    TrackStarted(NodeId),
    PlaybackStopped,
    Progress(PlaybackProgress),
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<HubEvent>,
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.sender.subscribe()
    }

    /// Notify subscribers that the queue has changed.
    pub fn queue_changed(&self) {
        let _ = self.sender.send(HubEvent::QueueChanged);
    }

    /// Notify subscribers that a track was handed to the player.
    pub fn track_started(&self, id: NodeId) {
        let _ = self.sender.send(HubEvent::TrackStarted(id));
    }

    /// Notify subscribers that playback went idle.
    pub fn playback_stopped(&self) {
        let _ = self.sender.send(HubEvent::PlaybackStopped);
    }

    /// Forward a player progress notification.
    pub fn progress(&self, progress: PlaybackProgress) {
        let _ = self.sender.send(HubEvent::Progress(progress));
    }
}
