//! Playback hub: the ordered queue and download-then-play sequencer over a
//! grouplike playlist, plus the collaborators the sequencer drives — the
//! downloader cache, the mpv player, and the crawlers that produce raw
//! playlists.
//!
//! A front end consumes this crate through [`playback_manager::PlaybackManager`]
//! and the [`events::EventBus`]; the bundled binary is a headless driver
//! that plays a playlist front to back.

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod events;
pub mod playback_manager;
pub mod player;
pub mod queue_service;
