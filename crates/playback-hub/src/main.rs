use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use grouplike::{RecordStore, normalize};

use playback_hub::config::HubConfig;
use playback_hub::crawler::{Crawler, LocalCrawler, open_playlist};
use playback_hub::downloader::AutoDownloader;
use playback_hub::events::{EventBus, HubEvent};
use playback_hub::playback_manager::PlaybackManager;
use playback_hub::player::detect_player;
use playback_hub::queue_service::{EnqueuePosition, QueueService};

#[derive(Parser, Debug)]
#[command(name = "playback-hub")]
struct Args {
    /// Playlist file path or URL (pre-crawled JSON)
    playlist: Option<String>,

    /// Crawl a local directory instead of opening a playlist
    #[arg(long)]
    crawl: Option<PathBuf>,

    /// Play only the entries under this group path (e.g. "albums/Foo")
    #[arg(long)]
    path: Option<String>,

    /// Optional hub config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,playback_hub=info")
        }))
        .init();

    let cfg = match args.config.as_ref() {
        Some(path) => HubConfig::load(path)?,
        None => HubConfig::default(),
    }
    .resolve();

    let raw = if let Some(dir) = args.crawl {
        LocalCrawler::new(dir, cfg.extensions.clone()).crawl().await?
    } else if let Some(source) = args.playlist.as_ref() {
        open_playlist(source).await?
    } else {
        return Err(anyhow::anyhow!("pass a playlist file/URL or --crawl <dir>"));
    };

    let playlist = normalize(&raw)?;
    let root = playlist.root();
    tracing::info!(entries = playlist.len(), "playlist loaded");
    tracing::debug!("tree:\n{}", playlist.tree_string(root, true));

    let start = match args.path.as_deref() {
        Some(path) => {
            let found = playlist.resolve_path(root, &grouplike::parse_path(path));
            if let Some(segment) = found.unmatched.as_deref() {
                tracing::warn!(path, segment, "partial match, starting from nearest group");
            }
            found.entry
        }
        None => root,
    };

    let events = EventBus::new();
    let player = detect_player(&events, &cfg.cache_dir).await;
    if player.is_none() {
        tracing::warn!("no player binary found; playback will fail");
    }

    let queue = QueueService::new(events.clone());
    let manager = PlaybackManager::new(
        Arc::new(Mutex::new(playlist)),
        queue.clone(),
        RecordStore::new(),
        Arc::new(AutoDownloader::new(&cfg.cache_dir)),
        player,
        events.clone(),
    );

    {
        let playlist = manager.playlist().lock().unwrap();
        queue.enqueue(&playlist, start, EnqueuePosition::End);
    }

    let mut updates = events.subscribe();
    let monitor = {
        let manager = manager.clone();
        tokio::spawn(async move {
            while let Ok(event) = updates.recv().await {
                match event {
                    HubEvent::TrackStarted(id) => {
                        let path = {
                            let playlist = manager.playlist().lock().unwrap();
                            playlist.item_path_string(id)
                        };
                        tracing::info!(track = %path, "playing");
                    }
                    HubEvent::Progress(progress) => {
                        tracing::debug!(
                            done = %progress.time_done_text,
                            left = %progress.time_left_text,
                            "progress"
                        );
                    }
                    HubEvent::PlaybackStopped | HubEvent::QueueChanged => {}
                }
            }
        })
    };

    let Some(first) = queue.items().first().copied() else {
        tracing::warn!("playlist has no tracks to play");
        return Ok(());
    };
    manager.play(first, false).await?;
    tracing::info!("end of playlist");
    monitor.abort();
    Ok(())
}
