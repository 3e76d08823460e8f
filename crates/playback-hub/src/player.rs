//! Player processes: spawning, progress parsing, and control.
//!
//! The mpv player drives an external `mpv` process per track, parses its
//! stderr status line into progress events, and, when a control FIFO could
//! be created, forwards seek/pause commands through it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

use crate::events::{EventBus, PlaybackProgress};

#[async_trait]
pub trait Player: Send + Sync {
    /// Play one file; resolves when playback ends for any reason.
    async fn play_file(&self, path: &Path) -> Result<()>;
    /// Terminate the current playback session, if any.
    async fn kill(&self);
    async fn seek_ahead(&self, seconds: f64);
    async fn seek_back(&self, seconds: f64);
    async fn toggle_pause(&self);
}

pub struct MpvPlayer {
    events: EventBus,
    control_fifo: Option<PathBuf>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl MpvPlayer {
    /// Create an mpv-backed player. The control FIFO lives under
    /// `control_dir`; without `mkfifo` the player still works, minus
    /// seek/pause.
    pub async fn new(events: EventBus, control_dir: &Path) -> Result<Self> {
        let control_fifo = match make_control_fifo(control_dir).await {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "mpv running without a control fifo");
                None
            }
        };
        Ok(Self {
            events,
            control_fifo,
            kill_tx: Mutex::new(None),
        })
    }

    async fn send_command(&self, command: &str) {
        let Some(fifo) = &self.control_fifo else {
            return;
        };
        if self.kill_tx.lock().unwrap().is_none() {
            // Nothing is reading the fifo; writing would block forever.
            return;
        }
        match tokio::fs::OpenOptions::new().write(true).open(fifo).await {
            Ok(mut file) => {
                if let Err(err) = file.write_all(format!("{command}\n").as_bytes()).await {
                    tracing::warn!(command, error = %err, "mpv control write failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "mpv control fifo unavailable"),
        }
    }
}

#[async_trait]
impl Player for MpvPlayer {
    async fn play_file(&self, path: &Path) -> Result<()> {
        let mut command = Command::new("mpv");
        if let Some(fifo) = &self.control_fifo {
            command.arg(format!("--input-file={}", fifo.display()));
        }
        command
            .arg("--no-audio-display")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().context("spawn mpv")?;

        if let Some(stderr) = child.stderr.take() {
            let events = self.events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(progress) = parse_status_line(&line) {
                        events.progress(progress);
                    }
                }
            });
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        *self.kill_tx.lock().unwrap() = Some(kill_tx);

        let outcome = tokio::select! {
            status = child.wait() => {
                let status = status.context("wait for mpv")?;
                if status.success() {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("mpv exited with {status}"))
                }
            }
            _ = kill_rx => {
                child.start_kill().ok();
                let _ = child.wait().await;
                Ok(())
            }
        };

        self.kill_tx.lock().unwrap().take();
        outcome
    }

    async fn kill(&self) {
        if let Some(kill_tx) = self.kill_tx.lock().unwrap().take() {
            let _ = kill_tx.send(());
        }
    }

    async fn seek_ahead(&self, seconds: f64) {
        self.send_command(&format!("seek +{seconds}")).await;
    }

    async fn seek_back(&self, seconds: f64) {
        self.send_command(&format!("seek -{seconds}")).await;
    }

    async fn toggle_pause(&self) {
        self.send_command("cycle pause").await;
    }
}

/// Detect an available player binary; mpv is the only backend.
pub async fn detect_player(events: &EventBus, control_dir: &Path) -> Option<Arc<dyn Player>> {
    if command_exists("mpv").await {
        match MpvPlayer::new(events.clone(), control_dir).await {
            Ok(player) => return Some(Arc::new(player)),
            Err(err) => tracing::warn!(error = %err, "mpv detected but unusable"),
        }
    }
    None
}

async fn command_exists(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn make_control_fifo(control_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(control_dir)
        .await
        .with_context(|| format!("create control dir {}", control_dir.display()))?;
    let path = control_dir.join("mpv-control.fifo");
    let _ = tokio::fs::remove_file(&path).await;
    let status = Command::new("mkfifo")
        .arg(&path)
        .status()
        .await
        .context("run mkfifo")?;
    anyhow::ensure!(status.success(), "mkfifo exited with {status}");
    Ok(path)
}

/// Parse mpv's `00:01:02 / 00:03:04 (33%)` status line.
fn parse_status_line(line: &str) -> Option<PlaybackProgress> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(\d+):(\d+):(\d+) / (\d+):(\d+):(\d+) \(\d+%\)")
            .expect("status line pattern")
    });
    let caps = pattern.captures(line)?;
    let field = |at: usize| caps.get(at)?.as_str().parse::<u64>().ok();
    let current = 3600 * field(1)? + 60 * field(2)? + field(3)?;
    let total = 3600 * field(4)? + 60 * field(5)? + field(6)?;
    Some(time_strings(current, total))
}

/// Render elapsed/remaining/duration display strings; the hour field is
/// omitted when the whole track is shorter than an hour.
pub(crate) fn time_strings(current_seconds: u64, total_seconds: u64) -> PlaybackProgress {
    let left_seconds = total_seconds.saturating_sub(current_seconds);
    let percent = if total_seconds == 0 {
        0.0
    } else {
        current_seconds as f64 * 100.0 / total_seconds as f64
    };
    let percent_text = format!("{:.2}%", (percent * 100.0).trunc() / 100.0);
    let with_hours = total_seconds >= 3600;
    let render = |seconds: u64| -> String {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        let rest = seconds % 60;
        if with_hours {
            format!("{hours}:{minutes:02}:{rest:02}")
        } else {
            format!("{minutes:02}:{rest:02}")
        }
    };
    PlaybackProgress {
        time_done_text: render(current_seconds),
        time_left_text: render(left_seconds),
        duration_text: render(total_seconds),
        percent_text,
        current_seconds,
        total_seconds,
    }
}
