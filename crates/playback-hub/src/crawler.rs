//! Building raw playlists from the outside world.
//!
//! Crawlers produce the raw grouplike value that normalization turns into
//! a canonical tree; they never build tree nodes themselves.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Produces a raw grouplike value for normalization.
#[async_trait]
pub trait Crawler: Send + Sync {
    async fn crawl(&self) -> Result<Value>;
}

/// Extensions recognized by default when crawling a directory.
pub const DEFAULT_EXTENSIONS: [&str; 8] = ["ogg", "oga", "wav", "mp3", "mp4", "m4a", "aac", "mod"];

/// Walks a directory tree: one group per directory, one track per file
/// with a recognized extension. Track names drop the extension, since a
/// hand-written playlist would not carry them either.
pub struct LocalCrawler {
    root: PathBuf,
    extensions: Vec<String>,
}

impl LocalCrawler {
    pub fn new(root: PathBuf, extensions: Vec<String>) -> Self {
        Self { root, extensions }
    }
}

#[async_trait]
impl Crawler for LocalCrawler {
    async fn crawl(&self) -> Result<Value> {
        tracing::info!(root = %self.root.display(), "crawling directory");
        crawl_dir(&self.root, &self.extensions)
    }
}

fn crawl_dir(dir: &Path, extensions: &[String]) -> Result<Value> {
    let mut entries: Vec<(String, PathBuf, bool)> = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read dir {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        entries.push((name, entry.path(), file_type.is_dir()));
    }
    entries.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

    let mut children = Vec::new();
    for (name, path, is_dir) in entries {
        if is_dir {
            let group = crawl_dir(&path, extensions)?;
            let mut fields = group.as_object().cloned().unwrap_or_default();
            fields.insert("name".into(), Value::String(name));
            children.push(Value::Object(fields));
        } else {
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            if !extensions.iter().any(|wanted| *wanted == extension) {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(&name)
                .to_string();
            children.push(json!({
                "name": stem,
                "sourceRef": path.to_string_lossy(),
            }));
        }
    }
    Ok(json!({ "children": children }))
}

/// Read an already-crawled playlist from a local path or an http(s) URL.
pub async fn open_playlist(source: &str) -> Result<Value> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(source)
            .await
            .with_context(|| format!("request {source}"))?
            .error_for_status()
            .with_context(|| format!("fetch {source}"))?
            .text()
            .await
            .with_context(|| format!("read {source}"))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("read {source}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("parse playlist {source}"))
}
