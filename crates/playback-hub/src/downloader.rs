//! Source-reference resolution with a content cache.
//!
//! A downloader turns an opaque source ref into a locally playable file.
//! Resolvers are safe to call repeatedly with the same ref and reject on
//! unrecoverable failure rather than returning an empty path. The cache
//! wrapper keys fetched files by the base64 of the ref so a second resolve
//! reuses the file already on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Resolve `source_ref` to a local file path.
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf>;
}

/// Fetch an `http(s)://` ref into the staging directory.
pub struct HttpDownloader {
    client: reqwest::Client,
    staging_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            staging_dir,
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        let response = self
            .client
            .get(source_ref)
            .send()
            .await
            .with_context(|| format!("request {source_ref}"))?
            .error_for_status()
            .with_context(|| format!("fetch {source_ref}"))?;

        let dir = self.staging_dir.join(URL_SAFE_NO_PAD.encode(source_ref));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create staging dir {}", dir.display()))?;
        let out = dir.join(remote_file_name(source_ref));

        let mut file = tokio::fs::File::create(&out)
            .await
            .with_context(|| format!("create {}", out.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.with_context(|| format!("read body of {source_ref}"))?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("write {}", out.display()))?;
        }
        file.flush().await?;
        tracing::debug!(source_ref, file = %out.display(), "downloaded");
        Ok(out)
    }
}

/// Symlink a local path (optionally `file://`-prefixed) into the staging
/// directory instead of copying it.
pub struct LocalLinkDownloader {
    staging_dir: PathBuf,
}

impl LocalLinkDownloader {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self { staging_dir }
    }
}

#[async_trait]
impl Downloader for LocalLinkDownloader {
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        let source = strip_file_protocol(source_ref);
        let source = tokio::fs::canonicalize(&source)
            .await
            .with_context(|| format!("locate {source}"))?;
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("download")
            .to_string();

        let dir = self.staging_dir.join(URL_SAFE_NO_PAD.encode(source_ref));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create staging dir {}", dir.display()))?;
        let out = dir.join(file_name);
        match tokio::fs::symlink(&source, &out).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(err) => {
                return Err(err).with_context(|| format!("link {}", source.display()));
            }
        }
        Ok(out)
    }
}

/// Pass the ref through as a path, with no fetching or caching.
pub struct EchoDownloader;

#[async_trait]
impl Downloader for EchoDownloader {
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(source_ref))
    }
}

/// Reuse previously resolved files from a per-resolver cache directory.
///
/// A keyed directory holding a file means the ref was fetched before; the
/// single file inside is returned as-is. On a miss the base downloader
/// runs and its output is moved into the keyed directory.
pub struct Cached<D> {
    base: D,
    cache_dir: PathBuf,
}

impl<D> Cached<D> {
    pub fn new(base: D, cache_root: &Path, label: &str) -> Self {
        Self {
            base,
            cache_dir: cache_root.join(label),
        }
    }
}

#[async_trait]
impl<D: Downloader> Downloader for Cached<D> {
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        let keyed = self.cache_dir.join(URL_SAFE_NO_PAD.encode(source_ref));
        if let Some(cached) = first_file_in(&keyed).await? {
            tracing::debug!(source_ref, file = %cached.display(), "cache hit");
            return Ok(cached);
        }

        let fetched = self.base.resolve(source_ref).await?;
        let file_name = fetched
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "download".into());
        tokio::fs::create_dir_all(&keyed)
            .await
            .with_context(|| format!("create cache dir {}", keyed.display()))?;
        let out = keyed.join(file_name);
        tokio::fs::rename(&fetched, &out)
            .await
            .with_context(|| format!("move into cache {}", out.display()))?;
        Ok(out)
    }
}

/// Route each ref to the right resolver by scheme; playlists mix remote
/// and local entries freely.
pub struct AutoDownloader {
    http: Cached<HttpDownloader>,
    local: Cached<LocalLinkDownloader>,
}

impl AutoDownloader {
    pub fn new(cache_root: &Path) -> Self {
        let staging = cache_root.join("staging");
        Self {
            http: Cached::new(HttpDownloader::new(staging.clone()), cache_root, "http"),
            local: Cached::new(LocalLinkDownloader::new(staging), cache_root, "locallink"),
        }
    }
}

#[async_trait]
impl Downloader for AutoDownloader {
    async fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        if is_remote(source_ref) {
            self.http.resolve(source_ref).await
        } else {
            self.local.resolve(source_ref).await
        }
    }
}

fn is_remote(source_ref: &str) -> bool {
    source_ref.starts_with("http://") || source_ref.starts_with("https://")
}

fn strip_file_protocol(source_ref: &str) -> String {
    match source_ref.strip_prefix("file://") {
        Some(rest) => urlencoding::decode(rest)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| rest.to_string()),
        None => source_ref.to_string(),
    }
}

fn remote_file_name(source_ref: &str) -> String {
    let base = source_ref.rsplit('/').next().unwrap_or("");
    let base = base.split('?').next().unwrap_or(base);
    let decoded = urlencoding::decode(base)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| base.to_string());
    let cleaned: String = decoded
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();
    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

async fn first_file_in(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read cache dir {}", dir.display()));
        }
    };
    match entries.next_entry().await? {
        Some(entry) => Ok(Some(entry.path())),
        None => Ok(None),
    }
}
