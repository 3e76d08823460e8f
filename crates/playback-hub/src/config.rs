//! Configuration loading and parsing.
//!
//! Defines the hub config schema and resolves defaults. The cache
//! directory is always explicit here; nothing reads ambient process state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crawler::DEFAULT_EXTENSIONS;

/// Top-level hub configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct HubConfig {
    /// Root directory for downloaded/cached media.
    pub cache_dir: Option<PathBuf>,
    /// Seconds moved per seek command.
    pub seek_seconds: Option<f64>,
    /// File extensions recognized when crawling directories.
    pub extensions: Option<Vec<String>>,
}

/// Resolved configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct HubConfigResolved {
    pub cache_dir: PathBuf,
    pub seek_seconds: f64,
    pub extensions: Vec<String>,
}

impl HubConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<HubConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }

    /// Apply defaults to missing fields.
    pub fn resolve(self) -> HubConfigResolved {
        HubConfigResolved {
            cache_dir: self
                .cache_dir
                .unwrap_or_else(|| PathBuf::from(".playback-hub/cache")),
            seek_seconds: self.seek_seconds.unwrap_or(5.0),
            extensions: self.extensions.unwrap_or_else(|| {
                DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let resolved = HubConfig::default().resolve();
        assert_eq!(resolved.cache_dir, PathBuf::from(".playback-hub/cache"));
        assert_eq!(resolved.seek_seconds, 5.0);
        assert!(resolved.extensions.contains(&"mp3".to_string()));
    }

    #[test]
    fn config_values_override_defaults() {
        let cfg: HubConfig = toml::from_str(
            r#"
            cache_dir = "/tmp/media"
            seek_seconds = 10.0
            extensions = ["flac"]
            "#,
        )
        .unwrap();
        let resolved = cfg.resolve();
        assert_eq!(resolved.cache_dir, PathBuf::from("/tmp/media"));
        assert_eq!(resolved.seek_seconds, 10.0);
        assert_eq!(resolved.extensions, vec!["flac".to_string()]);
    }
}
