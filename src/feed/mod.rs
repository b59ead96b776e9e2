use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::RawFeed;
use crate::logging::log_metadata_fallback;
use crate::state::Config;

mod http;

pub use http::HttpFeedSource;

/// Side-channel describing the feed as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<String>,
}

#[async_trait]
pub trait FeedSource {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;

    async fn fetch_feed(&self) -> Result<RawFeed>;

    /// `Ok(None)` when no metadata location is configured.
    async fn fetch_metadata(&self) -> Result<Option<Metadata>>;
}

/// Metadata never fails a load; any error degrades to the default.
pub async fn fetch_metadata_or_default(source: &(dyn FeedSource + Send + Sync)) -> Metadata {
    match source.fetch_metadata().await {
        Ok(meta) => meta.unwrap_or_default(),
        Err(e) => {
            log_metadata_fallback(&source.describe(), &e.to_string());
            Metadata::default()
        }
    }
}

/// Reads the feed and metadata from local files.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    feed_path: PathBuf,
    metadata_path: Option<PathBuf>,
}

impl FileFeedSource {
    pub fn new(feed_path: impl Into<PathBuf>, metadata_path: Option<PathBuf>) -> Self {
        Self {
            feed_path: feed_path.into(),
            metadata_path,
        }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    fn describe(&self) -> String {
        self.feed_path.display().to_string()
    }

    async fn fetch_feed(&self) -> Result<RawFeed> {
        let bytes = tokio::fs::read(&self.feed_path)
            .await
            .with_context(|| format!("read feed {}", self.feed_path.display()))?;
        RawFeed::from_slice(&bytes).context("feed is not a JSON array of rows")
    }

    async fn fetch_metadata(&self) -> Result<Option<Metadata>> {
        let Some(path) = &self.metadata_path else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read metadata {}", path.display()))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    File,
}

impl SourceKind {
    pub fn detect(location: &str) -> Self {
        match url::Url::parse(location) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => SourceKind::Http,
            _ => SourceKind::File,
        }
    }
}

/// Pick a source for the configured locations.
pub fn source_for(cfg: &Config) -> Result<Box<dyn FeedSource + Send + Sync>> {
    match SourceKind::detect(&cfg.data_url) {
        SourceKind::Http => Ok(Box::new(HttpFeedSource::new(
            &cfg.data_url,
            cfg.metadata_url.as_deref(),
            cfg.fetch_timeout_secs,
        )?)),
        SourceKind::File => {
            let feed_path = cfg
                .data_url
                .strip_prefix("file://")
                .unwrap_or(&cfg.data_url);
            if feed_path.trim().is_empty() {
                return Err(anyhow!("empty data location"));
            }
            let metadata_path = cfg
                .metadata_url
                .as_deref()
                .map(|m| PathBuf::from(m.strip_prefix("file://").unwrap_or(m)));
            Ok(Box::new(FileFeedSource::new(feed_path, metadata_path)))
        }
    }
}
