use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{FeedSource, Metadata};
use crate::data::RawFeed;

/// Fetches the feed over HTTP(S). No retries; a failed load is re-triggered
/// by the caller.
pub struct HttpFeedSource {
    client: Client,
    data_url: String,
    metadata_url: Option<String>,
}

impl HttpFeedSource {
    pub fn new(data_url: &str, metadata_url: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let base = url::Url::parse(data_url)?;
        // Relative metadata locations resolve against the feed URL.
        let metadata_url = metadata_url
            .map(|m| base.join(m).map(|u| u.to_string()))
            .transpose()?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            data_url: data_url.to_string(),
            metadata_url,
        })
    }

    pub fn metadata_url(&self) -> Option<&str> {
        self.metadata_url.as_deref()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn describe(&self) -> String {
        self.data_url.clone()
    }

    async fn fetch_feed(&self) -> Result<RawFeed> {
        let resp = self.client.get(&self.data_url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("network response was not ok: {}", resp.status()));
        }
        Ok(resp.json::<RawFeed>().await?)
    }

    async fn fetch_metadata(&self) -> Result<Option<Metadata>> {
        let Some(url) = &self.metadata_url else {
            return Ok(None);
        };
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("metadata unavailable: {}", resp.status()));
        }
        Ok(Some(resp.json::<Metadata>().await?))
    }
}
