// src/ingest/config.rs
use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::FeedConfig;
use crate::ingest::providers::rss::RssFeed;
use crate::ingest::types::FeedSource;

/// Build HTTP-backed feed providers sharing one client.
pub fn build_feeds(feeds: &[FeedConfig]) -> Result<Vec<Box<dyn FeedSource>>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("gpu-signal-tracker/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building feed http client")?;

    Ok(clean_feeds(feeds)
        .into_iter()
        .map(|f| Box::new(RssFeed::from_url(&f.name, &f.url, client.clone())) as Box<dyn FeedSource>)
        .collect())
}

/// Trim names/urls, drop entries missing either, and drop repeated urls.
pub fn clean_feeds(feeds: &[FeedConfig]) -> Vec<FeedConfig> {
    let mut out: Vec<FeedConfig> = Vec::with_capacity(feeds.len());
    for f in feeds {
        let name = f.name.trim();
        let url = f.url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        if out.iter().any(|o| o.url == url) {
            continue;
        }
        out.push(FeedConfig {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    out
}
