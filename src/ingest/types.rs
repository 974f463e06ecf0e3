// src/ingest/types.rs
use anyhow::Result;

/// One feed entry as the feed lists it, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in feed order (newest first for well-behaved feeds).
    async fn fetch_entries(&self) -> Result<Vec<RawEntry>>;
    /// Short source name stored on every record from this feed.
    fn name(&self) -> &str;
}
