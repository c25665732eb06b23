// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One feed entry as extracted from the wire, before normalization.
/// Every field is optional; the normalizer owns all fallback policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawItem {
    pub guid: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    /// Full body (`content:encoded` in RSS), HTML kept as-is.
    pub content: Option<String>,
    pub description: Option<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed into raw items, newest-first as published.
    /// No retries here; the poll loop absorbs failures.
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}
