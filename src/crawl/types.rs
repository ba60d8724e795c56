// src/crawl/types.rs
use chrono::{DateTime, Utc};

use crate::error::CrawlError;

/// One configured page to crawl.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub url: String,
    /// Transform document as stored; parsed on every run.
    pub transform: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Item {
    pub feed: String,
    pub title: String,
    pub uri: String,
    pub description: String,
    /// Set by the item store on insert.
    pub created: Option<DateTime<Utc>>,
}

impl Item {
    /// Items with the same key are the same item.
    pub fn dedup_key(&self) -> (&str, &str, &str, &str) {
        (&self.feed, &self.title, &self.uri, &self.description)
    }
}

/// Supplies page content for a URL.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError>;
    fn name(&self) -> &'static str;
}
