use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;

use crate::crawl::types::PageFetcher;
use crate::error::CrawlError;

/// Fetches pages over HTTP. Non-2xx responses are transport errors.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CrawlError::transport(url, e))?;
        let body = resp
            .text()
            .await
            .map_err(|e| CrawlError::transport(url, e))?;

        histogram!("crawl_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Serves fixed page bodies by URL. Unknown URLs fail like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::transport(url, "no such page"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
