//! Source lookup and item persistence.
//!
//! - `SourceStore`: where configured sources come from
//! - `ItemStore`: idempotent item insertion, plus reading back what a feed has
//!
//! `MemoryStore` implements both and backs tests and dry runs; `FileSourceStore` reads sources
//! from a TOML/JSON file; `PostgresStore` (feature `postgres`) implements both against the
//! `feeds`/`items` tables.

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::crawl::types::{Item, Source};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse sources file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("duplicate source name `{0}`")]
    DuplicateSource(String),

    #[error("source `{0}` is not stored")]
    UnknownSource(String),

    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Sources ordered by name; `filter` keeps only the named ones.
    async fn list_sources(&self, filter: Option<&[String]>) -> Result<Vec<Source>, StoreError>;

    async fn find_source(&self, name: &str) -> Result<Option<Source>, StoreError>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert the items `source` does not have yet, as one atomic batch.
    ///
    /// Returns how many were new; an item equal on (feed, title, uri, description) to a stored
    /// one is skipped silently.
    async fn insert_items(&self, source: &Source, items: &[Item]) -> Result<usize, StoreError>;

    /// Newest first.
    async fn recent_items(&self, feed: &str, limit: usize) -> Result<Vec<Item>, StoreError>;
}

/// Sort by name and apply an optional name filter.
pub fn filter_sources(
    sources: impl IntoIterator<Item = Source>,
    filter: Option<&[String]>,
) -> Vec<Source> {
    let mut out: Vec<Source> = sources
        .into_iter()
        .filter(|s| filter.map_or(true, |names| names.iter().any(|n| n == &s.name)))
        .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
