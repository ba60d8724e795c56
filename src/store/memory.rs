//! In-memory sources and items for tests and dry runs. Nothing survives a restart.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::crawl::types::{Item, Source};
use crate::store::{filter_sources, ItemStore, SourceStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sources: RwLock<BTreeMap<String, Source>>,
    items: Mutex<Vec<Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: impl IntoIterator<Item = Source>) -> Self {
        let store = Self::new();
        for s in sources {
            store.add_source(s);
        }
        store
    }

    /// Insert or replace a source by name.
    pub fn add_source(&self, source: Source) {
        self.sources
            .write()
            .expect("sources lock poisoned")
            .insert(source.name.clone(), source);
    }

    /// All stored items in insertion order.
    pub fn items(&self) -> Vec<Item> {
        self.items.lock().expect("items lock poisoned").clone()
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().expect("items lock poisoned").len()
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn list_sources(&self, filter: Option<&[String]>) -> Result<Vec<Source>, StoreError> {
        let sources = self.sources.read().expect("sources lock poisoned");
        Ok(filter_sources(sources.values().cloned(), filter))
    }

    async fn find_source(&self, name: &str) -> Result<Option<Source>, StoreError> {
        Ok(self
            .sources
            .read()
            .expect("sources lock poisoned")
            .get(name)
            .cloned())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn insert_items(&self, _source: &Source, items: &[Item]) -> Result<usize, StoreError> {
        // One lock for the whole batch keeps it atomic.
        let mut stored = self.items.lock().expect("items lock poisoned");
        let now = chrono::Utc::now();
        let mut inserted = 0usize;

        for item in items {
            if stored.iter().any(|s| s.dedup_key() == item.dedup_key()) {
                continue;
            }
            stored.push(Item {
                created: Some(now),
                ..item.clone()
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn recent_items(&self, feed: &str, limit: usize) -> Result<Vec<Item>, StoreError> {
        let stored = self.items.lock().expect("items lock poisoned");
        let mut out: Vec<Item> = stored
            .iter()
            .rev()
            .filter(|i| i.feed == feed)
            .take(limit)
            .cloned()
            .collect();
        // insertion order already breaks ties between equal timestamps
        out.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(out)
    }
}
