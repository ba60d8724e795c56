//! Per-source processing: transform → templates → fetch → extract → assemble → persist.
//!
//! Every failure comes back as a `SourceError` naming the stage, so the scheduler can report a
//! misconfigured source and move on.

use std::sync::Arc;

use metrics::{counter, histogram};
use tracing::info;

use crate::crawl::types::{PageFetcher, Source};
use crate::error::{CrawlError, SourceError, Stage};
use crate::store::ItemStore;
use crate::transform::assemble::{default_date, Assembler};
use crate::transform::{FieldTemplates, TransformDocument};

/// What one successful `process` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Field-mappings produced by the transform.
    pub mappings: usize,
    /// Items handed to the store.
    pub items: usize,
    /// Mappings dropped for an empty title or uri.
    pub dropped: usize,
    /// Items the store did not already have.
    pub inserted: usize,
}

pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    items: Arc<dyn ItemStore>,
    date: fn() -> String,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, items: Arc<dyn ItemStore>) -> Self {
        Self {
            fetcher,
            items,
            date: default_date,
        }
    }

    /// Replace the `date` defaulting function (tests pin it).
    pub fn with_date(mut self, date: fn() -> String) -> Self {
        self.date = date;
        self
    }

    pub async fn process(&self, source: &Source) -> Result<ProcessSummary, SourceError> {
        let t0 = std::time::Instant::now();

        let doc =
            TransformDocument::parse(&source.transform).map_err(at(source, Stage::Transform))?;
        let templates =
            FieldTemplates::compile(&doc.templates).map_err(at(source, Stage::Templates))?;

        info!(
            target: "crawl",
            source = %source.name,
            url = %source.url,
            fetcher = self.fetcher.name(),
            "fetch source"
        );
        let body = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(at(source, Stage::Fetch))?;

        let mappings = doc.extract(&body).map_err(at(source, Stage::Extract))?;
        let found = mappings.len();

        let (items, dropped) = Assembler::new(&templates)
            .with_date(self.date)
            .assemble(&source.name, mappings);
        for item in &items {
            info!(
                target: "crawl",
                source = %source.name,
                title = %item.title,
                uri = %item.uri,
                "found item"
            );
        }

        let inserted = self
            .items
            .insert_items(source, &items)
            .await
            .map_err(at(source, Stage::Persist))?;

        counter!("crawl_items_total").increment(items.len() as u64);
        counter!("crawl_items_dropped_total").increment(dropped as u64);
        counter!("crawl_items_inserted_total").increment(inserted as u64);
        histogram!("crawl_source_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        Ok(ProcessSummary {
            mappings: found,
            items: items.len(),
            dropped,
            inserted,
        })
    }
}

fn at<'a, E: Into<CrawlError>>(
    source: &'a Source,
    stage: Stage,
) -> impl FnOnce(E) -> SourceError + 'a {
    move |e| SourceError::new(&source.name, stage, e)
}
