// src/lib.rs
// Crawler library: transform interpreter, worker pool and stores. The binary in main.rs wires
// them to the configured backends.

pub mod config;
pub mod crawl;
pub mod error;
pub mod metrics;
pub mod store;
pub mod transform;

// ---- Re-exports for stable public API ----
pub use crate::crawl::types::{Item, PageFetcher, Source};
pub use crate::crawl::{run, Pipeline, ProcessSummary, RunReport, SourceOutcome};
pub use crate::error::{ConfigError, CrawlError, ExtractError, SourceError, Stage};
pub use crate::store::{ItemStore, SourceStore, StoreError};
pub use crate::transform::TransformDocument;
