// src/crawl/mod.rs
pub mod fetch;
pub mod pipeline;
pub mod scheduler;
pub mod types;

pub use pipeline::{Pipeline, ProcessSummary};
pub use scheduler::{run, RunReport, SourceOutcome};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the exposition).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_sources_total", "Sources picked up by a worker.");
        describe_counter!(
            "crawl_source_errors_total",
            "Sources that failed, labelled by pipeline stage."
        );
        describe_counter!("crawl_items_total", "Items assembled from pages.");
        describe_counter!(
            "crawl_items_dropped_total",
            "Mappings dropped for an empty title or uri."
        );
        describe_counter!(
            "crawl_items_inserted_total",
            "Items the store did not have yet."
        );
        describe_histogram!("crawl_source_ms", "Processing time per source in milliseconds.");
        describe_histogram!("crawl_fetch_ms", "HTTP fetch time in milliseconds.");
        describe_gauge!("crawl_last_run_ts", "Unix ts when the last crawl finished.");
    });
}
