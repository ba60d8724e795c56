// tests/metrics.rs
// Installs the process-wide recorder, so it lives in its own test binary.
use std::sync::Arc;

use feedme::crawl::fetch::StaticFetcher;
use feedme::metrics::Metrics;
use feedme::store::memory::MemoryStore;
use feedme::{run, Pipeline, Source};

#[tokio::test]
async fn crawl_series_are_exported() {
    let metrics = Metrics::init().expect("recorder installs once");

    let transform = r#"{"items": [{"search": "li", "do": [{"text": true, "do": [
        {"copy": true, "name": "t", "type": "string"}]}]}],
        "transform": {"title": "{{t}}", "uri": "/{{t}}"}}"#;
    let sources = vec![
        Source {
            name: "up".into(),
            url: "http://up.test/".into(),
            transform: transform.into(),
        },
        Source {
            name: "down".into(),
            url: "http://down.test/".into(),
            transform: transform.into(),
        },
    ];
    let fetcher = StaticFetcher::new().with_page("http://up.test/", "<ul><li>x</li></ul>");
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(fetcher),
        Arc::new(MemoryStore::new()),
    ));
    let report = run(pipeline, sources, 2).await;
    assert_eq!(report.failed_sources(), vec!["down"]);

    let text = metrics.render();
    for needle in [
        "crawl_sources_total",
        "crawl_items_total",
        "crawl_items_inserted_total",
        "crawl_source_errors_total{stage=\"fetch\"}",
        "crawl_last_run_ts",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/crawl.prom");
    metrics.write_to(&path).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("crawl_items_inserted_total"));
}
