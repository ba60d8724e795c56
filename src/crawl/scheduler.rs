// src/crawl/scheduler.rs
use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::crawl::pipeline::{Pipeline, ProcessSummary};
use crate::crawl::types::Source;
use crate::error::{CrawlError, SourceError, Stage};

/// Result of one source in a run.
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: String,
    /// Worker that handled the source; `None` if no worker reported it.
    pub worker: Option<usize>,
    pub result: Result<ProcessSummary, SourceError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// One entry per source, sorted by source name.
    pub outcomes: Vec<SourceOutcome>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.result.is_err())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.failures().map(|o| o.source.as_str()).collect()
    }

    /// Items newly persisted across all sources.
    pub fn inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.inserted)
            .sum()
    }
}

/// Process `sources` with `workers` concurrent workers (at least one) and wait for all of them.
///
/// A failing source is logged and recorded in the report; it never stops a worker or the run.
pub async fn run(pipeline: Arc<Pipeline>, sources: Vec<Source>, workers: usize) -> RunReport {
    crate::crawl::ensure_metrics_described();

    let total = sources.len();
    if total == 0 {
        return RunReport::default();
    }
    let workers = workers.max(1);
    let names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();

    // Both channels hold every source, so neither side ever waits for room.
    let (queue_tx, queue_rx) = mpsc::channel::<Source>(total);
    let queue_rx = Arc::new(Mutex::new(queue_rx));
    let (done_tx, mut done_rx) = mpsc::channel::<SourceOutcome>(total);

    let mut pool = JoinSet::new();
    for id in 0..workers {
        pool.spawn(worker(
            id,
            Arc::clone(&queue_rx),
            done_tx.clone(),
            Arc::clone(&pipeline),
        ));
    }
    drop(done_tx);

    for source in sources {
        if queue_tx.send(source).await.is_err() {
            break;
        }
    }
    drop(queue_tx);

    let mut outcomes = Vec::with_capacity(total);
    while outcomes.len() < total {
        match done_rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            // every worker is gone
            None => break,
        }
    }

    while let Some(res) = pool.join_next().await {
        if let Err(e) = res {
            error!(target: "crawl", error = %e, "worker aborted");
        }
    }

    if outcomes.len() < total {
        let reported: HashSet<String> = outcomes.iter().map(|o| o.source.clone()).collect();
        for name in names.into_iter().filter(|n| !reported.contains(n)) {
            warn!(target: "crawl", source = %name, "source never reported");
            counter!("crawl_source_errors_total", "stage" => Stage::Worker.as_str()).increment(1);
            let err = SourceError::new(&name, Stage::Worker, CrawlError::WorkerAborted);
            outcomes.push(SourceOutcome {
                source: name,
                worker: None,
                result: Err(err),
            });
        }
    }

    outcomes.sort_by(|a, b| a.source.cmp(&b.source));
    let report = RunReport { outcomes };

    gauge!("crawl_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    info!(
        target: "crawl",
        sources = total,
        failed = report.failures().count(),
        inserted = report.inserted(),
        "crawl finished"
    );
    report
}

async fn worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Source>>>,
    done: mpsc::Sender<SourceOutcome>,
    pipeline: Arc<Pipeline>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(source) = next else {
            break;
        };

        info!(target: "crawl", worker = id, source = %source.name, url = %source.url, "processing source");
        counter!("crawl_sources_total").increment(1);

        let result = pipeline.process(&source).await;
        match &result {
            Ok(s) => info!(
                target: "crawl",
                worker = id,
                source = %source.name,
                items = s.items,
                inserted = s.inserted,
                dropped = s.dropped,
                "source done"
            ),
            Err(e) => {
                counter!("crawl_source_errors_total", "stage" => e.stage.as_str()).increment(1);
                error!(
                    target: "crawl",
                    worker = id,
                    source = %source.name,
                    stage = %e.stage,
                    error = %e.error,
                    "source failed"
                );
            }
        }

        let outcome = SourceOutcome {
            source: source.name,
            worker: Some(id),
            result,
        };
        if done.send(outcome).await.is_err() {
            break;
        }
    }
    debug!(target: "crawl", worker = id, "worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::fetch::StaticFetcher;
    use crate::crawl::types::PageFetcher;
    use crate::store::memory::MemoryStore;

    /// Serves a one-item list, except for URLs containing `bad`, where it panics.
    struct PanicsOn {
        bad: &'static str,
    }

    #[async_trait::async_trait]
    impl PageFetcher for PanicsOn {
        async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
            if url.contains(self.bad) {
                panic!("fetcher blew up on {url}");
            }
            Ok("<ul><li>x</li></ul>".to_string())
        }

        fn name(&self) -> &'static str {
            "panics"
        }
    }

    fn src(name: &str, transform: &str) -> Source {
        Source {
            name: name.into(),
            url: format!("http://{name}.test/"),
            transform: transform.into(),
        }
    }

    #[tokio::test]
    async fn empty_run_reports_nothing() {
        let store = Arc::new(MemoryStore::new());
        let p = Arc::new(Pipeline::new(Arc::new(StaticFetcher::new()), store));
        let report = run(p, Vec::new(), 4).await;
        assert!(report.outcomes.is_empty());
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn panicked_worker_marks_its_source_failed() {
        let list = r#"{"items": [{"search": "li", "do": [{"text": true, "do": [
            {"copy": true, "name": "t", "type": "string"}]}]}],
            "transform": {"title": "{{t}}", "uri": "/{{t}}"}}"#;
        let store = Arc::new(MemoryStore::new());
        let p = Arc::new(Pipeline::new(Arc::new(PanicsOn { bad: "a.test" }), store.clone()));

        let sources = vec![src("a", list), src("b", list), src("c", list)];
        let report = run(p, sources, 2).await;

        assert_eq!(report.outcomes.len(), 3);
        let a = &report.outcomes[0];
        assert_eq!(a.source, "a");
        assert_eq!(a.worker, None);
        let err = a.result.as_ref().unwrap_err();
        assert_eq!(err.stage, Stage::Worker);
        assert!(matches!(err.error, CrawlError::WorkerAborted));

        for ok in &report.outcomes[1..] {
            assert!(ok.worker.is_some(), "{}", ok.source);
            assert_eq!(ok.result.as_ref().unwrap().inserted, 1, "{}", ok.source);
        }
        assert_eq!(report.failed_sources(), vec!["a"]);
        assert_eq!(store.item_count(), 2);
    }

    #[tokio::test]
    async fn zero_workers_still_runs_every_source() {
        let ok = r#"{"items": [], "transform": {}}"#;
        let fetcher = StaticFetcher::new()
            .with_page("http://a.test/", "<p/>")
            .with_page("http://b.test/", "<p/>");
        let store = Arc::new(MemoryStore::new());
        let p = Arc::new(Pipeline::new(Arc::new(fetcher), store));

        let report = run(p, vec![src("b", ok), src("a", ok)], 0).await;
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].source, "a");
        assert_eq!(report.outcomes[0].worker, Some(0));
        assert!(!report.has_failures());
    }
}
