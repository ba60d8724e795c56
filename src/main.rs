//! Crawler entrypoint.
//! Loads configuration, picks the stores, crawls every selected source once and reports.
//!
//! See `README.md` for configuration and source file format.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedme::config::CrawlerConfig;
use feedme::crawl::fetch::HttpFetcher;
use feedme::crawl::{run, Pipeline};
use feedme::metrics::Metrics;
use feedme::store::file::FileSourceStore;
use feedme::store::memory::MemoryStore;
use feedme::store::{ItemStore, SourceStore};

/// Compact logs; `RUST_LOG` wins over the verbose switch.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "crawl=info,store=info,transform=info,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

type Stores = (Arc<dyn SourceStore>, Arc<dyn ItemStore>);

#[cfg(feature = "postgres")]
async fn open_database(cfg: &CrawlerConfig) -> Result<Option<Stores>> {
    let Some(url) = cfg.database_url.as_deref() else {
        return Ok(None);
    };
    let pg = feedme::store::postgres::PostgresStore::connect(url, cfg.max_connections)
        .await
        .context("connecting to postgres")?;
    pg.ensure_schema().await.context("creating tables")?;
    let pg = Arc::new(pg);
    let sources: Arc<dyn SourceStore> = pg.clone();
    let items: Arc<dyn ItemStore> = pg;
    Ok(Some((sources, items)))
}

#[cfg(not(feature = "postgres"))]
async fn open_database(cfg: &CrawlerConfig) -> Result<Option<Stores>> {
    if cfg.database_url.is_some() {
        warn!("database_url is set but this build has no `postgres` feature; ignoring it");
    }
    Ok(None)
}

async fn open_stores(cfg: &CrawlerConfig) -> Result<Stores> {
    if let Some(stores) = open_database(cfg).await? {
        return Ok(stores);
    }

    let sources = FileSourceStore::load(&cfg.sources_path)
        .with_context(|| format!("loading sources from {}", cfg.sources_path.display()))?;
    warn!(
        path = %cfg.sources_path.display(),
        "no database configured: dry run, items are kept in memory only"
    );
    let sources: Arc<dyn SourceStore> = Arc::new(sources);
    let items: Arc<dyn ItemStore> = Arc::new(MemoryStore::new());
    Ok((sources, items))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env in local/dev; FEEDME_* variables may come from there.
    let _ = dotenvy::dotenv();

    let cfg = CrawlerConfig::load()?;
    cfg.validate()?;
    init_tracing(cfg.verbose);

    let metrics = match cfg.metrics_path {
        Some(_) => Some(Metrics::init()?),
        None => None,
    };

    let (source_store, item_store) = open_stores(&cfg).await?;
    let sources = source_store
        .list_sources(cfg.source_filter())
        .await
        .context("listing sources")?;
    for name in cfg.only.iter() {
        if !sources.iter().any(|s| &s.name == name) {
            warn!(source = %name, "requested source is not configured");
        }
    }

    let fetcher = HttpFetcher::new(cfg.fetch_timeout(), &cfg.user_agent)
        .context("building http client")?;
    let pipeline = Arc::new(Pipeline::new(Arc::new(fetcher), item_store));

    info!(target: "crawl", sources = sources.len(), workers = cfg.workers, "starting crawl");
    let report = run(pipeline, sources, cfg.workers).await;

    if let (Some(m), Some(path)) = (&metrics, cfg.metrics_path.as_deref()) {
        m.write_to(path)?;
    }

    if report.has_failures() {
        error!(
            target: "crawl",
            failed = ?report.failed_sources(),
            "some sources failed"
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
