// src/config/crawler.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/crawler.toml";
pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

pub const ENV_CONFIG_PATH: &str = "FEEDME_CONFIG";
pub const ENV_WORKERS: &str = "FEEDME_WORKERS";
pub const ENV_VERBOSE: &str = "FEEDME_VERBOSE";
pub const ENV_SOURCES: &str = "FEEDME_SOURCES";
pub const ENV_SOURCES_PATH: &str = "FEEDME_SOURCES_PATH";
pub const ENV_DATABASE_URL: &str = "FEEDME_DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Concurrent workers; values below 1 are raised to 1.
    pub workers: usize,
    /// Log what is going on (info level) instead of warnings only.
    pub verbose: bool,
    /// TOML/JSON file with sources, used when no database is configured.
    pub sources_path: PathBuf,
    /// Crawl only these sources (all when empty).
    pub only: Vec<String>,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Write Prometheus text exposition here after the run.
    pub metrics_path: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            verbose: false,
            sources_path: PathBuf::from(DEFAULT_SOURCES_PATH),
            only: Vec::new(),
            database_url: None,
            max_connections: 10,
            fetch_timeout_secs: 30,
            user_agent: concat!("feedme-crawler/", env!("CARGO_PKG_VERSION")).to_string(),
            metrics_path: None,
        }
    }
}

impl CrawlerConfig {
    /// Load from a TOML or JSON file (chosen by extension).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading crawler config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let mut cfg: CrawlerConfig = if is_json {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?
        };
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $FEEDME_CONFIG (must exist)
    /// 2) config/crawler.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(Path::new(DEFAULT_CONFIG_PATH))?
        } else {
            Self::default()
        };

        cfg.apply_env_from(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Apply `FEEDME_*` overrides read through `get`.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get(ENV_WORKERS) {
            self.workers = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_WORKERS} must be a number, got {v:?}"))?;
        }
        if let Some(v) = get(ENV_VERBOSE) {
            self.verbose = parse_flag(&v);
        }
        if let Some(v) = get(ENV_SOURCES) {
            self.only = v.split(',').map(str::to_string).collect();
        }
        if let Some(v) = get(ENV_SOURCES_PATH) {
            self.sources_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_DATABASE_URL) {
            self.database_url = Some(v).filter(|s| !s.trim().is_empty());
        }
        self.sanitize();
        Ok(())
    }

    pub fn source_filter(&self) -> Option<&[String]> {
        if self.only.is_empty() {
            None
        } else {
            Some(&self.only)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        if self.user_agent.trim().is_empty() {
            bail!("user_agent must not be empty");
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        self.workers = self.workers.max(1);
        self.max_connections = self.max_connections.max(1);

        let mut seen = std::collections::BTreeSet::new();
        self.only = std::mem::take(&mut self.only)
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::{env, fs};

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn env_overrides_and_sanitizing() {
        let mut cfg = CrawlerConfig::default();
        cfg.apply_env_from(env_of(&[
            (ENV_WORKERS, "0"),
            (ENV_VERBOSE, "Yes"),
            (ENV_SOURCES, " news, ,blog,news"),
            (ENV_DATABASE_URL, " "),
        ]))
        .unwrap();

        assert_eq!(cfg.workers, 1);
        assert!(cfg.verbose);
        assert_eq!(cfg.only, vec!["news".to_string(), "blog".to_string()]);
        assert_eq!(cfg.database_url, None);
        assert_eq!(
            cfg.source_filter(),
            Some(&["news".to_string(), "blog".to_string()][..])
        );
    }

    #[test]
    fn bad_worker_count_is_an_error() {
        let mut cfg = CrawlerConfig::default();
        assert!(cfg.apply_env_from(env_of(&[(ENV_WORKERS, "many")])).is_err());
    }

    #[test]
    fn toml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let p_toml = dir.path().join("crawler.toml");
        fs::write(&p_toml, "workers = 4\nverbose = true\nonly = [\"a\"]\n").unwrap();
        let t = CrawlerConfig::load_from_file(&p_toml).unwrap();
        assert_eq!(t.workers, 4);
        assert!(t.verbose);
        assert_eq!(t.fetch_timeout_secs, 30);

        let p_json = dir.path().join("crawler.json");
        fs::write(&p_json, r#"{"workers": 2, "metrics_path": "m.prom"}"#).unwrap();
        let j = CrawlerConfig::load_from_file(&p_json).unwrap();
        assert_eq!(j.workers, 2);
        assert_eq!(j.metrics_path, Some(PathBuf::from("m.prom")));
        assert!(j.source_filter().is_none());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let cfg = CrawlerConfig {
            fetch_timeout_secs: 0,
            ..CrawlerConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(CrawlerConfig::default().validate().is_ok());
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_path_then_fallbacks() {
        // Run in a temp CWD so a real config/ in the repo is not picked up
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        for k in [
            ENV_CONFIG_PATH,
            ENV_WORKERS,
            ENV_VERBOSE,
            ENV_SOURCES,
            ENV_SOURCES_PATH,
            ENV_DATABASE_URL,
        ] {
            env::remove_var(k);
        }

        // Nothing → defaults
        assert_eq!(CrawlerConfig::load().unwrap(), CrawlerConfig::default());

        // Fallback file in ./config/
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_CONFIG_PATH), "workers = 3\n").unwrap();
        assert_eq!(CrawlerConfig::load().unwrap().workers, 3);

        // Env path wins, env overrides win over the file
        let p = tmp.path().join("other.toml");
        fs::write(&p, "workers = 5\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(CrawlerConfig::load().unwrap().workers, 5);
        env::set_var(ENV_WORKERS, "7");
        assert_eq!(CrawlerConfig::load().unwrap().workers, 7);
        env::remove_var(ENV_WORKERS);

        // Missing env path is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(CrawlerConfig::load().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
