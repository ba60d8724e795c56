// src/store/file.rs
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::crawl::types::Source;
use crate::store::{filter_sources, SourceStore, StoreError};

/// Sources read once from a TOML (`[[source]]` tables) or JSON (array) file.
#[derive(Debug, Clone, Default)]
pub struct FileSourceStore {
    sources: Vec<Source>,
}

#[derive(Deserialize)]
struct RawSource {
    name: String,
    url: String,
    /// JSON text, or an inline object that gets serialized back to JSON text.
    transform: serde_json::Value,
}

#[derive(Deserialize)]
struct TomlSources {
    #[serde(default)]
    source: Vec<RawSource>,
}

impl FileSourceStore {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let raw = parse_sources(&content, &ext).map_err(|reason| StoreError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        Self::from_raw(raw, path)
    }

    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    fn from_raw(raw: Vec<RawSource>, path: &Path) -> Result<Self, StoreError> {
        let mut seen = BTreeSet::new();
        let mut sources = Vec::with_capacity(raw.len());
        for r in raw {
            let name = r.name.trim().to_string();
            if name.is_empty() {
                return Err(StoreError::Parse {
                    path: PathBuf::from(path),
                    reason: "source without a name".into(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(StoreError::DuplicateSource(name));
            }
            let transform = match r.transform {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            sources.push(Source {
                name,
                url: r.url.trim().to_string(),
                transform,
            });
        }
        Ok(Self { sources })
    }
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<RawSource>, String> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[source]]");
    let mut toml_err = None;
    if try_toml {
        match toml::from_str::<TomlSources>(s) {
            Ok(v) => return Ok(v.source),
            Err(e) => toml_err = Some(e.to_string()),
        }
    }
    match serde_json::from_str::<Vec<RawSource>>(s) {
        Ok(v) => Ok(v),
        Err(e) => Err(toml_err.unwrap_or_else(|| e.to_string())),
    }
}

#[async_trait]
impl SourceStore for FileSourceStore {
    async fn list_sources(&self, filter: Option<&[String]>) -> Result<Vec<Source>, StoreError> {
        Ok(filter_sources(self.sources.iter().cloned(), filter))
    }

    async fn find_source(&self, name: &str) -> Result<Option<Source>, StoreError> {
        Ok(self.sources.iter().find(|s| s.name == name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn toml_with_string_and_inline_transforms() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sources.toml");
        fs::write(
            &p,
            r#"
[[source]]
name = "news"
url = " https://example.test/news "
transform = '''{"items": [], "transform": {"title": "x"}}'''

[[source]]
name = "blog"
url = "https://example.test/blog"
transform = { items = [], transform = { uri = "/u" } }
"#,
        )
        .unwrap();

        let store = FileSourceStore::load(&p).unwrap();
        let all = store.list_sources(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "blog");

        let blog: serde_json::Value = serde_json::from_str(&all[0].transform).unwrap();
        assert_eq!(blog["transform"]["uri"], "/u");

        let news = store.find_source("news").await.unwrap().unwrap();
        assert_eq!(news.url, "https://example.test/news");
        assert!(news.transform.contains(r#""title": "x""#));
    }

    #[test]
    fn json_array_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("sources.json");
        fs::write(
            &p,
            r#"[{"name": "a", "url": "u", "transform": {"items": []}},
                {"name": "a", "url": "v", "transform": "{}"}]"#,
        )
        .unwrap();
        let err = FileSourceStore::load(&p).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSource(n) if n == "a"));
    }

    #[test]
    fn unreadable_and_unparsable_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            FileSourceStore::load(&missing).unwrap_err(),
            StoreError::Io { .. }
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[[source]]\nname = ").unwrap();
        assert!(matches!(
            FileSourceStore::load(&bad).unwrap_err(),
            StoreError::Parse { .. }
        ));
    }
}
