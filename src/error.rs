//! Typed errors for the crawler.
//!
//! `ConfigError` and `ExtractError` come out of the transform engine, `CrawlError` is what a
//! pipeline stage fails with, and `SourceError` tags a `CrawlError` with the source and stage
//! so one broken source can be reported without touching its siblings.

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Operator-authored configuration that cannot be used. Always fatal for the owning source.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed transform JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing `{0}` member")]
    MissingMember(&'static str),

    #[error("do not know how to transform this node: {0}")]
    UnknownNode(String),

    #[error("node has more than one kind key: {0}")]
    AmbiguousNode(String),

    #[error("do not know how to store this node: {0}")]
    UnknownStorage(String),

    #[error("unknown type {0}")]
    UnknownType(String),

    #[error("unknown field {0}")]
    UnknownField(String),

    #[error("template `{field}`: {reason}")]
    Template { field: String, reason: String },

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("member `{member}` must be {expected}")]
    InvalidMember {
        member: &'static str,
        expected: &'static str,
    },
}

/// The page did not have the shape the transform expects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no element found for `{selector}`")]
    NoElement { selector: String },

    #[error("no attribute found: {name}")]
    NoAttribute { name: String },

    #[error("no matches found for /{pattern}/")]
    NoMatches { pattern: String },

    #[error("unequal match count: pattern has {groups} groups, {declared} declared")]
    UnequalMatchCount { groups: usize, declared: usize },
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("cannot fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error("worker stopped before reporting")]
    WorkerAborted,
}

impl CrawlError {
    pub fn transport<E>(url: &str, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Transport {
            url: url.to_string(),
            source: err.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }
}

/// Pipeline stage a source failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Transform,
    Templates,
    Fetch,
    Extract,
    Persist,
    /// The worker handling the source went away before reporting.
    Worker,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Transform => "transform",
            Stage::Templates => "templates",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
            Stage::Worker => "worker",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure of one source, tagged with where it happened.
#[derive(Debug, Error)]
#[error("source `{feed}` failed at {stage}: {error}")]
pub struct SourceError {
    pub feed: String,
    pub stage: Stage,
    #[source]
    pub error: CrawlError,
}

impl SourceError {
    pub fn new(feed: &str, stage: Stage, error: impl Into<CrawlError>) -> Self {
        Self {
            feed: feed.to_string(),
            stage,
            error: error.into(),
        }
    }
}
