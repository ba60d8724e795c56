//! Typed transform tree.
//!
//! Extraction nodes are recognized by which of `search`, `find`, `attr` or `text` they carry;
//! storage nodes by `copy` or `regex`. Everything is checked once while parsing so evaluation
//! only ever sees well-formed nodes.

use regex::Regex;
use serde_json::{Map, Value as Json};

use crate::error::ConfigError;
use crate::transform::mapping::ValueType;

const EXTRACTION_KINDS: [&str; 4] = ["search", "find", "attr", "text"];
const STORAGE_KINDS: [&str; 2] = ["copy", "regex"];

#[derive(Debug, Clone)]
pub enum ExtractionNode {
    /// Every descendant matching `selector`.
    Search {
        selector: String,
        children: Vec<ExtractionNode>,
    },
    /// The first descendant matching `selector`; missing is an error.
    Find {
        selector: String,
        children: Vec<ExtractionNode>,
    },
    /// One attribute of the current element; missing is an error.
    Attr {
        name: String,
        children: Vec<StorageNode>,
    },
    /// Text of the current element and its descendants.
    Text { children: Vec<StorageNode> },
}

#[derive(Debug, Clone)]
pub enum StorageNode {
    Copy { name: String, ty: ValueType },
    Regex { regex: Regex, matches: Vec<MatchTarget> },
}

/// Where one capture group of a `regex` node is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTarget {
    pub name: String,
    pub ty: ValueType,
}

impl ExtractionNode {
    pub fn from_json(node: &Json) -> Result<Self, ConfigError> {
        let obj = node
            .as_object()
            .ok_or_else(|| ConfigError::UnknownNode(node.to_string()))?;

        match single_kind(obj, &EXTRACTION_KINDS, node)? {
            Some("search") => Ok(ExtractionNode::Search {
                selector: string_member(obj, "search")?,
                children: do_list(obj, ExtractionNode::from_json)?,
            }),
            Some("find") => Ok(ExtractionNode::Find {
                selector: string_member(obj, "find")?,
                children: do_list(obj, ExtractionNode::from_json)?,
            }),
            Some("attr") => Ok(ExtractionNode::Attr {
                name: string_member(obj, "attr")?,
                children: do_list(obj, StorageNode::from_json)?,
            }),
            Some("text") => Ok(ExtractionNode::Text {
                children: do_list(obj, StorageNode::from_json)?,
            }),
            _ => Err(ConfigError::UnknownNode(node.to_string())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionNode::Search { .. } => "search",
            ExtractionNode::Find { .. } => "find",
            ExtractionNode::Attr { .. } => "attr",
            ExtractionNode::Text { .. } => "text",
        }
    }
}

impl StorageNode {
    pub fn from_json(node: &Json) -> Result<Self, ConfigError> {
        let obj = node
            .as_object()
            .ok_or_else(|| ConfigError::UnknownStorage(node.to_string()))?;

        match single_kind(obj, &STORAGE_KINDS, node)? {
            Some("copy") => Ok(StorageNode::Copy {
                name: string_member(obj, "name")?,
                ty: type_member(obj)?,
            }),
            Some("regex") => {
                let pattern = string_member(obj, "regex")?;
                let regex = Regex::new(&pattern)?;

                // `data` is the historical name of `matches`.
                let raw = obj
                    .get("matches")
                    .or_else(|| obj.get("data"))
                    .ok_or(ConfigError::MissingMember("matches"))?;
                let list = raw.as_array().ok_or(ConfigError::InvalidMember {
                    member: "matches",
                    expected: "an array",
                })?;

                let mut matches = Vec::with_capacity(list.len());
                for m in list {
                    let m = m.as_object().ok_or(ConfigError::InvalidMember {
                        member: "matches",
                        expected: "an array of objects",
                    })?;
                    matches.push(MatchTarget {
                        name: string_member(m, "name")?,
                        ty: type_member(m)?,
                    });
                }

                Ok(StorageNode::Regex { regex, matches })
            }
            _ => Err(ConfigError::UnknownStorage(node.to_string())),
        }
    }
}

/// Returns the one kind key present in `obj`, `None` if there is none.
fn single_kind(
    obj: &Map<String, Json>,
    kinds: &[&'static str],
    node: &Json,
) -> Result<Option<&'static str>, ConfigError> {
    let mut found = kinds.iter().copied().filter(|k| obj.contains_key(*k));
    let first = found.next();
    if found.next().is_some() {
        return Err(ConfigError::AmbiguousNode(node.to_string()));
    }
    Ok(first)
}

fn string_member(obj: &Map<String, Json>, member: &'static str) -> Result<String, ConfigError> {
    match obj.get(member) {
        Some(Json::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::InvalidMember {
            member,
            expected: "a string",
        }),
        None => Err(ConfigError::MissingMember(member)),
    }
}

fn type_member(obj: &Map<String, Json>) -> Result<ValueType, ConfigError> {
    let name = string_member(obj, "type")?;
    ValueType::parse(&name).ok_or(ConfigError::UnknownType(name))
}

fn do_list<T>(
    obj: &Map<String, Json>,
    parse: fn(&Json) -> Result<T, ConfigError>,
) -> Result<Vec<T>, ConfigError> {
    match obj.get("do") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::Array(items)) => items.iter().map(parse).collect(),
        Some(_) => Err(ConfigError::InvalidMember {
            member: "do",
            expected: "an array",
        }),
    }
}
