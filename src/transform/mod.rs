// src/transform/mod.rs
pub mod assemble;
pub mod dom;
pub mod interpreter;
pub mod mapping;
pub mod nodes;
pub mod template;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{ConfigError, CrawlError};
use crate::transform::dom::parse_page;
use crate::transform::mapping::FieldMapping;
use crate::transform::nodes::ExtractionNode;
use crate::transform::template::Template;

/// Parsed transform of one source: what to extract (`items`) and how to render it
/// (`transform`, still uncompiled).
#[derive(Debug, Clone)]
pub struct TransformDocument {
    pub items: Vec<ExtractionNode>,
    pub templates: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawDocument {
    items: Option<Vec<Json>>,
    transform: Option<BTreeMap<String, String>>,
}

impl TransformDocument {
    /// Parse transform JSON. Unknown top-level members are ignored; unknown node kinds are not.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let raw: RawDocument = serde_json::from_str(json)?;
        let items = raw.items.ok_or(ConfigError::MissingMember("items"))?;
        let templates = raw.transform.ok_or(ConfigError::MissingMember("transform"))?;

        let items = items
            .iter()
            .map(ExtractionNode::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items, templates })
    }

    /// Run every `items` entry against the page and collect their mappings in order.
    ///
    /// The parsed DOM lives only inside this call.
    pub fn extract(&self, body: &str) -> Result<Vec<FieldMapping>, CrawlError> {
        let page = parse_page(body);
        let root = page.root_element();

        let mut out = Vec::new();
        for node in &self.items {
            out.extend(interpreter::evaluate(&root, node)?);
        }
        Ok(out)
    }
}

/// Compiled templates for the item fields.
#[derive(Debug, Clone, Default)]
pub struct FieldTemplates {
    pub title: Option<Template>,
    pub uri: Option<Template>,
    pub description: Option<Template>,
}

impl FieldTemplates {
    pub fn compile(raw: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut out = Self::default();
        for (field, text) in raw {
            let slot = match field.as_str() {
                "title" => &mut out.title,
                "uri" => &mut out.uri,
                "description" => &mut out.description,
                _ => return Err(ConfigError::UnknownField(field.clone())),
            };
            let tpl = Template::parse(text).map_err(|e| ConfigError::Template {
                field: field.clone(),
                reason: e.to_string(),
            })?;
            *slot = Some(tpl);
        }
        Ok(out)
    }

    pub fn references(&self, key: &str) -> bool {
        [&self.title, &self.uri, &self.description]
            .into_iter()
            .flatten()
            .any(|t| t.references(key))
    }
}
