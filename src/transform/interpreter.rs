//! Tree-walking evaluation of extraction and storage nodes.
//!
//! Only the outermost node of an `items` entry may open new field-mappings, and only when it is
//! a `search`: each matched sibling gets its own mapping. Everything below writes into the last
//! mapping of the working list.

use tracing::debug;

use crate::error::{CrawlError, ExtractError};
use crate::transform::dom::DomNode;
use crate::transform::mapping::{coerce_or_zero, FieldMapping};
use crate::transform::nodes::{ExtractionNode, StorageNode};

/// Evaluate one `items` entry against `root`.
///
/// Returns no mappings when the last mapping ended up empty.
pub fn evaluate<N: DomNode>(
    root: &N,
    node: &ExtractionNode,
) -> Result<Vec<FieldMapping>, CrawlError> {
    let mut mappings = vec![FieldMapping::new()];
    walk(root, node, &mut mappings, true)?;

    if mappings.last().map_or(true, FieldMapping::is_empty) {
        debug!(target: "transform", kind = node.kind(), "nothing to transform");
        return Ok(Vec::new());
    }
    Ok(mappings)
}

fn walk<N: DomNode>(
    element: &N,
    node: &ExtractionNode,
    mappings: &mut Vec<FieldMapping>,
    base: bool,
) -> Result<(), CrawlError> {
    match node {
        ExtractionNode::Search { selector, children } => {
            let found = element.find_all(selector)?;
            let last = found.len().saturating_sub(1);
            for (i, el) in found.iter().enumerate() {
                for child in children {
                    walk(el, child, mappings, false)?;
                }
                // An empty mapping is reused by the next sibling.
                if base && i < last && !last_mut(mappings).is_empty() {
                    mappings.push(FieldMapping::new());
                }
            }
        }
        ExtractionNode::Find { selector, children } => {
            let el = element
                .find_all(selector)?
                .into_iter()
                .next()
                .ok_or_else(|| ExtractError::NoElement {
                    selector: selector.clone(),
                })?;
            for child in children {
                walk(&el, child, mappings, false)?;
            }
        }
        ExtractionNode::Attr { name, children } => {
            let value = element
                .attribute(name)
                .ok_or_else(|| ExtractError::NoAttribute { name: name.clone() })?;
            for child in children {
                store(&value, child, last_mut(mappings))?;
            }
        }
        ExtractionNode::Text { children } => {
            let value = element.text_content();
            for child in children {
                store(&value, child, last_mut(mappings))?;
            }
        }
    }
    Ok(())
}

/// Write `value` into `mapping` as described by a storage node.
pub fn store(
    value: &str,
    node: &StorageNode,
    mapping: &mut FieldMapping,
) -> Result<(), ExtractError> {
    match node {
        StorageNode::Copy { name, ty } => {
            mapping.insert(name.clone(), coerce_or_zero(value, *ty));
        }
        StorageNode::Regex { regex, matches } => {
            let caps = regex.captures(value).ok_or_else(|| ExtractError::NoMatches {
                pattern: regex.as_str().to_string(),
            })?;

            let groups = caps.len() - 1;
            if groups != matches.len() {
                return Err(ExtractError::UnequalMatchCount {
                    groups,
                    declared: matches.len(),
                });
            }

            for (i, target) in matches.iter().enumerate() {
                let raw = caps.get(i + 1).map_or("", |m| m.as_str());
                mapping.insert(target.name.clone(), coerce_or_zero(raw, target.ty));
            }
        }
    }
    Ok(())
}

fn last_mut(mappings: &mut Vec<FieldMapping>) -> &mut FieldMapping {
    if mappings.is_empty() {
        mappings.push(FieldMapping::new());
    }
    let idx = mappings.len() - 1;
    &mut mappings[idx]
}
