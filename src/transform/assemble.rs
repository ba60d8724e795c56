// src/transform/assemble.rs
use crate::crawl::types::Item;
use crate::transform::mapping::FieldMapping;
use crate::transform::template::Template;
use crate::transform::FieldTemplates;

pub const DATE_KEY: &str = "date";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Value injected for `date` when templates use it and the page did not provide one:
/// today's local date as `YYYY-MM-DD`.
pub fn default_date() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// Renders field-mappings into items.
pub struct Assembler<'a> {
    templates: &'a FieldTemplates,
    date: fn() -> String,
}

impl<'a> Assembler<'a> {
    pub fn new(templates: &'a FieldTemplates) -> Self {
        Self {
            templates,
            date: default_date,
        }
    }

    pub fn with_date(mut self, date: fn() -> String) -> Self {
        self.date = date;
        self
    }

    /// Returns (items, dropped) where dropped counts mappings whose title or uri rendered empty.
    pub fn assemble(&self, feed: &str, mappings: Vec<FieldMapping>) -> (Vec<Item>, usize) {
        let needs_date = self.templates.references(DATE_KEY);
        let mut items = Vec::with_capacity(mappings.len());
        let mut dropped = 0usize;

        for mut mapping in mappings {
            if needs_date && !mapping.contains_key(DATE_KEY) {
                mapping.insert(DATE_KEY, (self.date)());
            }

            let title = render(&self.templates.title, &mapping);
            let uri = render(&self.templates.uri, &mapping);
            if title.is_empty() || uri.is_empty() {
                dropped += 1;
                continue;
            }

            items.push(Item {
                feed: feed.to_string(),
                title,
                uri,
                description: render(&self.templates.description, &mapping),
                created: None,
            });
        }

        (items, dropped)
    }
}

fn render(tpl: &Option<Template>, mapping: &FieldMapping) -> String {
    tpl.as_ref().map(|t| t.render(mapping)).unwrap_or_default()
}
