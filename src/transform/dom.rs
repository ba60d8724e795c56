// src/transform/dom.rs
use scraper::{ElementRef, Html, Selector};

use crate::error::ConfigError;

/// What the interpreter needs from a parsed page.
pub trait DomNode: Sized {
    /// Descendants matching a CSS selector, in document order.
    fn find_all(&self, selector: &str) -> Result<Vec<Self>, ConfigError>;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Concatenated text of this node and all of its descendants.
    fn text_content(&self) -> String;
}

impl<'a> DomNode for ElementRef<'a> {
    fn find_all(&self, selector: &str) -> Result<Vec<Self>, ConfigError> {
        let sel = Selector::parse(selector).map_err(|e| ConfigError::Selector {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(self.select(&sel).collect())
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn text_content(&self) -> String {
        self.text().collect()
    }
}

/// Parse page content. HTML parsing is lenient, so this never fails.
pub fn parse_page(body: &str) -> Html {
    Html::parse_document(body)
}
