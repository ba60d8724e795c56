//! Minimal `{{ key }}` substitution used to render item fields.
//!
//! A placeholder names a field-mapping key, optionally with a leading dot (`{{.id}}`).
//! Unknown keys render as an empty string; only malformed template text is an error.

use crate::transform::mapping::FieldMapping;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

/// Why template text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSyntaxError {
    pub offset: usize,
    pub reason: &'static str,
}

impl std::fmt::Display for TemplateSyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.offset)
    }
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, TemplateSyntaxError> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let inner_start = open + 2;
            let close = rest[inner_start..]
                .find("}}")
                .ok_or(TemplateSyntaxError {
                    offset: offset + open,
                    reason: "unclosed placeholder",
                })?;

            let raw = rest[inner_start..inner_start + close].trim();
            let key = raw.strip_prefix('.').unwrap_or(raw);
            if key.is_empty() {
                return Err(TemplateSyntaxError {
                    offset: offset + open,
                    reason: "empty placeholder",
                });
            }
            if !is_identifier(key) {
                return Err(TemplateSyntaxError {
                    offset: offset + open,
                    reason: "placeholder is not a key name",
                });
            }
            segments.push(Segment::Key(key.to_string()));

            let consumed = inner_start + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn render(&self, mapping: &FieldMapping) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Key(k) => {
                    if let Some(v) = mapping.get(k) {
                        out.push_str(&v.to_string());
                    }
                }
            }
        }
        out
    }

    /// Whether a placeholder names `key`.
    pub fn references(&self, key: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Key(k) if k == key))
    }
}

/// Parse and render in one go.
pub fn render(text: &str, mapping: &FieldMapping) -> Result<String, TemplateSyntaxError> {
    Ok(Template::parse(text)?.render(mapping))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
