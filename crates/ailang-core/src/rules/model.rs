//! Model section lookup.

use crate::diagnostics::{Position, SourceRange};
use crate::node::{Entry, Key, Node};

/// The recognised top-level model section
#[derive(Debug, Clone)]
pub struct ModelSection<'a> {
    pub key: &'a Key,
    pub body: &'a Node,
    pub name: Option<ModelName>,
}

/// Model name and where it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelName {
    pub text: String,
    pub range: SourceRange,
}

impl<'a> ModelSection<'a> {
    /// First root entry named `model` or `model <Name>`.
    pub fn find(root: &'a Node) -> Option<Self> {
        let entry = root.as_mapping()?.iter().find(|e| is_model_key(&e.key.name))?;
        Some(Self {
            key: &entry.key,
            body: &entry.value,
            name: header_name(&entry.key).or_else(|| field_name(entry)),
        })
    }

    /// Name as written, or `"<unnamed>"`
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("<unnamed>", |n| n.text.as_str())
    }
}

fn is_model_key(name: &str) -> bool {
    match name.strip_prefix("model") {
        Some("") => true,
        Some(rest) => rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// `model Foo:`. For plain keys the range covers just the name; a quoted
/// key falls back to the whole key.
fn header_name(key: &Key) -> Option<ModelName> {
    let rest = key.name.strip_prefix("model")?;
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }

    let plain = key.span.end - key.span.start == key.name.len();
    let range = if plain && key.range.start.line == key.range.end.line {
        let lead = &key.name[..key.name.len() - rest.trim_start().len()];
        let start = key.range.start.character + utf16_len(lead);
        SourceRange::new(
            Position::new(key.range.start.line, start),
            Position::new(key.range.start.line, start + utf16_len(text)),
        )
    } else {
        key.range
    };

    Some(ModelName {
        text: text.to_string(),
        range,
    })
}

/// `model:` with a `name: Foo` field
fn field_name(entry: &Entry) -> Option<ModelName> {
    let node = entry.value.get("name")?;
    let text = node.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(ModelName {
        text: text.to_string(),
        range: node.range,
    })
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}
