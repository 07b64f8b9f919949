//! Structural loader
//!
//! Turns document text into a [`Node`] tree. The accepted syntax is the
//! YAML subset the model DSL uses:
//!
//! ```text
//! model MnistNet:
//!   layers:
//!     - type: dense          # compact mapping inside a sequence
//!       units: 64
//!   train: {learning_rate: 0.001, batch_size: 32}
//! ```
//!
//! Parsing is done by `marked_yaml`, whose nodes carry start markers that
//! are mapped to byte spans and LSP ranges through one [`LineIndex`]. A
//! linear [`screen`] pass runs first and enforces the input caps, so
//! pathological input produces a [`SyntaxFault`] instead of exhausting
//! the stack.

mod scalar;
mod screen;

use marked_yaml::types::{MarkedScalarNode, Marker, Node as YamlNode};
use marked_yaml::{parse_yaml_with_options, LoadError, LoaderOptions};
use tracing::debug;

use crate::diagnostics::SourceRange;
use crate::error::SyntaxFault;
use crate::line_index::LineIndex;
use crate::node::{Entry, Key, Node, NodeKind, Scalar, Span};

/// Largest accepted document, in bytes
pub const MAX_INPUT_LEN: usize = 1024 * 1024;

/// Deepest accepted nesting of collections
pub const MAX_DEPTH: usize = 64;

const BOM: char = '\u{feff}';

/// Parse a complete document.
///
/// An empty or comment-only document yields an empty mapping.
pub fn load(text: &str) -> Result<Node, SyntaxFault> {
    if text.len() > MAX_INPUT_LEN {
        return Err(SyntaxFault::unanchored(format!(
            "document exceeds the maximum size of {} bytes",
            MAX_INPUT_LEN
        )));
    }

    let index = LineIndex::new(text);
    let has_content = screen::screen(text)
        .map_err(|r| SyntaxFault::at(&index, text, r.message, r.offset))?;
    if !has_content {
        return Ok(Node {
            kind: NodeKind::Mapping(Vec::new()),
            span: Span::empty(0),
            range: SourceRange::document_start(),
        });
    }

    let (body, bom) = match text.strip_prefix(BOM) {
        Some(body) => (body, 1),
        None => (text, 0),
    };
    let builder = Builder::new(text, &index, bom);
    let options = LoaderOptions::default().error_on_duplicate_keys(true);
    let yaml =
        parse_yaml_with_options(0, body, options).map_err(|e| builder.load_error(&e))?;
    builder.node(&yaml, 1)
}

/// Converts parser nodes into [`Node`]s with spans into `text`.
struct Builder<'t, 'i> {
    text: &'t str,
    index: &'i LineIndex<'t>,
    /// Characters stripped from the first line before parsing
    bom: usize,
}

impl<'t, 'i> Builder<'t, 'i> {
    fn new(text: &'t str, index: &'i LineIndex<'t>, bom: usize) -> Self {
        Self { text, index, bom }
    }

    /// Byte offset of a parser marker. Markers count lines and characters
    /// from 1.
    fn offset(&self, marker: Option<&Marker>) -> usize {
        let Some(marker) = marker else {
            return 0;
        };
        let line = marker.line().saturating_sub(1);
        let mut column = marker.column().saturating_sub(1);
        if line == 0 {
            column += self.bom;
        }
        self.index.offset_of_char(line, column)
    }

    fn fault(&self, message: impl Into<String>, offset: usize) -> SyntaxFault {
        SyntaxFault::at(self.index, self.text, message, offset)
    }

    fn load_error(&self, err: &LoadError) -> SyntaxFault {
        let (message, marker) = match err {
            LoadError::TopLevelMustBeMapping(m) => {
                ("the document must be a mapping of sections".to_string(), Some(m))
            }
            LoadError::UnexpectedAnchor(m) => {
                ("anchors and aliases are not supported".to_string(), Some(m))
            }
            LoadError::MappingKeyMustBeScalar(m) => {
                ("mapping keys must be plain values".to_string(), Some(m))
            }
            LoadError::UnexpectedTag(m) => ("tags are not supported".to_string(), Some(m)),
            LoadError::ScanError(m, e) => (e.info().to_string(), Some(m)),
            LoadError::DuplicateKey(inner) => (
                format!("duplicate key '{}'", inner.key.as_str()),
                inner.key.span().start(),
            ),
            #[allow(unreachable_patterns)]
            other => (other.to_string(), None),
        };
        let offset = match marker {
            Some(m) => self.offset(Some(m)),
            None => self.text.len(),
        };
        debug!(offset, error = %message, "yaml rejected");
        self.fault(message, offset)
    }

    fn make(&self, kind: NodeKind, span: Span) -> Node {
        Node {
            kind,
            span,
            range: self.index.range(span),
        }
    }

    fn node(&self, yaml: &YamlNode, depth: usize) -> Result<Node, SyntaxFault> {
        let start = self.offset(yaml.span().start());
        if depth > MAX_DEPTH {
            return Err(self.fault(
                format!("maximum nesting depth of {} exceeded", MAX_DEPTH),
                start,
            ));
        }

        match yaml {
            YamlNode::Scalar(s) => Ok(self.scalar(s)),
            YamlNode::Sequence(items) => {
                let items = items
                    .iter()
                    .map(|item| self.node(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                let end = items.iter().map(|n| n.span.end).max().unwrap_or(start);
                let span = self.collection_span(start, end);
                Ok(self.make(NodeKind::Sequence(items), span))
            }
            YamlNode::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping.iter() {
                    let key_span = self.scalar_span(key);
                    entries.push(Entry {
                        key: Key {
                            name: key.as_str().to_string(),
                            span: key_span,
                            range: self.index.range(key_span),
                        },
                        value: self.node(value, depth + 1)?,
                    });
                }
                let end = entries
                    .iter()
                    .map(|e| e.key.span.end.max(e.value.span.end))
                    .max()
                    .unwrap_or(start);
                let span = self.collection_span(start, end);
                Ok(self.make(NodeKind::Mapping(entries), span))
            }
        }
    }

    fn scalar_span(&self, s: &MarkedScalarNode) -> Span {
        let start = self.offset(s.span().start());
        let source = &self.text[start..];
        Span::new(start, start + scalar::extent(source, s.as_str()))
    }

    fn scalar(&self, s: &MarkedScalarNode) -> Node {
        let span = self.scalar_span(s);
        let value = scalar::typed_value(&self.text[span.start..], s.as_str());
        let raw = self.text[span.start..span.end].to_string();
        self.make(NodeKind::Scalar(Scalar { value, raw }), span)
    }

    /// A block collection ends with its last child; a flow collection at
    /// `start` also covers its closing bracket.
    fn collection_span(&self, start: usize, end: usize) -> Span {
        let close = match self.text[start..].chars().next() {
            Some('[') => ']',
            Some('{') => '}',
            _ => return Span::new(start, end.max(start)),
        };
        let from = end.max(start + 1);
        match closing_bracket(&self.text[from..], close) {
            Some(at) => Span::new(start, from + at + 1),
            None => Span::new(start, end.max(start)),
        }
    }
}

/// Offset of `close` after separators and comments at the head of `rest`
fn closing_bracket(rest: &str, close: char) -> Option<usize> {
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == close => return Some(i),
            ' ' | '\t' | '\r' | '\n' | ',' => {}
            '#' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => return None,
        }
    }
    None
}
