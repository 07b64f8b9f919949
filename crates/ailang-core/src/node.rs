//! Structural tree produced by the loader.
//!
//! The tree is generic (mappings, sequences, scalars) and knows nothing
//! about models or layers. Every node carries both its byte span and its
//! resolved line/column range so rules can anchor issues without access to
//! the source text.

use crate::diagnostics::SourceRange;

/// Byte offsets into the document text, `start..end`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub range: SourceRange,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Ordered entries, keys unique
    Mapping(Vec<Entry>),
    Sequence(Vec<Node>),
    Scalar(Scalar),
}

/// One `key: value` pair of a mapping
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub key: Key,
    pub value: Node,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    pub name: String,
    pub span: Span,
    pub range: SourceRange,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scalar {
    pub value: ScalarValue,
    /// Source text of the scalar, quotes included
    pub raw: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Node {
    pub fn as_mapping(&self) -> Option<&[Entry]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Look up a mapping entry by key
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.as_mapping()?.iter().find(|e| e.key.name == key)
    }

    /// Look up a mapping value by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn is_null(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Scalar(Scalar {
                value: ScalarValue::Null,
                ..
            })
        )
    }

    /// String scalar contents (quoted or plain)
    pub fn as_str(&self) -> Option<&str> {
        match &self.as_scalar()?.value {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value of an integer, float or numeric string scalar
    pub fn as_f64(&self) -> Option<f64> {
        match &self.as_scalar()?.value {
            ScalarValue::Integer(i) => Some(*i as f64),
            ScalarValue::Float(f) => Some(*f),
            ScalarValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Integer value of an integer scalar or an integer string
    pub fn as_i64(&self) -> Option<i64> {
        match &self.as_scalar()?.value {
            ScalarValue::Integer(i) => Some(*i),
            ScalarValue::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Short description used in messages
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Scalar(scalar) => match scalar.value {
                ScalarValue::Null => "null",
                ScalarValue::Bool(_) => "boolean",
                ScalarValue::Integer(_) => "integer",
                ScalarValue::Float(_) => "number",
                ScalarValue::String(_) => "string",
            },
        }
    }

    /// Source text of a scalar, empty for collections
    pub fn raw(&self) -> &str {
        self.as_scalar().map(|s| s.raw.as_str()).unwrap_or("")
    }
}
