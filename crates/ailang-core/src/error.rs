//! Error types for the validation pipeline.
//!
//! None of these are fatal: a [`SyntaxFault`] becomes a single parse
//! diagnostic, a [`RuleFault`] becomes one internal-fault issue, and a
//! [`ConfigError`] falls back to the last known good configuration.

use thiserror::Error;

use crate::diagnostics::SourceRange;
use crate::line_index::LineIndex;

/// The document could not be structurally parsed.
///
/// `offset` is the byte offset of the first unparseable token, clamped to
/// the document length. `range` is that position resolved by the loader's
/// line index, widened over the offending character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxFault {
    pub message: String,
    pub offset: usize,
    pub range: SourceRange,
}

impl SyntaxFault {
    /// Fault at `offset`, resolved through `index`.
    pub fn at(
        index: &LineIndex<'_>,
        text: &str,
        message: impl Into<String>,
        offset: usize,
    ) -> Self {
        let offset = offset.min(text.len());
        let start = index.position(offset);
        let end = text
            .get(offset..)
            .and_then(|rest| rest.chars().next())
            .filter(|c| *c != '\n' && *c != '\r')
            .map_or(start, |c| index.position(offset + c.len_utf8()));
        Self {
            message: message.into(),
            offset,
            range: SourceRange::new(start, end),
        }
    }

    /// Fault that is not tied to a location in the text
    pub fn unanchored(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: 0,
            range: SourceRange::document_start(),
        }
    }
}

/// A single rule failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleFault {
    #[error("rule '{rule}' failed: {reason}")]
    Failed { rule: &'static str, reason: String },

    #[error("rule '{rule}' panicked: {reason}")]
    Panicked { rule: &'static str, reason: String },
}

impl RuleFault {
    pub fn failed(rule: &'static str, reason: impl Into<String>) -> Self {
        RuleFault::Failed {
            rule,
            reason: reason.into(),
        }
    }

    pub fn rule(&self) -> &'static str {
        match self {
            RuleFault::Failed { rule, .. } | RuleFault::Panicked { rule, .. } => rule,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            RuleFault::Failed { reason, .. } | RuleFault::Panicked { reason, .. } => reason,
        }
    }
}

/// Settings could not be retrieved or had an unusable shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("settings request failed: {0}")]
    Retrieval(String),

    #[error("settings for '{section}' are not an object")]
    NotAnObject { section: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Position;

    #[test]
    fn test_syntax_fault_covers_offending_char() {
        let text = "model:\n\tlayers: []\n";
        let fault = SyntaxFault::at(&LineIndex::new(text), text, "tab", 7);
        assert_eq!(fault.range.start, Position::new(1, 0));
        assert_eq!(fault.range.end, Position::new(1, 1));
        assert_eq!(fault.to_string(), "tab");
    }

    #[test]
    fn test_syntax_fault_at_end_is_zero_width() {
        let text = "model:\n  layers: [\n";
        let fault = SyntaxFault::at(&LineIndex::new(text), text, "unterminated", 999);
        assert_eq!(fault.offset, text.len());
        assert_eq!(fault.range.start, Position::new(2, 0));
        assert_eq!(fault.range.start, fault.range.end);
    }

    #[test]
    fn test_rule_fault_names_rule() {
        let fault = RuleFault::failed("training", "bad state");
        assert_eq!(fault.rule(), "training");
        assert!(fault.to_string().contains("training"));
    }
}
