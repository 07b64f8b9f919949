//! ailang-core: validation engine for AILang model documents
//!
//! This crate contains the editor-independent half of the language server:
//! - Structural loader (indentation-aware mapping/sequence/scalar tree with source ranges)
//! - Rule engine with an ordered, registered rule set
//! - Configuration resolver (defaults, workspace and per-document layers)
//! - Issue and result types shared with the LSP crate
//!
//! Document tracking, debouncing and publishing live in `ailang-lsp`.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod line_index;
pub mod loader;
pub mod node;
pub mod rules;
pub mod validator;

// Re-export commonly used types
pub use config::{default_settings, resolve, ResolvedConfig};
pub use diagnostics::{
    IssueCode, Position, RelatedIssue, Severity, SourceRange, ValidationIssue, ValidationResult,
};
pub use error::{ConfigError, RuleFault, SyntaxFault};
pub use line_index::LineIndex;
pub use loader::{load, MAX_DEPTH, MAX_INPUT_LEN};
pub use node::{Entry, Key, Node, NodeKind, Scalar, ScalarValue, Span};
pub use rules::{Rule, RuleContext, RuleEngine};
pub use validator::{Validation, Validator};
