//! Validation pipeline: load, then run the rule engine.

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::diagnostics::{IssueCode, ValidationIssue, ValidationResult};
use crate::error::SyntaxFault;
use crate::loader;
use crate::rules::RuleEngine;

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    /// The document loaded and every enabled rule ran
    Parsed(ValidationResult),
    /// The loader failed; no rule ran
    SyntaxFault {
        fault: SyntaxFault,
        /// The single `E1050` issue describing the fault
        issue: ValidationIssue,
    },
}

impl Validation {
    /// Issues in publication order
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Validation::Parsed(result) => result.issues(),
            Validation::SyntaxFault { issue, .. } => std::slice::from_ref(issue),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Validation::Parsed(result) => result.is_valid(),
            Validation::SyntaxFault { .. } => false,
        }
    }

    pub fn is_syntax_fault(&self) -> bool {
        matches!(self, Validation::SyntaxFault { .. })
    }

    /// Collapse into a [`ValidationResult`]; a syntax fault becomes a
    /// one-issue result.
    pub fn into_result(self) -> ValidationResult {
        match self {
            Validation::Parsed(result) => result,
            Validation::SyntaxFault { issue, .. } => ValidationResult::from_issues(vec![issue]),
        }
    }
}

/// Loader plus rule engine. Stateless between calls.
#[derive(Debug, Default)]
pub struct Validator {
    engine: RuleEngine,
}

impl Validator {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn validate(&self, text: &str, config: &ResolvedConfig) -> Validation {
        match loader::load(text) {
            Ok(root) => {
                let issues = self.engine.evaluate(&root, config);
                debug!(issues = issues.len(), "document validated");
                Validation::Parsed(ValidationResult::from_issues(issues))
            }
            Err(fault) => {
                debug!(offset = fault.offset, error = %fault, "syntax fault");
                let issue = syntax_issue(&fault);
                Validation::SyntaxFault { fault, issue }
            }
        }
    }
}

/// One error over the range the loader resolved for the fault.
fn syntax_issue(fault: &SyntaxFault) -> ValidationIssue {
    ValidationIssue::error(
        IssueCode::ParseFailure,
        format!("Syntax error: {}", fault.message),
    )
    .with_range(fault.range)
}
