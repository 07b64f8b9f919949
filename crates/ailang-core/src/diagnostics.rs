//! Validation issues and results
//!
//! One issue type is shared by the loader, every rule and the publisher.
//! Issue codes are part of the external contract and never change meaning.

use serde::{Deserialize, Serialize};

/// Issue severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// Stable issue codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    // =========================================================================
    // Structure errors
    // =========================================================================
    #[serde(rename = "E1001")]
    MissingModelSection,
    #[serde(rename = "E1002")]
    InvalidLayerEntry,
    #[serde(rename = "E1003")]
    MissingLayerType,
    #[serde(rename = "E1004")]
    InvalidLearningRate,
    #[serde(rename = "E1005")]
    InvalidBatchSize,
    #[serde(rename = "E1006")]
    InvalidLayerParameter,
    #[serde(rename = "E1050")]
    ParseFailure,

    // =========================================================================
    // Warnings
    // =========================================================================
    #[serde(rename = "W1001")]
    NoLayers,
    #[serde(rename = "W1002")]
    NamingConvention,
    #[serde(rename = "W1003")]
    LearningRateTooHigh,
    #[serde(rename = "W1004")]
    LearningRateTooLow,
    #[serde(rename = "W1005")]
    LargeBatchSize,
    #[serde(rename = "W1006")]
    DeprecatedLayer,
    #[serde(rename = "W1007")]
    DeprecatedOptimizer,
    #[serde(rename = "W1008")]
    UnknownActivation,

    // =========================================================================
    // Performance and security
    // =========================================================================
    #[serde(rename = "P1001")]
    LargeDenseLayer,
    #[serde(rename = "P1002")]
    LargeKernel,
    #[serde(rename = "P1004")]
    HighDropout,
    #[serde(rename = "P1100")]
    MissingBatchNorm,
    #[serde(rename = "S1001")]
    InlineCredential,

    // =========================================================================
    // Internal
    // =========================================================================
    #[serde(rename = "E9999")]
    InternalFault,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingModelSection => "E1001",
            IssueCode::InvalidLayerEntry => "E1002",
            IssueCode::MissingLayerType => "E1003",
            IssueCode::InvalidLearningRate => "E1004",
            IssueCode::InvalidBatchSize => "E1005",
            IssueCode::InvalidLayerParameter => "E1006",
            IssueCode::ParseFailure => "E1050",
            IssueCode::NoLayers => "W1001",
            IssueCode::NamingConvention => "W1002",
            IssueCode::LearningRateTooHigh => "W1003",
            IssueCode::LearningRateTooLow => "W1004",
            IssueCode::LargeBatchSize => "W1005",
            IssueCode::DeprecatedLayer => "W1006",
            IssueCode::DeprecatedOptimizer => "W1007",
            IssueCode::UnknownActivation => "W1008",
            IssueCode::LargeDenseLayer => "P1001",
            IssueCode::LargeKernel => "P1002",
            IssueCode::HighDropout => "P1004",
            IssueCode::MissingBatchNorm => "P1100",
            IssueCode::InlineCredential => "S1001",
            IssueCode::InternalFault => "E9999",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero-based position. `character` counts UTF-16 code units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Source range, `start <= end` by (line, character)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    /// Create a range, swapping the endpoints if they arrive reversed.
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Zero-width range at the start of the document.
    pub fn document_start() -> Self {
        Self::default()
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Secondary location attached to an issue. Carries no further relations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelatedIssue {
    pub message: String,
    pub severity: Severity,
    pub code: IssueCode,
    pub range: Option<SourceRange>,
}

/// A single finding produced by the loader or a rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    pub severity: Severity,
    pub code: IssueCode,
    pub range: Option<SourceRange>,
    pub related: Vec<RelatedIssue>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            code,
            range: None,
            related: vec![],
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn hint(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Hint, code, message)
    }

    /// Add source range
    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Attach a related location
    pub fn with_related(mut self, message: impl Into<String>, range: SourceRange) -> Self {
        self.related.push(RelatedIssue {
            message: message.into(),
            severity: Severity::Info,
            code: self.code,
            range: Some(range),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

/// Outcome of one validation pass. Built once from the issue list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    issues: Vec<ValidationIssue>,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    information: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let by_severity = |wanted: &[Severity]| -> Vec<ValidationIssue> {
            issues
                .iter()
                .filter(|i| wanted.contains(&i.severity))
                .cloned()
                .collect()
        };
        let errors = by_severity(&[Severity::Error]);
        let warnings = by_severity(&[Severity::Warning]);
        let information = by_severity(&[Severity::Info, Severity::Hint]);
        Self {
            valid: errors.is_empty(),
            issues,
            errors,
            warnings,
            information,
        }
    }

    /// True when no issue has error severity
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// All issues in rule-evaluation order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }

    /// Info and hint issues
    pub fn information(&self) -> &[ValidationIssue] {
        &self.information
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.issues.iter().map(|i| i.code.as_str()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
