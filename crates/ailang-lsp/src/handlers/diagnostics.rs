//! Diagnostics publishing.
//!
//! Converts validation issues to LSP diagnostics. Warnings are dropped
//! unless `validation.strict`; the remainder is truncated to the problem
//! limit in rule order. Every range is clamped to the current text.

use ailang_core::{
    LineIndex, Position, ResolvedConfig, Severity, SourceRange, Validation, ValidationIssue,
};
use tower_lsp::lsp_types::{
    self as lsp, Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location,
    NumberOrString, Url,
};
use tracing::debug;

use crate::client::DiagnosticSink;

/// `source` label on every diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "ailang";

/// Publish one batch for `uri`. An empty batch is still sent so the client
/// clears stale diagnostics. Returns the number of diagnostics sent.
pub async fn publish(
    sink: &dyn DiagnosticSink,
    uri: &Url,
    version: i32,
    text: &str,
    validation: &Validation,
    config: &ResolvedConfig,
) -> usize {
    let diagnostics = to_diagnostics(uri, text, validation.issues(), config);
    let count = diagnostics.len();
    debug!(
        uri = %uri,
        version,
        issues = validation.issues().len(),
        published = count,
        "publishing diagnostics"
    );
    sink.publish(uri.clone(), diagnostics, Some(version)).await;
    count
}

/// Filter, truncate and convert issues.
pub fn to_diagnostics(
    uri: &Url,
    text: &str,
    issues: &[ValidationIssue],
    config: &ResolvedConfig,
) -> Vec<Diagnostic> {
    let index = LineIndex::new(text);
    let doc_end = index.position(text.len());

    issues
        .iter()
        .filter(|issue| config.validation.strict || issue.severity != Severity::Warning)
        .take(config.problem_limit())
        .map(|issue| to_diagnostic(uri, issue, doc_end))
        .collect()
}

fn to_diagnostic(uri: &Url, issue: &ValidationIssue, doc_end: Position) -> Diagnostic {
    let related: Vec<DiagnosticRelatedInformation> = issue
        .related
        .iter()
        .map(|r| DiagnosticRelatedInformation {
            location: Location {
                uri: uri.clone(),
                range: to_range(r.range, doc_end),
            },
            message: r.message.clone(),
        })
        .collect();

    Diagnostic {
        range: to_range(issue.range, doc_end),
        severity: Some(to_severity(issue.severity)),
        code: Some(NumberOrString::String(issue.code.as_str().to_string())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: issue.message.clone(),
        related_information: if related.is_empty() {
            None
        } else {
            Some(related)
        },
        ..Default::default()
    }
}

fn to_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// Missing ranges anchor at the document start; out-of-bounds endpoints
/// are pulled back to the end of the text.
fn to_range(range: Option<SourceRange>, doc_end: Position) -> lsp::Range {
    let range = range.unwrap_or_else(SourceRange::document_start);
    let clamp = |p: Position| p.min(doc_end);
    let range = SourceRange::new(clamp(range.start), clamp(range.end));
    lsp::Range {
        start: lsp::Position::new(range.start.line, range.start.character),
        end: lsp::Position::new(range.end.line, range.end.character),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_core::IssueCode;
    use pretty_assertions::assert_eq;

    fn uri() -> Url {
        Url::parse("file:///model.ail").unwrap()
    }

    fn mixed() -> Vec<ValidationIssue> {
        vec![
            ValidationIssue::error(IssueCode::MissingModelSection, "a"),
            ValidationIssue::error(IssueCode::MissingLayerType, "b"),
            ValidationIssue::warning(IssueCode::LearningRateTooHigh, "c"),
            ValidationIssue::warning(IssueCode::LearningRateTooLow, "d"),
            ValidationIssue::warning(IssueCode::LargeBatchSize, "e"),
        ]
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics
            .iter()
            .map(|d| match &d.code {
                Some(NumberOrString::String(s)) => s.clone(),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_truncation_keeps_rule_order() {
        let mut config = ResolvedConfig::default();
        config.max_number_of_problems = 2;
        let diagnostics = to_diagnostics(&uri(), "", &mixed(), &config);
        assert_eq!(codes(&diagnostics), vec!["E1001", "E1003"]);
    }

    #[test]
    fn test_non_strict_drops_warnings_only() {
        let mut config = ResolvedConfig::default();
        config.validation.strict = false;
        let mut issues = mixed();
        issues.push(ValidationIssue::hint(IssueCode::MissingBatchNorm, "f"));
        let diagnostics = to_diagnostics(&uri(), "", &issues, &config);
        assert_eq!(codes(&diagnostics), vec!["E1001", "E1003", "P1100"]);
        assert_eq!(diagnostics[2].severity, Some(DiagnosticSeverity::HINT));
    }

    #[test]
    fn test_ranges_clamped_to_text() {
        let issue = ValidationIssue::error(IssueCode::InternalFault, "x").with_range(
            SourceRange::new(Position::new(0, 2), Position::new(40, 0)),
        );
        let diagnostics = to_diagnostics(&uri(), "ab\ncd", &[issue], &ResolvedConfig::default());
        assert_eq!(diagnostics[0].range.start, lsp::Position::new(0, 2));
        assert_eq!(diagnostics[0].range.end, lsp::Position::new(1, 2));
    }

    #[test]
    fn test_shape_of_diagnostic() {
        let issue = ValidationIssue::error(IssueCode::MissingModelSection, "missing")
            .with_range(SourceRange::document_start())
            .with_related("stray layers", SourceRange::new(Position::new(0, 0), Position::new(0, 6)));
        let diagnostics = to_diagnostics(&uri(), "layers: []\n", &[issue], &ResolvedConfig::default());
        let d = &diagnostics[0];
        assert_eq!(d.source.as_deref(), Some("ailang"));
        assert_eq!(d.severity, Some(DiagnosticSeverity::ERROR));
        let related = d.related_information.as_ref().unwrap();
        assert_eq!(related[0].location.uri, uri());
        assert_eq!(related[0].message, "stray layers");
    }
}
