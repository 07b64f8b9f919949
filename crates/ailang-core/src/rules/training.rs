//! Training configuration checks.

use super::{anchor, Rule, RuleContext};
use crate::diagnostics::{IssueCode, SourceRange, ValidationIssue};
use crate::error::RuleFault;
use crate::node::{Entry, Node};

/// Above this a learning rate usually needs a schedule
pub const LEARNING_RATE_HIGH: f64 = 0.01;

/// Below this training effectively stalls
pub const LEARNING_RATE_LOW: f64 = 1e-6;

pub const BATCH_SIZE_LARGE: i64 = 1024;

/// Learning rate and batch size sanity.
pub struct TrainingRule;

impl Rule for TrainingRule {
    fn name(&self) -> &'static str {
        "training"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();
        for section in ctx.training_entries() {
            if section.value.as_mapping().is_none() {
                continue;
            }
            if let Some(lr) = section.value.entry("learning_rate") {
                check_learning_rate(lr, &mut issues);
            }
            if let Some(batch) = section.value.entry("batch_size") {
                check_batch_size(batch, &mut issues);
            }
        }
        Ok(issues)
    }
}

fn value_range(entry: &Entry) -> SourceRange {
    anchor(&entry.value, entry.key.range)
}

fn shown(node: &Node) -> &str {
    match node.raw() {
        "" => "<empty>",
        raw => raw,
    }
}

fn check_learning_rate(entry: &Entry, issues: &mut Vec<ValidationIssue>) {
    let range = value_range(entry);
    let Some(lr) = entry.value.as_f64().filter(|v| v.is_finite()) else {
        issues.push(
            ValidationIssue::error(
                IssueCode::InvalidLearningRate,
                format!(
                    "Invalid learning rate '{}': expected a number",
                    shown(&entry.value)
                ),
            )
            .with_range(range),
        );
        return;
    };

    if lr > LEARNING_RATE_HIGH {
        issues.push(
            ValidationIssue::warning(
                IssueCode::LearningRateTooHigh,
                format!(
                    "High learning rate {}: consider a learning rate schedule or warmup",
                    lr
                ),
            )
            .with_range(range),
        );
    } else if lr < LEARNING_RATE_LOW {
        issues.push(
            ValidationIssue::warning(
                IssueCode::LearningRateTooLow,
                format!("Very low learning rate {}: training may stall", lr),
            )
            .with_range(range),
        );
    }
}

fn check_batch_size(entry: &Entry, issues: &mut Vec<ValidationIssue>) {
    let range = value_range(entry);
    match entry.value.as_i64() {
        Some(n) if n > 0 => {
            if n > BATCH_SIZE_LARGE {
                issues.push(
                    ValidationIssue::warning(
                        IssueCode::LargeBatchSize,
                        format!("Large batch size {} may exhaust accelerator memory", n),
                    )
                    .with_range(range),
                );
            }
        }
        _ => issues.push(
            ValidationIssue::error(
                IssueCode::InvalidBatchSize,
                format!(
                    "Invalid batch size '{}': expected a positive integer",
                    shown(&entry.value)
                ),
            )
            .with_range(range),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::loader::load;

    fn codes(text: &str) -> Vec<&'static str> {
        let root = load(text).unwrap();
        let config = ResolvedConfig::default();
        TrainingRule
            .evaluate(&RuleContext::new(&root, &config))
            .unwrap()
            .iter()
            .map(|i| i.code.as_str())
            .collect()
    }

    #[test]
    fn test_flow_training_section() {
        assert_eq!(
            codes("train: {learning_rate: 5, batch_size: -1}\n"),
            vec!["W1003", "E1005"]
        );
    }

    #[test]
    fn test_thresholds() {
        assert!(codes("train:\n  learning_rate: 0.001\n  batch_size: 32\n").is_empty());
        assert_eq!(codes("train:\n  learning_rate: 1e-7\n"), vec!["W1004"]);
        assert_eq!(codes("train:\n  batch_size: 4096\n"), vec!["W1005"]);
        assert_eq!(codes("train:\n  learning_rate: 0.01\n  batch_size: 1024\n"), Vec::<&str>::new());
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(codes("train:\n  learning_rate: fast\n"), vec!["E1004"]);
        assert_eq!(codes("train:\n  learning_rate:\n"), vec!["E1004"]);
        assert_eq!(codes("train:\n  batch_size: 32.5\n"), vec!["E1005"]);
        assert_eq!(codes("train:\n  batch_size: 0\n"), vec!["E1005"]);
    }

    #[test]
    fn test_non_positive_learning_rate_is_low() {
        assert_eq!(codes("train:\n  learning_rate: 0\n"), vec!["W1004"]);
        assert_eq!(codes("train:\n  learning_rate: -0.5\n"), vec!["W1004"]);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        assert!(codes("training:\n  learning_rate: \"0.001\"\n  batch_size: '64'\n").is_empty());
    }

    #[test]
    fn test_model_scoped_training() {
        assert_eq!(
            codes("model Net:\n  train:\n    learning_rate: 0.5\n"),
            vec!["W1003"]
        );
    }
}
