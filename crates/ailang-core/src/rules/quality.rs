//! Deprecation, performance and security hooks.
//!
//! These are advisory. Each is toggled by its `validation.check*` flag and
//! only ever produces warnings or hints.

use super::{anchor, Rule, RuleContext};
use crate::config::ResolvedConfig;
use crate::diagnostics::{IssueCode, ValidationIssue};
use crate::error::RuleFault;
use crate::loader::MAX_DEPTH;
use crate::node::{Node, NodeKind};

const DEPRECATED_LAYERS: &[(&str, &str)] = &[("simple_rnn", "lstm or gru")];

const DEPRECATED_OPTIMIZERS: &[(&str, &str)] = &[("sgd", "adam")];

pub const DENSE_UNITS_LARGE: i64 = 4096;

pub const KERNEL_DIM_LARGE: i64 = 5;

pub const DROPOUT_RATE_HIGH: f64 = 0.5;

const BATCH_NORM_TYPES: &[&str] = &["batch_norm", "batchnorm", "batch_normalization"];

const CREDENTIAL_KEYS: &[&str] = &["password", "secret", "api_key", "token"];

// ============================================================================
// deprecated
// ============================================================================

/// Deprecated layer types and optimizers.
pub struct DeprecatedRule;

impl Rule for DeprecatedRule {
    fn name(&self) -> &'static str {
        "deprecated"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.validation.check_deprecated
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();

        for (index, layer, kind) in ctx.typed_layers() {
            let Some(kind) = kind else { continue };
            if let Some((_, instead)) = DEPRECATED_LAYERS.iter().find(|(old, _)| *old == kind) {
                let range = layer.get("type").map_or(layer.range, |t| t.range);
                issues.push(
                    ValidationIssue::warning(
                        IssueCode::DeprecatedLayer,
                        format!(
                            "Layer {} uses deprecated type '{}'; consider {}",
                            index, kind, instead
                        ),
                    )
                    .with_range(range),
                );
            }
        }

        for section in ctx.training_entries() {
            let Some(optimizer) = section.value.get("optimizer") else { continue };
            let Some(name) = optimizer.as_str() else { continue };
            let lowered = name.trim().to_ascii_lowercase();
            let deprecated = DEPRECATED_OPTIMIZERS.iter().find(|(old, _)| *old == lowered);
            if let Some((_, instead)) = deprecated {
                issues.push(
                    ValidationIssue::warning(
                        IssueCode::DeprecatedOptimizer,
                        format!(
                            "Optimizer '{}' is deprecated; consider '{}' instead",
                            name, instead
                        ),
                    )
                    .with_range(optimizer.range),
                );
            }
        }

        Ok(issues)
    }
}

// ============================================================================
// performance
// ============================================================================

/// Oversized layers, heavy dropout and missing normalisation.
pub struct PerformanceRule;

impl Rule for PerformanceRule {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.validation.check_performance
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();
        let layers = ctx.typed_layers();

        for (index, layer, kind) in &layers {
            match kind.as_deref() {
                Some("dense") => {
                    if let Some(units) = layer.get("units") {
                        if units.as_i64().map_or(false, |u| u > DENSE_UNITS_LARGE) {
                            issues.push(
                                ValidationIssue::warning(
                                    IssueCode::LargeDenseLayer,
                                    format!(
                                        "Dense layer {} has {} units; large dense layers are slow \
                                         and memory hungry",
                                        index,
                                        units.raw()
                                    ),
                                )
                                .with_range(units.range),
                            );
                        }
                    }
                }
                Some("dropout") => {
                    if let Some(rate) = layer.get("rate") {
                        if rate.as_f64().map_or(false, |r| r > DROPOUT_RATE_HIGH) {
                            issues.push(
                                ValidationIssue::warning(
                                    IssueCode::HighDropout,
                                    format!(
                                        "High dropout rate {} in layer {} may lead to underfitting",
                                        rate.raw(),
                                        index
                                    ),
                                )
                                .with_range(rate.range),
                            );
                        }
                    }
                }
                _ => {}
            }

            if let Some(kernel) = layer.get("kernel_size") {
                if kernel_dims(kernel).iter().any(|d| *d > KERNEL_DIM_LARGE) {
                    issues.push(
                        ValidationIssue::warning(
                            IssueCode::LargeKernel,
                            format!(
                                "Layer {} has a large kernel; consider stacking smaller kernels",
                                index
                            ),
                        )
                        .with_range(kernel.range),
                    );
                }
            }
        }

        let dense = layers
            .iter()
            .filter(|(_, _, k)| k.as_deref() == Some("dense"))
            .count();
        let normalised = layers
            .iter()
            .any(|(_, _, k)| k.as_deref().map_or(false, |k| BATCH_NORM_TYPES.contains(&k)));
        if dense > 1 && !normalised {
            let range = match &ctx.model {
                Some(model) => model.key.range,
                None => layers[0].1.range,
            };
            issues.push(
                ValidationIssue::hint(
                    IssueCode::MissingBatchNorm,
                    format!(
                        "{} dense layers without batch normalization; consider adding batch_norm",
                        dense
                    ),
                )
                .with_range(range),
            );
        }

        Ok(issues)
    }
}

fn kernel_dims(kernel: &Node) -> Vec<i64> {
    match &kernel.kind {
        NodeKind::Sequence(items) => items.iter().filter_map(Node::as_i64).collect(),
        _ => kernel.as_i64().into_iter().collect(),
    }
}

// ============================================================================
// security
// ============================================================================

/// Credential-looking values written inline.
pub struct SecurityRule;

impl Rule for SecurityRule {
    fn name(&self) -> &'static str {
        "security"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.validation.check_security
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();
        scan_credentials(ctx.root, 0, &mut issues)
            .map_err(|reason| RuleFault::failed(self.name(), reason))?;
        Ok(issues)
    }
}

fn scan_credentials(
    node: &Node,
    depth: usize,
    issues: &mut Vec<ValidationIssue>,
) -> Result<(), String> {
    if depth > MAX_DEPTH + 1 {
        return Err(format!("tree deeper than {} levels", MAX_DEPTH));
    }
    match &node.kind {
        NodeKind::Mapping(entries) => {
            for entry in entries {
                let key = entry.key.name.to_ascii_lowercase();
                let secret = entry.value.as_str().map_or(false, |s| !s.trim().is_empty());
                if secret && CREDENTIAL_KEYS.contains(&key.as_str()) {
                    issues.push(
                        ValidationIssue::warning(
                            IssueCode::InlineCredential,
                            format!(
                                "'{}' looks like an inline credential; load it from the environment instead",
                                entry.key.name
                            ),
                        )
                        .with_range(anchor(&entry.value, entry.key.range)),
                    );
                }
                scan_credentials(&entry.value, depth + 1, issues)?;
            }
        }
        NodeKind::Sequence(items) => {
            for item in items {
                scan_credentials(item, depth + 1, issues)?;
            }
        }
        NodeKind::Scalar(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load;

    fn codes(rule: &dyn Rule, text: &str) -> Vec<&'static str> {
        let root = load(text).unwrap();
        let config = ResolvedConfig::default();
        rule.evaluate(&RuleContext::new(&root, &config))
            .unwrap()
            .iter()
            .map(|i| i.code.as_str())
            .collect()
    }

    #[test]
    fn test_deprecated_layer_and_optimizer() {
        let text = "model Net:\n  layers:\n    - type: SimpleRNN\n    - type: simple_rnn\n  train:\n    optimizer: SGD\n";
        assert_eq!(codes(&DeprecatedRule, text), vec!["W1006", "W1007"]);
    }

    #[test]
    fn test_performance_findings() {
        let text = "\
model Net:
  layers:
    - type: conv2d
      kernel_size: [7, 7]
    - type: dense
      units: 8192
    - type: dropout
      rate: 0.8
    - type: dense
      units: 10
";
        assert_eq!(
            codes(&PerformanceRule, text),
            vec!["P1002", "P1001", "P1004", "P1100"]
        );
    }

    #[test]
    fn test_batch_norm_silences_hint() {
        let text = "model Net:\n  layers:\n    - type: dense\n    - type: batch_norm\n    - type: dense\n";
        assert!(codes(&PerformanceRule, text).is_empty());
    }

    #[test]
    fn test_inline_credentials() {
        let text = "model Net:\n  data:\n    source: s3://bucket\n    api_key: abc123\n    token: ''\n";
        assert_eq!(codes(&SecurityRule, text), vec!["S1001"]);
    }
}
