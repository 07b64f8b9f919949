//! Opt-in checks behind the `experimental.*` flags.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::{Rule, RuleContext};
use crate::config::ResolvedConfig;
use crate::diagnostics::{IssueCode, ValidationIssue};
use crate::error::RuleFault;
use crate::node::Node;

static ACTIVATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "relu",
        "relu6",
        "leaky_relu",
        "prelu",
        "elu",
        "selu",
        "gelu",
        "sigmoid",
        "hard_sigmoid",
        "tanh",
        "softmax",
        "log_softmax",
        "softplus",
        "softsign",
        "swish",
        "silu",
        "mish",
        "exponential",
        "linear",
        "none",
    ]
    .into_iter()
    .collect()
});

// ============================================================================
// advanced-layer-params
// ============================================================================

/// Layer parameter ranges: `units` and `filters` positive, `rate` in [0, 1].
pub struct AdvancedLayerParamsRule;

impl Rule for AdvancedLayerParamsRule {
    fn name(&self) -> &'static str {
        "advanced-layer-params"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.experimental.enable_advanced_validation
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();

        for (index, layer, _) in ctx.typed_layers() {
            for field in ["units", "filters"] {
                let Some(value) = layer.get(field) else { continue };
                if value.as_i64().map_or(true, |n| n <= 0) {
                    issues.push(invalid_param(
                        index,
                        field,
                        value,
                        "must be a positive integer",
                    ));
                }
            }
            if let Some(rate) = layer.get("rate") {
                if !rate.as_f64().map_or(false, |r| (0.0..=1.0).contains(&r)) {
                    issues.push(invalid_param(index, "rate", rate, "must be between 0 and 1"));
                }
            }
        }

        Ok(issues)
    }
}

fn invalid_param(index: usize, field: &str, value: &Node, expected: &str) -> ValidationIssue {
    ValidationIssue::error(
        IssueCode::InvalidLayerParameter,
        format!(
            "Layer {} parameter '{}' {}, found '{}'",
            index,
            field,
            expected,
            value.raw()
        ),
    )
    .with_range(value.range)
}

// ============================================================================
// activation-check
// ============================================================================

/// `activation` names a known function.
pub struct ActivationRule;

impl Rule for ActivationRule {
    fn name(&self) -> &'static str {
        "activation-check"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.experimental.enable_type_checking
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();

        for (index, layer, _) in ctx.typed_layers() {
            let Some(activation) = layer.get("activation") else { continue };
            let known = activation
                .as_str()
                .map(|a| a.trim().to_ascii_lowercase())
                .map_or(false, |a| ACTIVATIONS.contains(a.as_str()));
            if !known {
                issues.push(
                    ValidationIssue::warning(
                        IssueCode::UnknownActivation,
                        format!(
                            "Layer {} uses unknown activation '{}'",
                            index,
                            activation.raw()
                        ),
                    )
                    .with_range(activation.range),
                );
            }
        }

        Ok(issues)
    }
}
