//! Rule engine
//!
//! Semantic checks over the structural tree. Each rule is an independent
//! object registered in a fixed order; the engine runs every enabled rule
//! and concatenates their issues, so identical input always yields the
//! same issue list in the same order.
//!
//! A rule that returns a [`RuleFault`] or panics contributes a single
//! `E9999` issue naming it. The remaining rules still run.

mod experimental;
mod model;
mod quality;
mod structure;
mod training;

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::diagnostics::{IssueCode, SourceRange, ValidationIssue};
use crate::error::RuleFault;
use crate::node::{Entry, Node};

pub use experimental::{ActivationRule, AdvancedLayerParamsRule};
pub use model::{ModelName, ModelSection};
pub use quality::{DeprecatedRule, PerformanceRule, SecurityRule};
pub use structure::{LayerShapeRule, NamingConventionRule, RequiredSectionRule};
pub use training::TrainingRule;

/// One semantic check
pub trait Rule: Send + Sync {
    /// Stable identifier used in logs and internal-fault messages
    fn name(&self) -> &'static str;

    /// Whether the resolved configuration turns this rule on
    fn enabled(&self, _config: &ResolvedConfig) -> bool {
        true
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault>;
}

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub root: &'a Node,
    pub config: &'a ResolvedConfig,
    pub model: Option<ModelSection<'a>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(root: &'a Node, config: &'a ResolvedConfig) -> Self {
        Self {
            root,
            config,
            model: ModelSection::find(root),
        }
    }

    /// `layers` entries of the model section, then the root
    pub fn layer_entries(&self) -> Vec<&'a Entry> {
        let mut out = Vec::new();
        if let Some(model) = &self.model {
            out.extend(model.body.entry("layers"));
        }
        out.extend(self.root.entry("layers"));
        out
    }

    /// Every layer definition with its index inside its `layers` sequence
    pub fn layers(&self) -> Vec<(usize, &'a Node)> {
        self.layer_entries()
            .into_iter()
            .filter_map(|e| e.value.as_sequence())
            .flat_map(|items| items.iter().enumerate())
            .collect()
    }

    /// Layer definitions that are mappings, with their `type` in lowercase
    pub fn typed_layers(&self) -> Vec<(usize, &'a Node, Option<String>)> {
        self.layers()
            .into_iter()
            .filter(|(_, layer)| layer.as_mapping().is_some())
            .map(|(i, layer)| {
                let kind = layer
                    .get("type")
                    .and_then(Node::as_str)
                    .map(|t| t.trim().to_ascii_lowercase());
                (i, layer, kind)
            })
            .collect()
    }

    /// `train` / `training` sections at the root and inside the model
    pub fn training_entries(&self) -> Vec<&'a Entry> {
        let mut out = Vec::new();
        for key in ["train", "training"] {
            if let Some(model) = &self.model {
                out.extend(model.body.entry(key));
            }
            out.extend(self.root.entry(key));
        }
        out
    }
}

/// Range for an issue about `node`, falling back to `fallback` when the
/// node has no extent (an empty value).
pub(crate) fn anchor(node: &Node, fallback: SourceRange) -> SourceRange {
    if node.span.start == node.span.end {
        fallback
    } else {
        node.range
    }
}

/// Ordered rule registry
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl Default for RuleEngine {
    /// The built-in rule set in evaluation order
    fn default() -> Self {
        Self::empty()
            .with_rule(RequiredSectionRule)
            .with_rule(LayerShapeRule)
            .with_rule(TrainingRule)
            .with_rule(NamingConventionRule)
            .with_rule(DeprecatedRule)
            .with_rule(PerformanceRule)
            .with_rule(SecurityRule)
            .with_rule(AdvancedLayerParamsRule)
            .with_rule(ActivationRule)
    }
}

impl RuleEngine {
    /// Engine with no registered rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; it runs after every rule already registered.
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every enabled rule against `root`.
    pub fn evaluate(&self, root: &Node, config: &ResolvedConfig) -> Vec<ValidationIssue> {
        let ctx = RuleContext::new(root, config);
        let mut issues = Vec::new();

        for rule in &self.rules {
            if !rule.enabled(config) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(&ctx)))
                .unwrap_or_else(|payload| {
                    Err(RuleFault::Panicked {
                        rule: rule.name(),
                        reason: panic_reason(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(found) => {
                    debug!(rule = rule.name(), issues = found.len(), "rule evaluated");
                    issues.extend(found);
                }
                Err(fault) => {
                    warn!(rule = fault.rule(), error = %fault, "rule fault");
                    issues.push(internal_fault(&fault));
                }
            }
        }

        issues
    }
}

fn internal_fault(fault: &RuleFault) -> ValidationIssue {
    ValidationIssue::error(
        IssueCode::InternalFault,
        format!("Internal error in rule '{}': {}", fault.rule(), fault.reason()),
    )
    .with_range(SourceRange::document_start())
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
